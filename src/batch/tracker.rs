use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

use crate::models::{BatchItem, GenerationResult, ItemEvent, ItemId, ItemState, ItemStatus};

const EVENT_CAPACITY: usize = 256;

/// Shared registry of prompt rows and their lifecycle.
///
/// Cloning gives another handle on the same rows. Transitions are the only
/// way to change an item; each one is applied under the lock and announced
/// to subscribers before the lock is released.
#[derive(Clone)]
pub struct ItemTracker {
    items: Arc<Mutex<Vec<BatchItem>>>,
    events: broadcast::Sender<ItemEvent>,
}

impl Default for ItemTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemTracker {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
            events,
        }
    }

    pub fn with_prompts<I, S>(prompts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tracker = Self::new();
        for prompt in prompts {
            tracker.add_item(prompt);
        }
        tracker
    }

    fn lock(&self) -> MutexGuard<'_, Vec<BatchItem>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, id: ItemId, status: ItemStatus) {
        // No subscribers is fine.
        let _ = self.events.send(ItemEvent { id, status });
    }

    /// Receives every transition from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ItemEvent> {
        self.events.subscribe()
    }

    pub fn add_item(&self, prompt: impl Into<String>) -> ItemId {
        let mut items = self.lock();
        let id = ItemId(items.len());
        items.push(BatchItem {
            id,
            prompt: prompt.into(),
            state: ItemState::Idle,
        });
        self.emit(id, ItemStatus::Idle);
        id
    }

    pub fn get(&self, id: ItemId) -> Option<BatchItem> {
        self.lock().get(id.0).cloned()
    }

    /// Snapshot of all rows in insertion order.
    pub fn items(&self) -> Vec<BatchItem> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Edits a prompt. A failed row with a non-blank new prompt goes back to
    /// idle with its error cleared; it is not re-run.
    pub fn set_prompt(&self, id: ItemId, prompt: impl Into<String>) {
        let prompt = prompt.into();
        self.apply(id, "set_prompt", |item| {
            if matches!(item.state, ItemState::Failed { .. }) && !prompt.trim().is_empty() {
                item.state = ItemState::Idle;
            }
            item.prompt = prompt;
            Ok(())
        });
    }

    /// Idle, Failed or Succeeded -> Loading. Drops any previous outcome.
    ///
    /// # Panics
    ///
    /// If the item is unknown or already loading.
    pub fn begin_load(&self, id: ItemId) {
        self.apply(id, "begin_load", |item| {
            if item.state.is_loading() {
                return Err(item.status());
            }
            item.state = ItemState::Loading;
            Ok(())
        });
    }

    /// Moves the row to Loading if it is not loading and has a prompt,
    /// returning the prompt to send. `None` leaves the row untouched.
    pub fn try_begin_load(&self, id: ItemId) -> Option<String> {
        let mut items = self.lock();
        let item = items.get_mut(id.0)?;
        if item.state.is_loading() || !item.has_prompt() {
            return None;
        }
        item.state = ItemState::Loading;
        let prompt = item.prompt.clone();
        self.emit(id, ItemStatus::Loading);
        Some(prompt)
    }

    /// Loading -> Succeeded.
    ///
    /// # Panics
    ///
    /// If the item is unknown or not loading.
    pub fn complete(&self, id: ItemId, result: GenerationResult) {
        self.apply(id, "complete", |item| {
            if !item.state.is_loading() {
                return Err(item.status());
            }
            item.state = ItemState::Succeeded { result };
            Ok(())
        });
    }

    /// Loading -> Failed.
    ///
    /// # Panics
    ///
    /// If the item is unknown or not loading.
    pub fn fail(&self, id: ItemId, message: impl Into<String>) {
        let message = message.into();
        self.apply(id, "fail", |item| {
            if !item.state.is_loading() {
                return Err(item.status());
            }
            item.state = ItemState::Failed { message };
            Ok(())
        });
    }

    fn apply<F>(&self, id: ItemId, op: &str, change: F)
    where
        F: FnOnce(&mut BatchItem) -> Result<(), ItemStatus>,
    {
        let rejected = {
            let mut items = self.lock();
            match items.get_mut(id.0) {
                None => Some(None),
                Some(item) => match change(item) {
                    Ok(()) => {
                        let status = item.status();
                        self.emit(id, status);
                        None
                    }
                    Err(status) => Some(Some(status)),
                },
            }
        };

        // Guard is dropped before panicking so the registry stays usable.
        match rejected {
            None => {}
            Some(None) => panic!("{}: unknown item {}", op, id),
            Some(Some(status)) => panic!("{}: invalid transition for item {} in state {}", op, id, status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AspectRatio, ImageDataUri};
    use chrono::Utc;

    fn result(prompt: &str) -> GenerationResult {
        GenerationResult {
            images: vec![ImageDataUri::from_base64_png("AAAA").unwrap()],
            source_prompt: prompt.to_string(),
            aspect_ratio: AspectRatio::Square,
            model_id: "imagen-test".to_string(),
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_items_start_idle_in_insertion_order() {
        let tracker = ItemTracker::with_prompts(["one", "two", ""]);
        let items = tracker.items();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].id, ItemId(1));
        assert_eq!(items[1].prompt, "two");
        assert!(items.iter().all(|item| item.status() == ItemStatus::Idle));
        assert!(!items[2].has_prompt());
    }

    #[test]
    fn test_success_lifecycle() {
        let tracker = ItemTracker::new();
        let id = tracker.add_item("a harbor at night");

        tracker.begin_load(id);
        assert_eq!(tracker.get(id).unwrap().status(), ItemStatus::Loading);

        tracker.complete(id, result("a harbor at night"));
        let item = tracker.get(id).unwrap();
        assert_eq!(item.status(), ItemStatus::Succeeded);
        assert_eq!(item.result().unwrap().source_prompt, "a harbor at night");
        assert!(item.error_message().is_none());
    }

    #[test]
    fn test_begin_load_clears_previous_outcome() {
        let tracker = ItemTracker::with_prompts(["x"]);
        let id = ItemId(0);
        tracker.begin_load(id);
        tracker.fail(id, "quota exceeded");
        assert_eq!(tracker.get(id).unwrap().error_message(), Some("quota exceeded"));

        tracker.begin_load(id);
        let item = tracker.get(id).unwrap();
        assert!(item.error_message().is_none());
        assert!(item.result().is_none());

        tracker.complete(id, result("x"));
        tracker.begin_load(id);
        assert!(tracker.get(id).unwrap().result().is_none());
    }

    #[test]
    fn test_set_same_prompt_on_idle_is_noop() {
        let tracker = ItemTracker::with_prompts(["same"]);
        let before = tracker.get(ItemId(0)).unwrap();
        tracker.set_prompt(ItemId(0), "same");
        assert_eq!(tracker.get(ItemId(0)).unwrap(), before);
    }

    #[test]
    fn test_editing_failed_prompt_clears_error() {
        let tracker = ItemTracker::with_prompts(["bad"]);
        let id = ItemId(0);
        tracker.begin_load(id);
        tracker.fail(id, "blocked");

        tracker.set_prompt(id, "   ");
        assert_eq!(tracker.get(id).unwrap().error_message(), Some("blocked"));

        tracker.set_prompt(id, "better");
        let item = tracker.get(id).unwrap();
        assert_eq!(item.status(), ItemStatus::Idle);
        assert_eq!(item.prompt, "better");
    }

    #[test]
    fn test_editing_succeeded_prompt_keeps_result() {
        let tracker = ItemTracker::with_prompts(["first"]);
        let id = ItemId(0);
        tracker.begin_load(id);
        tracker.complete(id, result("first"));

        tracker.set_prompt(id, "second");
        let item = tracker.get(id).unwrap();
        assert_eq!(item.status(), ItemStatus::Succeeded);
        assert_eq!(item.result().unwrap().source_prompt, "first");
    }

    #[test]
    #[should_panic(expected = "complete: invalid transition")]
    fn test_complete_requires_loading() {
        let tracker = ItemTracker::with_prompts(["idle"]);
        tracker.complete(ItemId(0), result("idle"));
    }

    #[test]
    #[should_panic(expected = "fail: invalid transition")]
    fn test_fail_requires_loading() {
        let tracker = ItemTracker::with_prompts(["idle"]);
        tracker.begin_load(ItemId(0));
        tracker.fail(ItemId(0), "first");
        tracker.fail(ItemId(0), "second");
    }

    #[test]
    #[should_panic(expected = "begin_load: invalid transition")]
    fn test_double_begin_load_panics() {
        let tracker = ItemTracker::with_prompts(["busy"]);
        tracker.begin_load(ItemId(0));
        tracker.begin_load(ItemId(0));
    }

    #[test]
    #[should_panic(expected = "unknown item")]
    fn test_unknown_item_panics() {
        ItemTracker::new().begin_load(ItemId(3));
    }

    #[test]
    fn test_rejected_transition_leaves_state_intact() {
        let tracker = ItemTracker::with_prompts(["idle"]);
        let handle = tracker.clone();
        let outcome =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
                handle.fail(ItemId(0), "nope")
            }));
        assert!(outcome.is_err());
        assert_eq!(tracker.get(ItemId(0)).unwrap().status(), ItemStatus::Idle);
    }

    #[test]
    fn test_try_begin_load_skips_busy_and_blank_rows() {
        let tracker = ItemTracker::with_prompts(["ready", "  "]);
        assert_eq!(tracker.try_begin_load(ItemId(0)).as_deref(), Some("ready"));
        assert_eq!(tracker.try_begin_load(ItemId(0)), None);
        assert_eq!(tracker.try_begin_load(ItemId(1)), None);
        assert_eq!(tracker.try_begin_load(ItemId(9)), None);
        assert_eq!(tracker.get(ItemId(1)).unwrap().status(), ItemStatus::Idle);
    }

    #[tokio::test]
    async fn test_subscribers_see_every_transition() {
        let tracker = ItemTracker::new();
        let mut events = tracker.subscribe();

        let id = tracker.add_item("watch me");
        tracker.begin_load(id);
        tracker.fail(id, "boom");

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event.status);
        }
        assert_eq!(
            seen,
            vec![ItemStatus::Idle, ItemStatus::Loading, ItemStatus::Failed]
        );
    }
}
