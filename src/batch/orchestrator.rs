use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    batch::tracker::ItemTracker,
    config::BatchConfig,
    error::Result,
    logger,
    models::{BatchSummary, GenerationResult, ItemId, ItemStatus},
    vertex::{request_builder::build_with_ratio, traits::ImageGenerator},
};

/// Stops a batch from scheduling further items. The request already in
/// flight always runs to completion.
#[derive(Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for StopSignal {
    fn default() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    async fn stopped(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so this only ends once stopped.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

/// Drives prompt rows through the generation pipeline one at a time.
#[derive(Clone)]
pub struct BatchOrchestrator {
    generator: Arc<dyn ImageGenerator>,
    config: BatchConfig,
}

impl BatchOrchestrator {
    pub fn new(generator: Arc<dyn ImageGenerator>, config: BatchConfig) -> Self {
        Self { generator, config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Runs every row that has a prompt and is not already loading.
    pub async fn run_all(&self, tracker: &ItemTracker) -> BatchSummary {
        self.run_all_until(tracker, &StopSignal::new()).await
    }

    /// Like [`run_all`](Self::run_all), checking `stop` before each dispatch
    /// and during the pause between items.
    pub async fn run_all_until(&self, tracker: &ItemTracker, stop: &StopSignal) -> BatchSummary {
        let run_id = Uuid::new_v4();
        let snapshot = tracker.items();
        let selected: Vec<ItemId> = snapshot
            .iter()
            .filter(|item| item.has_prompt() && !item.state.is_loading())
            .map(|item| item.id)
            .collect();

        let mut summary = BatchSummary {
            skipped: snapshot.len() - selected.len(),
            ..Default::default()
        };

        log::info!(
            "Batch {} starting: {} of {} item(s) selected, {:?} between items",
            run_id,
            selected.len(),
            snapshot.len(),
            self.config.inter_item_delay
        );
        let _timer = logger::timer(&format!("batch {}", run_id));

        let mut pause_pending = false;
        for id in selected {
            if stop.is_stopped() {
                summary.stopped = true;
                break;
            }

            if pause_pending && !self.config.inter_item_delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.config.inter_item_delay) => {}
                    _ = stop.stopped() => {
                        summary.stopped = true;
                        break;
                    }
                }
            }
            pause_pending = false;

            // Rows may have been started by `run_one` since the snapshot.
            let Some(prompt) = tracker.try_begin_load(id) else {
                log::debug!("Item {} is no longer ready, skipping", id);
                summary.skipped += 1;
                continue;
            };

            summary.dispatched += 1;
            match self.process(tracker, id, &prompt).await {
                ItemStatus::Succeeded => summary.succeeded += 1,
                _ => summary.failed += 1,
            }
            pause_pending = true;
        }

        if summary.stopped {
            log::warn!("Batch {} stopped after {} item(s)", run_id, summary.dispatched);
        }
        log::info!(
            "Batch {} finished: {} succeeded, {} failed, {} skipped",
            run_id,
            summary.succeeded,
            summary.failed,
            summary.skipped
        );
        summary
    }

    /// Runs a single row without any pause. Returns its terminal status, or
    /// `None` when the row is unknown, blank or already loading.
    pub async fn run_one(&self, tracker: &ItemTracker, id: ItemId) -> Option<ItemStatus> {
        let Some(prompt) = tracker.try_begin_load(id) else {
            log::debug!("Item {} is not ready to run", id);
            return None;
        };
        Some(self.process(tracker, id, &prompt).await)
    }

    async fn process(&self, tracker: &ItemTracker, id: ItemId, prompt: &str) -> ItemStatus {
        match self.generate(prompt).await {
            Ok(result) => {
                log::info!("Item {} produced {} image(s)", id, result.images.len());
                tracker.complete(id, result);
                ItemStatus::Succeeded
            }
            Err(e) => {
                log::warn!("Item {} failed: {}", id, e);
                tracker.fail(id, e.user_message());
                ItemStatus::Failed
            }
        }
    }

    async fn generate(&self, prompt: &str) -> Result<GenerationResult> {
        let request =
            build_with_ratio(prompt, self.config.sample_count, self.config.aspect_ratio)?;
        self.generator.generate(&request).await
    }
}
