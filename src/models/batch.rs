use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::image::GenerationResult;

/// Stable identifier of a prompt row: its insertion index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub usize);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0 + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ItemState {
    Idle,
    Loading,
    Succeeded { result: GenerationResult },
    Failed { message: String },
}

/// Payload-free view of [`ItemState`], used in events and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Idle,
    Loading,
    Succeeded,
    Failed,
}

impl ItemState {
    pub fn status(&self) -> ItemStatus {
        match self {
            ItemState::Idle => ItemStatus::Idle,
            ItemState::Loading => ItemStatus::Loading,
            ItemState::Succeeded { .. } => ItemStatus::Succeeded,
            ItemState::Failed { .. } => ItemStatus::Failed,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ItemState::Loading)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemState::Succeeded { .. } | ItemState::Failed { .. })
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemStatus::Idle => "idle",
            ItemStatus::Loading => "loading",
            ItemStatus::Succeeded => "succeeded",
            ItemStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Snapshot of one prompt row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub id: ItemId,
    pub prompt: String,
    #[serde(flatten)]
    pub state: ItemState,
}

impl BatchItem {
    pub fn status(&self) -> ItemStatus {
        self.state.status()
    }

    pub fn has_prompt(&self) -> bool {
        !self.prompt.trim().is_empty()
    }

    pub fn result(&self) -> Option<&GenerationResult> {
        match &self.state {
            ItemState::Succeeded { result } => Some(result),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            ItemState::Failed { message } => Some(message),
            _ => None,
        }
    }
}

/// Emitted by the tracker after every state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemEvent {
    pub id: ItemId,
    pub status: ItemStatus,
}

/// Outcome counts of one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub stopped: bool,
}
