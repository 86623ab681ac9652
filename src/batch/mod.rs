//! Prompt rows and the sequential runner that drives them.

pub mod orchestrator;
pub mod tracker;

pub use orchestrator::{BatchOrchestrator, StopSignal};
pub use tracker::ItemTracker;
