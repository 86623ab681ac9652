//! rimagen - batch text-to-image generation on Vertex AI Imagen.
//!
//! ```no_run
//! use rimagen::{BatchConfig, ItemTracker, VertexClient, VertexConfig};
//!
//! #[tokio::main]
//! async fn main() -> rimagen::Result<()> {
//!     let client = VertexClient::new(VertexConfig::from_env())?;
//!
//!     let tracker = ItemTracker::with_prompts(["a lighthouse at dusk", "a koi pond"]);
//!     let summary = client.orchestrator(BatchConfig::new()).run_all(&tracker).await;
//!
//!     println!("{} succeeded, {} failed", summary.succeeded, summary.failed);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod batch;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
#[cfg(feature = "server")]
pub mod server;
pub mod vertex;

pub use auth::{CredentialProvider, CredentialToken, StaticTokenProvider};
pub use batch::{BatchOrchestrator, ItemTracker, StopSignal};
pub use config::{BatchConfig, Config, VertexConfig};
pub use error::{ImagenError, Result};
pub use models::{
    AspectRatio, BatchItem, BatchSummary, GenerationRequest, GenerationResult, ImageDataUri,
    ItemEvent, ItemId, ItemState, ItemStatus,
};
pub use vertex::{ImageClient, ImageGenerator, RequestBuilder, VertexClient};
