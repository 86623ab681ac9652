use crate::{
    error::Result,
    models::{GenerationRequest, GenerationResult},
};
use async_trait::async_trait;

/// Anything that turns a validated request into generated images.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult>;

    fn model_id(&self) -> &str;
}
