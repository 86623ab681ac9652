pub mod image_client;
pub mod request_builder;
pub mod traits;

use crate::{
    auth::{resolve_provider, CredentialProvider},
    batch::BatchOrchestrator,
    config::{BatchConfig, VertexConfig},
    error::Result,
};
use reqwest::Client;
use std::sync::Arc;

pub use image_client::ImageClient;
pub use request_builder::{build, RequestBuilder};
pub use traits::ImageGenerator;

/// Entry point wiring credentials, the HTTP client and the configuration
/// together.
#[derive(Clone)]
pub struct VertexClient {
    image_client: ImageClient,
    config: VertexConfig,
}

impl VertexClient {
    /// Resolves credentials from the configuration.
    pub fn new(config: VertexConfig) -> Result<Self> {
        let credentials = resolve_provider(&config)?;
        Ok(Self::with_credentials(config, credentials))
    }

    pub fn with_credentials(config: VertexConfig, credentials: Arc<dyn CredentialProvider>) -> Self {
        let image_client = ImageClient::new(Client::new(), credentials, &config);
        log::debug!("Imagen endpoint: {}", image_client.predict_url());

        Self {
            image_client,
            config,
        }
    }

    pub fn image(&self) -> &ImageClient {
        &self.image_client
    }

    pub fn config(&self) -> &VertexConfig {
        &self.config
    }

    /// Builds and sends a single request.
    pub async fn generate(
        &self,
        prompt: &str,
        sample_count: u32,
        aspect_ratio: &str,
    ) -> Result<crate::models::GenerationResult> {
        let request = build(prompt, sample_count, aspect_ratio)?;
        self.image_client.generate(&request).await
    }

    /// Sequential batch runner backed by this client.
    pub fn orchestrator(&self, batch: BatchConfig) -> BatchOrchestrator {
        BatchOrchestrator::new(Arc::new(self.image_client.clone()), batch)
    }
}
