use crate::{
    auth::CredentialProvider,
    config::VertexConfig,
    error::{ImagenError, Result},
    models::{GenerationRequest, GenerationResult, PredictRequest, PredictResponse},
    vertex::traits::ImageGenerator,
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header, Client};
use std::sync::Arc;

/// Calls the Imagen `:predict` endpoint once per request.
#[derive(Clone)]
pub struct ImageClient {
    client: Client,
    credentials: Arc<dyn CredentialProvider>,
    predict_url: String,
    model_id: String,
}

impl ImageClient {
    pub fn new(client: Client, credentials: Arc<dyn CredentialProvider>, config: &VertexConfig) -> Self {
        Self {
            client,
            credentials,
            predict_url: config.predict_url(),
            model_id: config.model_id().to_string(),
        }
    }

    pub fn predict_url(&self) -> &str {
        &self.predict_url
    }

    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        let token = self.credentials.acquire_token().await?;
        let body = PredictRequest::from(request);

        log::info!(
            "Generating {} image(s) at {} with model: {}",
            request.sample_count(),
            request.aspect_ratio(),
            self.model_id
        );
        log::debug!("Prompt: {}", request.prompt());

        let response = self
            .client
            .post(&self.predict_url)
            .bearer_auth(token.secret())
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            log::error!("Imagen API error {}: {}", status.as_u16(), text);
            return Err(ImagenError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }

        let predictions: PredictResponse = serde_json::from_str(&text)
            .map_err(|e| ImagenError::Decode(format!("unexpected response body: {}", e)))?;
        let images = predictions.into_images()?;

        log::info!("Received {} image(s) from {}", images.len(), self.model_id);

        Ok(GenerationResult {
            images,
            source_prompt: request.prompt().to_string(),
            aspect_ratio: request.aspect_ratio(),
            model_id: self.model_id.clone(),
            generated_at: Utc::now(),
        })
    }
}

#[async_trait]
impl ImageGenerator for ImageClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        ImageClient::generate(self, request).await
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
