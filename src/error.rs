//! Error types for image generation.

use serde::Deserialize;

/// Message shown when nothing more specific is known about a failure.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to generate image. Please try again.";

/// Message carried by a successful response that holds no image data.
pub const NO_IMAGE_MESSAGE: &str = "no image generated";

#[derive(Debug, thiserror::Error)]
pub enum ImagenError {
    /// Bad prompt, sample count or aspect ratio.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Credential acquisition or refresh failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The remote service answered with a non-success status.
    #[error("API error: {status} - {body}")]
    Upstream { status: u16, body: String },

    /// Success status but the image payload was missing or malformed.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// Transport failure talking to the remote service.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Google APIs wrap failures as `{"error": {"code", "message", "status"}}`.
#[derive(Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleErrorBody,
}

#[derive(Deserialize)]
struct GoogleErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl ImagenError {
    pub fn no_image() -> Self {
        ImagenError::Decode(NO_IMAGE_MESSAGE.to_string())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ImagenError::Validation(_))
    }

    /// HTTP status the service boundary answers with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ImagenError::Validation(_) => 400,
            _ => 500,
        }
    }

    /// Human readable message for a failed item.
    ///
    /// Prefers the upstream detail message, then the raw upstream body, then
    /// the upstream status text, and finally a generic fallback. Credential
    /// failures are never echoed back verbatim.
    pub fn user_message(&self) -> String {
        match self {
            ImagenError::Validation(reason) => reason.clone(),
            ImagenError::Auth(_) => "Authentication with the image service failed".to_string(),
            ImagenError::Decode(_) => "No image generated".to_string(),
            ImagenError::Upstream { status, body } => upstream_detail(body)
                .or_else(|| {
                    let trimmed = body.trim();
                    (!trimmed.is_empty()).then(|| trimmed.to_string())
                })
                .or_else(|| status_text(*status))
                .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()),
            ImagenError::Network(e) => e
                .status()
                .and_then(|s| status_text(s.as_u16()))
                .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()),
            ImagenError::Json(_) | ImagenError::Config(_) => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

fn upstream_detail(body: &str) -> Option<String> {
    serde_json::from_str::<GoogleErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .filter(|message| !message.trim().is_empty())
}

fn status_text(status: u16) -> Option<String> {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(|reason| format!("{} {}", status, reason))
}

pub type Result<T> = std::result::Result<T, ImagenError>;
