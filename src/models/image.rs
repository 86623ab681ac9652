use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ImagenError, Result};

pub const MAX_PROMPT_CHARS: usize = 500;

/// Aspect ratios accepted by the Imagen `:predict` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[default]
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[serde(rename = "16:9")]
    Landscape16x9,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Portrait3x4,
        AspectRatio::Landscape4x3,
        AspectRatio::Portrait9x16,
        AspectRatio::Landscape16x9,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait3x4 => "3:4",
            AspectRatio::Landscape4x3 => "4:3",
            AspectRatio::Portrait9x16 => "9:16",
            AspectRatio::Landscape16x9 => "16:9",
        }
    }

    /// Comma separated list, as shown to users on a bad ratio.
    pub fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(|ratio| ratio.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = ImagenError;

    // Exact match only: "16:9 " or "16x9" are rejected.
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == s)
            .ok_or_else(|| {
                ImagenError::Validation(format!(
                    "Invalid aspect ratio. Supported ratios: {}",
                    Self::supported_list()
                ))
            })
    }
}

/// A validated generation request. Build one through
/// [`RequestBuilder`](crate::vertex::RequestBuilder) or
/// [`build`](crate::vertex::request_builder::build).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub(crate) prompt: String,
    pub(crate) sample_count: u32,
    pub(crate) aspect_ratio: AspectRatio,
}

impl GenerationRequest {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }
}

/// A `data:<mime>;base64,<payload>` string holding one generated image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageDataUri(String);

impl ImageDataUri {
    pub const PNG_MIME: &'static str = "image/png";

    /// Wraps a base64 payload returned by the API. Rejects empty or
    /// non-base64 payloads.
    pub fn from_base64_png(payload: &str) -> Result<Self> {
        if payload.is_empty() {
            return Err(ImagenError::no_image());
        }
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| ImagenError::Decode(format!("invalid base64 image payload: {}", e)))?;
        Ok(Self(format!("data:{};base64,{}", Self::PNG_MIME, payload)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn mime_type(&self) -> &str {
        self.0
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(";base64,"))
            .map(|(mime, _)| mime)
            .unwrap_or_default()
    }

    pub fn payload(&self) -> &str {
        self.0
            .split_once(";base64,")
            .map(|(_, payload)| payload)
            .unwrap_or_default()
    }

    /// Decodes the payload into raw image bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(self.payload())
            .map_err(|e| ImagenError::Decode(e.to_string()))
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ImageDataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub images: Vec<ImageDataUri>,
    pub source_prompt: String,
    pub aspect_ratio: AspectRatio,
    pub model_id: String,
    pub generated_at: DateTime<Utc>,
}

impl GenerationResult {
    pub fn first_image(&self) -> Option<&ImageDataUri> {
        self.images.first()
    }
}
