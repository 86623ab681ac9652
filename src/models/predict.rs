//! Vertex AI `:predict` wire format for Imagen models.

use serde::{Deserialize, Serialize};

use crate::{
    error::{ImagenError, Result},
    models::image::{GenerationRequest, ImageDataUri},
};

#[derive(Debug, Serialize)]
pub struct PredictRequest<'a> {
    pub instances: Vec<PredictInstance<'a>>,
    pub parameters: PredictParameters,
}

/// Per-prompt fields. Safety and watermark settings are fixed.
#[derive(Debug, Serialize)]
pub struct PredictInstance<'a> {
    pub prompt: &'a str,
    pub negative_prompt: &'a str,
    pub person_generation: &'a str,
    pub safety_filter_level: &'a str,
    pub add_watermark: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictParameters {
    pub sample_count: u32,
    pub aspect_ratio: &'static str,
}

impl<'a> From<&'a GenerationRequest> for PredictRequest<'a> {
    fn from(request: &'a GenerationRequest) -> Self {
        Self {
            instances: vec![PredictInstance {
                prompt: request.prompt(),
                negative_prompt: "",
                person_generation: "allow_all",
                safety_filter_level: "block_few",
                add_watermark: true,
            }],
            parameters: PredictParameters {
                sample_count: request.sample_count(),
                aspect_ratio: request.aspect_ratio().as_str(),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PredictResponse {
    #[serde(default)]
    pub predictions: Option<Vec<Prediction>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    #[serde(default)]
    pub bytes_base64_encoded: Option<ImagePayload>,
}

/// The API returns either one base64 string or a list of them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ImagePayload {
    Single(String),
    Many(Vec<String>),
}

impl ImagePayload {
    pub fn into_data_uris(self) -> Result<Vec<ImageDataUri>> {
        let payloads = match self {
            ImagePayload::Single(payload) => vec![payload],
            ImagePayload::Many(payloads) => payloads,
        };
        if payloads.is_empty() {
            return Err(ImagenError::no_image());
        }
        payloads
            .iter()
            .map(|payload| ImageDataUri::from_base64_png(payload))
            .collect()
    }
}

impl PredictResponse {
    /// Resolves `predictions[0].bytesBase64Encoded` into data URIs.
    pub fn into_images(self) -> Result<Vec<ImageDataUri>> {
        self.predictions
            .and_then(|predictions| predictions.into_iter().next())
            .and_then(|prediction| prediction.bytes_base64_encoded)
            .ok_or_else(ImagenError::no_image)?
            .into_data_uris()
    }
}
