//! HTTP entry point: `POST /api/image/generate-image`.

use actix_web::{web, HttpResponse};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    error::ImagenError,
    models::{AspectRatio, GenerationResult},
    vertex::{request_builder::build, traits::ImageGenerator},
};

pub type SharedGenerator = Arc<dyn ImageGenerator>;

#[derive(Debug, Deserialize)]
pub struct GenerateImageBody {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub number_of_images: Option<u32>,
    #[serde(default)]
    pub aspect_ratio: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageSuccess {
    pub success: bool,
    pub images: Vec<String>,
    pub prompt: String,
    #[serde(rename = "aspect_ratio")]
    pub aspect_ratio: String,
    pub model: String,
    pub generated_at: String,
}

impl From<GenerationResult> for GenerateImageSuccess {
    fn from(result: GenerationResult) -> Self {
        Self {
            success: true,
            images: result.images.into_iter().map(|i| i.into_string()).collect(),
            prompt: result.source_prompt,
            aspect_ratio: result.aspect_ratio.to_string(),
            model: result.model_id,
            generated_at: result
                .generated_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateImageFailure {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl GenerateImageFailure {
    fn new(error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            details,
        }
    }
}

fn failure_response(err: &ImagenError) -> HttpResponse {
    match err {
        ImagenError::Validation(reason) => {
            HttpResponse::BadRequest().json(GenerateImageFailure::new(reason.clone(), None))
        }
        ImagenError::Decode(_) => HttpResponse::InternalServerError()
            .json(GenerateImageFailure::new("No image generated", None)),
        ImagenError::Upstream { .. } => HttpResponse::InternalServerError().json(
            GenerateImageFailure::new("Image generation failed", Some(err.to_string())),
        ),
        _ => HttpResponse::InternalServerError().json(GenerateImageFailure::new(
            "Image generation failed",
            Some(err.user_message()),
        )),
    }
}

pub async fn generate_image(
    generator: web::Data<SharedGenerator>,
    body: web::Json<GenerateImageBody>,
) -> HttpResponse {
    let body = body.into_inner();
    let prompt = body.prompt.unwrap_or_default();
    let aspect_ratio = body
        .aspect_ratio
        .unwrap_or_else(|| AspectRatio::default().as_str().to_string());

    let request = match build(&prompt, body.number_of_images.unwrap_or(1), &aspect_ratio) {
        Ok(request) => request,
        Err(e) => {
            log::warn!("Rejected image request: {}", e);
            return failure_response(&e);
        }
    };

    match generator.generate(&request).await {
        Ok(result) => HttpResponse::Ok().json(GenerateImageSuccess::from(result)),
        Err(e) => {
            log::error!("Image generation error: {}", e);
            failure_response(&e)
        }
    }
}

/// Mounts the image routes under `/api/image`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api/image").route("/generate-image", web::post().to(generate_image)));
}
