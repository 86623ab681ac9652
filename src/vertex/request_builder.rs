use crate::{
    error::{ImagenError, Result},
    models::{AspectRatio, GenerationRequest, MAX_PROMPT_CHARS},
};

/// Validates a prompt, sample count and aspect ratio into a request.
///
/// The prompt is kept exactly as given; only its trimmed form is checked
/// for blankness.
pub fn build(prompt: &str, sample_count: u32, aspect_ratio: &str) -> Result<GenerationRequest> {
    check_prompt(prompt)?;
    let aspect_ratio = aspect_ratio.parse::<AspectRatio>()?;
    build_with_ratio(prompt, sample_count, aspect_ratio)
}

pub(crate) fn build_with_ratio(
    prompt: &str,
    sample_count: u32,
    aspect_ratio: AspectRatio,
) -> Result<GenerationRequest> {
    check_prompt(prompt)?;
    if sample_count == 0 {
        return Err(ImagenError::Validation(
            "number_of_images must be at least 1".into(),
        ));
    }

    Ok(GenerationRequest {
        prompt: prompt.to_string(),
        sample_count,
        aspect_ratio,
    })
}

fn check_prompt(prompt: &str) -> Result<()> {
    if prompt.trim().is_empty() {
        return Err(ImagenError::Validation("Prompt is required".into()));
    }
    let length = prompt.chars().count();
    if length > MAX_PROMPT_CHARS {
        return Err(ImagenError::Validation(format!(
            "Prompt is too long ({} characters, at most {} allowed)",
            length, MAX_PROMPT_CHARS
        )));
    }
    Ok(())
}

/// Chained form of [`build`], defaulting to one 9:16 image.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    prompt: String,
    sample_count: u32,
    aspect_ratio: String,
}

impl RequestBuilder {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            sample_count: 1,
            aspect_ratio: AspectRatio::default().as_str().to_string(),
        }
    }

    pub fn sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    pub fn aspect_ratio(mut self, aspect_ratio: impl Into<String>) -> Self {
        self.aspect_ratio = aspect_ratio.into();
        self
    }

    pub fn build(self) -> Result<GenerationRequest> {
        build(&self.prompt, self.sample_count, &self.aspect_ratio)
    }
}
