use async_trait::async_trait;
use tokio::process::Command;

use crate::{
    auth::{CredentialProvider, CredentialToken},
    error::{ImagenError, Result},
};

/// Gets tokens from `gcloud auth print-access-token`. Nothing is cached;
/// gcloud keeps its own token cache.
#[derive(Debug, Clone)]
pub struct GcloudCliProvider {
    program: String,
}

impl Default for GcloudCliProvider {
    fn default() -> Self {
        Self {
            program: "gcloud".to_string(),
        }
    }
}

impl GcloudCliProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses another executable in place of `gcloud`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

#[async_trait]
impl CredentialProvider for GcloudCliProvider {
    async fn acquire_token(&self) -> Result<CredentialToken> {
        let output = Command::new(&self.program)
            .args(["auth", "print-access-token"])
            .output()
            .await
            .map_err(|e| {
                ImagenError::Auth(format!(
                    "failed to run {}: {}. Install the Google Cloud SDK or set GOOGLE_APPLICATION_CREDENTIALS",
                    self.program, e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ImagenError::Auth(format!(
                "gcloud auth failed: {}",
                stderr.trim()
            )));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(ImagenError::Auth("gcloud returned an empty token".into()));
        }
        Ok(CredentialToken::new(token))
    }

    fn name(&self) -> &'static str {
        "gcloud CLI"
    }
}
