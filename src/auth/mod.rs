//! Bearer tokens for the Vertex AI endpoint.

pub mod gcloud;
pub mod service_account;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::Arc;

use crate::{config::VertexConfig, error::Result};

pub use gcloud::GcloudCliProvider;
pub use service_account::ServiceAccountProvider;

pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// An OAuth access token. `Debug` never prints the secret.
#[derive(Clone)]
pub struct CredentialToken {
    token: String,
    pub obtained_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CredentialToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            obtained_at: Utc::now(),
            expires_at: None,
        }
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.expires_at = Some(self.obtained_at + lifetime);
        self
    }

    pub fn secret(&self) -> &str {
        &self.token
    }

    /// True while the token stays valid for at least `margin` more.
    pub fn is_valid_for(&self, margin: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() + margin < expires_at,
            None => true,
        }
    }
}

impl fmt::Debug for CredentialToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialToken")
            .field("token", &"<redacted>")
            .field("obtained_at", &self.obtained_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Source of bearer tokens. Implementations do not retry; callers decide.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn acquire_token(&self) -> Result<CredentialToken>;

    fn name(&self) -> &'static str;
}

/// Hands out a fixed, caller supplied token.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: CredentialToken,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: CredentialToken::new(token),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenProvider {
    async fn acquire_token(&self) -> Result<CredentialToken> {
        Ok(self.token.clone())
    }

    fn name(&self) -> &'static str {
        "static token"
    }
}

/// Picks a provider the way Google application default credentials do:
/// explicit token, then credentials file, then the gcloud CLI.
pub fn resolve_provider(config: &VertexConfig) -> Result<Arc<dyn CredentialProvider>> {
    let provider: Arc<dyn CredentialProvider> = if let Some(token) = &config.access_token {
        Arc::new(StaticTokenProvider::new(token.clone()))
    } else if let Some(path) = &config.credentials_path {
        Arc::new(ServiceAccountProvider::from_file(path)?)
    } else {
        Arc::new(GcloudCliProvider::new())
    };

    log::info!("Using {} credentials", provider.name());
    Ok(provider)
}
