use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::Mutex;

use crate::{
    auth::{CredentialProvider, CredentialToken, CLOUD_PLATFORM_SCOPE},
    error::{ImagenError, Result},
};

const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

/// Contents of a Google credentials JSON file.
#[derive(Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialsFile {
    ServiceAccount {
        client_email: String,
        private_key: String,
        #[serde(default)]
        private_key_id: Option<String>,
        #[serde(default = "default_token_uri")]
        token_uri: String,
    },
    /// Written by `gcloud auth application-default login`.
    AuthorizedUser {
        client_id: String,
        client_secret: String,
        refresh_token: String,
        #[serde(default = "default_token_uri")]
        token_uri: String,
    },
}

impl CredentialsFile {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ImagenError::Auth(format!("unreadable credentials file: {}", e)))
    }

    fn token_uri(&self) -> &str {
        match self {
            CredentialsFile::ServiceAccount { token_uri, .. }
            | CredentialsFile::AuthorizedUser { token_uri, .. } => token_uri,
        }
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Exchanges a credentials file for access tokens and caches them until
/// shortly before expiry.
pub struct ServiceAccountProvider {
    client: Client,
    credentials: CredentialsFile,
    cached: Mutex<Option<CredentialToken>>,
    refresh_margin: Duration,
}

impl ServiceAccountProvider {
    pub fn new(credentials: CredentialsFile) -> Self {
        Self {
            client: Client::new(),
            credentials,
            cached: Mutex::new(None),
            refresh_margin: Duration::seconds(60),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ImagenError::Auth(format!(
                "cannot read credentials file {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self::new(CredentialsFile::parse(&json)?))
    }

    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    fn signed_assertion(&self, client_email: &str, private_key: &str, key_id: Option<&str>) -> Result<String> {
        use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: client_email,
            scope: CLOUD_PLATFORM_SCOPE,
            aud: self.credentials.token_uri(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = key_id.map(String::from);
        let key = EncodingKey::from_rsa_pem(private_key.as_bytes())
            .map_err(|e| ImagenError::Auth(format!("invalid service account key: {}", e)))?;

        encode(&header, &claims, &key)
            .map_err(|e| ImagenError::Auth(format!("JWT signing failed: {}", e)))
    }

    async fn fetch_token(&self) -> Result<CredentialToken> {
        let form: Vec<(&str, String)> = match &self.credentials {
            CredentialsFile::ServiceAccount {
                client_email,
                private_key,
                private_key_id,
                ..
            } => vec![
                ("grant_type", JWT_BEARER_GRANT.to_string()),
                (
                    "assertion",
                    self.signed_assertion(client_email, private_key, private_key_id.as_deref())?,
                ),
            ],
            CredentialsFile::AuthorizedUser {
                client_id,
                client_secret,
                refresh_token,
                ..
            } => vec![
                ("grant_type", "refresh_token".to_string()),
                ("client_id", client_id.clone()),
                ("client_secret", client_secret.clone()),
                ("refresh_token", refresh_token.clone()),
            ],
        };

        log::debug!("Requesting access token from {}", self.credentials.token_uri());

        let response = self
            .client
            .post(self.credentials.token_uri())
            .form(&form)
            .send()
            .await
            .map_err(|e| ImagenError::Auth(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ImagenError::Auth(format!(
                "token endpoint rejected the request ({}): {}",
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ImagenError::Auth(format!("malformed token response: {}", e)))?;

        let credential = CredentialToken::new(token.access_token);
        Ok(match token.expires_in {
            Some(secs) => credential.with_lifetime(Duration::seconds(secs)),
            None => credential,
        })
    }
}

#[async_trait]
impl CredentialProvider for ServiceAccountProvider {
    async fn acquire_token(&self) -> Result<CredentialToken> {
        // Held across the exchange so concurrent callers share one refresh.
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.is_valid_for(self.refresh_margin) {
                return Ok(token.clone());
            }
            log::debug!("Cached access token is about to expire, refreshing");
        }

        let token = self.fetch_token().await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    fn name(&self) -> &'static str {
        match self.credentials {
            CredentialsFile::ServiceAccount { .. } => "service account",
            CredentialsFile::AuthorizedUser { .. } => "authorized user",
        }
    }
}
