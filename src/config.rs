use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::AspectRatio;

pub const DEFAULT_PROJECT_ID: &str = "viralstatus-464912";
pub const DEFAULT_LOCATION: &str = "us-central1";
pub const DEFAULT_MODEL_ID: &str = "imagen-4.0-generate-preview-06-06";
pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_ITEM_DELAY: Duration = Duration::from_secs(7);

#[derive(Debug, Clone, Default)]
pub struct VertexConfig {
    pub project_id: Option<String>,
    pub location: Option<String>,
    pub model_id: Option<String>,
    pub credentials_path: Option<PathBuf>,
    pub access_token: Option<String>,
    /// Replaces `https://{location}-aiplatform.googleapis.com`.
    pub api_base_url: Option<String>,
}

impl VertexConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        VertexConfig {
            project_id: non_empty_var("GOOGLE_PROJECT_ID"),
            location: non_empty_var("GOOGLE_LOCATION"),
            model_id: non_empty_var("IMAGEN_MODEL_ID"),
            credentials_path: non_empty_var("GOOGLE_APPLICATION_CREDENTIALS")
                .map(PathBuf::from)
                .or_else(well_known_adc_file),
            access_token: non_empty_var("GOOGLE_ACCESS_TOKEN"),
            api_base_url: non_empty_var("IMAGEN_API_BASE_URL"),
        }
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn with_credentials_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = Some(path.into());
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn project_id(&self) -> &str {
        self.project_id.as_deref().unwrap_or(DEFAULT_PROJECT_ID)
    }

    pub fn location(&self) -> &str {
        self.location.as_deref().unwrap_or(DEFAULT_LOCATION)
    }

    pub fn model_id(&self) -> &str {
        self.model_id.as_deref().unwrap_or(DEFAULT_MODEL_ID)
    }

    pub fn predict_url(&self) -> String {
        let base = match &self.api_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}-aiplatform.googleapis.com", self.location()),
        };
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:predict",
            base,
            self.project_id(),
            self.location(),
            self.model_id()
        )
    }
}

/// Policy for sequential batch runs.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Pause between two consecutive dispatches.
    pub inter_item_delay: Duration,
    pub sample_count: u32,
    pub aspect_ratio: AspectRatio,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            inter_item_delay: DEFAULT_ITEM_DELAY,
            sample_count: 1,
            aspect_ratio: AspectRatio::default(),
        }
    }
}

impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let inter_item_delay = env::var("BATCH_ITEM_DELAY_SECS")
            .ok()
            .and_then(|secs| secs.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_ITEM_DELAY);

        BatchConfig {
            inter_item_delay,
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.inter_item_delay = delay;
        self
    }

    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub port: Option<u16>,
    pub vertex: VertexConfig,
    pub batch: BatchConfig,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let port = env::var("PORT").ok().and_then(|port| port.parse().ok());

        Config {
            port,
            vertex: VertexConfig::from_env(),
            batch: BatchConfig::from_env(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_vertex(mut self, config: VertexConfig) -> Self {
        self.vertex = config;
        self
    }

    pub fn with_batch(mut self, config: BatchConfig) -> Self {
        self.batch = config;
        self
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// `application_default_credentials.json` left by
/// `gcloud auth application-default login`, if present.
fn well_known_adc_file() -> Option<PathBuf> {
    let config_dir = match non_empty_var("CLOUDSDK_CONFIG") {
        Some(dir) => PathBuf::from(dir),
        None if cfg!(windows) => PathBuf::from(non_empty_var("APPDATA")?).join("gcloud"),
        None => PathBuf::from(non_empty_var("HOME")?)
            .join(".config")
            .join("gcloud"),
    };
    let path = config_dir.join("application_default_credentials.json");
    path.is_file().then_some(path)
}
