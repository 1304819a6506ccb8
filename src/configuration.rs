use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

use crate::{error::ScoutError, services::search_orchestrator::SearchCredentials};

pub const DEFAULT_HARVEST_CAP: usize = 1000;
pub const DEFAULT_INLINE_THRESHOLD: usize = 50;

#[derive(Deserialize)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub api_keys: ApiKeySettings,
    pub search: SearchSettings,
    pub classification: ClassificationSettings,
    pub backend: BackendSettings,
}

#[derive(Deserialize)]
pub struct ApplicationSettings {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
}

#[derive(Deserialize)]
pub struct ApiKeySettings {
    pub search: Option<SecretString>,
    pub search_engine_id: Option<String>,
    pub openai: Option<SecretString>,
}

#[derive(Deserialize)]
pub struct SearchSettings {
    pub endpoint: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub results_per_page: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_harvest_cap")]
    pub harvest_cap: usize,
    pub domestic_country: String,
}

#[derive(Deserialize)]
pub struct ClassificationSettings {
    pub model: String,
    pub temperature: f32,
    #[serde(default = "default_inline_threshold")]
    pub inline_threshold: usize,
    pub min_confidence: f32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub poll_interval_secs: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub poll_ceiling_secs: u64,
}

#[derive(Deserialize)]
pub struct BackendSettings {
    pub base_url: String,
}

fn default_harvest_cap() -> usize {
    DEFAULT_HARVEST_CAP
}

fn default_inline_threshold() -> usize {
    DEFAULT_INLINE_THRESHOLD
}

impl SearchSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ClassificationSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn poll_ceiling(&self) -> Duration {
        Duration::from_secs(self.poll_ceiling_secs)
    }
}

impl ApiKeySettings {
    /// Search credentials, or the banner text explaining what is missing.
    pub fn search_credentials(&self) -> Result<SearchCredentials, ScoutError> {
        let api_key = self
            .search
            .as_ref()
            .filter(|key| !key.expose_secret().trim().is_empty())
            .ok_or_else(|| ScoutError::Configuration("search API key is not set".to_string()))?;
        let engine_id = self
            .search_engine_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                ScoutError::Configuration("search engine id is not set".to_string())
            })?;

        Ok(SearchCredentials::new(
            api_key.expose_secret(),
            engine_id.to_string(),
        ))
    }
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("no working directory: {}", e)))?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        // APP_API_KEYS__OPENAI=... sets api_keys.openai
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
