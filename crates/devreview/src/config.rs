use std::fmt;
use std::io::ErrorKind;
use std::path::Path;

use tokio::fs;

use serde::Deserialize;
use thiserror::Error;

/// Environment variable holding the OpenAI API key.
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Environment variable that overrides the API base URL.
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

// ============================================================================
// Config (root)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub openai: OpenAIConfig,
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        Ok(serde_saphyr::from_str(&contents)?)
    }
}

// ============================================================================
// OpenAIConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct OpenAIConfig {
    /// Explicit base URL. When unset, `OPENAI_BASE_URL` or the public API is used.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_completion_tokens")]
    pub max_completion_tokens: u32,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key_env: default_api_key_env(),
            model: default_model(),
            temperature: default_temperature(),
            max_completion_tokens: default_max_completion_tokens(),
        }
    }
}

impl OpenAIConfig {
    pub fn settings(&self) -> GenerationSettings {
        GenerationSettings {
            model: self.model.clone(),
            temperature: self.temperature,
            max_completion_tokens: self.max_completion_tokens,
        }
    }

    /// Resolve credentials from the process environment.
    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        self.client_config_with(|name| std::env::var(name).ok())
    }

    /// Resolve credentials through `lookup` instead of the process environment.
    pub fn client_config_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<ClientConfig, ConfigError> {
        let api_key = lookup(&self.api_key_env)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingApiKey(self.api_key_env.clone()))?;

        let base_url = self
            .base_url
            .clone()
            .or_else(|| lookup(BASE_URL_ENV))
            .unwrap_or_else(default_base_url);

        Ok(ClientConfig {
            api_key,
            base_url,
            settings: self.settings(),
        })
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    1.0
}

fn default_max_completion_tokens() -> u32 {
    4096
}

// ============================================================================
// GenerationSettings / ClientConfig
// ============================================================================

/// Model, sampling temperature and output bound sent with every request.
///
/// Values are passed through untouched; the API is the one that rejects
/// out-of-range settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_completion_tokens: u32,
}

/// Everything needed to build an [`OpenAIClient`](crate::client::OpenAIClient).
#[derive(Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub settings: GenerationSettings,
}

impl ClientConfig {
    /// Build a config for `settings` using `OPENAI_API_KEY` and `OPENAI_BASE_URL`.
    pub fn from_env(settings: GenerationSettings) -> Result<Self, ConfigError> {
        Self::from_lookup(settings, |name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(
        settings: GenerationSettings,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let openai = OpenAIConfig {
            model: settings.model,
            temperature: settings.temperature,
            max_completion_tokens: settings.max_completion_tokens,
            ..OpenAIConfig::default()
        };
        openai.client_config_with(lookup)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("settings", &self.settings)
            .finish()
    }
}

// ============================================================================
// ConfigError
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_saphyr::Error),

    #[error("api key not found: environment variable {0} is not set")]
    MissingApiKey(String),
}

// ============================================================================
// Tests
// ============================================================================
