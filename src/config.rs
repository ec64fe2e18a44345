//! Environment-driven configuration for the oracle client.

use std::time::Duration;

pub const API_KEY_VAR: &str = "WEBINTEL_API_KEY";
pub const BASE_URL_VAR: &str = "WEBINTEL_BASE_URL";
pub const MODEL_VAR: &str = "WEBINTEL_MODEL";

const DEFAULT_BASE_URL: &str = "https://api.moonshot.ai/v1";
const DEFAULT_MODEL: &str = "kimi-k2-turbo-preview";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors from configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingVar(&'static str),
}

/// Connection settings for the chat-completions oracle.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl OracleConfig {
    /// Load from process environment. Only the API key is required;
    /// base URL and model fall back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = get(API_KEY_VAR)
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingVar(API_KEY_VAR))?;
        Ok(Self {
            api_key,
            base_url: get(BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            model: get(MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.into()),
            timeout: DEFAULT_TIMEOUT,
        })
    }
}
