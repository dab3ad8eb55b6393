//! Completion backend configuration

use thiserror::Error;

/// Model used for every completion
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Sampling temperature used for every completion
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

/// Public `OpenAI` API root
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,
}

/// Configuration for the completion provider
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    /// API root, overridable for gateways and local stubs
    pub base_url: String,
}

impl LlmConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(
            std::env::var("OPENAI_API_KEY").ok(),
            std::env::var("OPENAI_BASE_URL").ok(),
        )
    }

    fn from_vars(api_key: Option<String>, base_url: Option<String>) -> Result<Self, ConfigError> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;
        let base_url = base_url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self { api_key, base_url })
    }
}
