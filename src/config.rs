//! Configuration management for the learnmate agent.
//!
//! Configuration can be set via environment variables:
//! - `MISTRAL_API_KEY` - Required. Your Mistral API key.
//! - `MISTRAL_MODEL` - Optional. Chat model to use. Defaults to `mistral-large-latest`.
//! - `MISTRAL_BASE_URL` - Optional. Provider base URL. Defaults to `https://api.mistral.ai`.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.
//! - `MAX_ITERATIONS` - Optional. Maximum agent loop iterations per user turn. Defaults to `5`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Mistral API key
    pub api_key: String,

    /// Chat model identifier
    pub model: String,

    /// Provider base URL
    pub base_url: String,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Maximum iterations for the agent loop per user turn
    pub max_iterations: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `MISTRAL_API_KEY` is not set.
    /// The key is checked here, before any network attempt is made.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("MISTRAL_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("MISTRAL_API_KEY".to_string()))?;

        let model =
            std::env::var("MISTRAL_MODEL").unwrap_or_else(|_| "mistral-large-latest".to_string());

        let base_url = std::env::var("MISTRAL_BASE_URL")
            .unwrap_or_else(|_| "https://api.mistral.ai".to_string());

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let max_iterations = std::env::var("MAX_ITERATIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("MAX_ITERATIONS".to_string(), format!("{}", e))
            })?;

        Ok(Self {
            api_key,
            model,
            base_url,
            host,
            port,
            max_iterations,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            model: "mistral-large-latest".to_string(),
            base_url,
            host: "127.0.0.1".to_string(),
            port: 3000,
            max_iterations: 5,
        }
    }
}
