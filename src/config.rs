use std::env;

use thiserror::Error;

use crate::gemini;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required but not set")]
    Missing(&'static str),
    #[error("invalid value for {0}")]
    Invalid(&'static str),
}

/// Process configuration, read once at startup and immutable afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared HS256 secret the upstream auth system signs tokens with.
    pub jwt_secret: String,
    pub google_api_key: String,
    pub host: String,
    pub port: u16,
    /// Gemini API origin. Points at the production service unless overridden
    /// (tests point it at a local mock).
    pub gemini_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            jwt_secret: require("SUPABASE_JWT_SECRET")?,
            google_api_key: require("GOOGLE_AI_APIKEY")?,
            host: env_or("HOST", "0.0.0.0"),
            port: env_or("PORT", "8080")
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT"))?,
            gemini_base_url: env_or("GEMINI_BASE_URL", gemini::GEMINI_API_BASE),
        })
    }
}

fn require(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
