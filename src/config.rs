// Session configuration

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::ClientConfig;
use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::result_cache::DEFAULT_TTL_SECONDS;

pub const MAX_HISTORY_LIMIT: usize = 100;
pub const MAX_CACHE_TTL_SECONDS: i64 = 24 * 60 * 60;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("JSON parse error: {0}")]
    JsonParseError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub history_limit: usize,
    pub cache_ttl_seconds: i64,
    pub client: ClientConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            cache_ttl_seconds: DEFAULT_TTL_SECONDS,
            client: ClientConfig::default(),
        }
    }
}

impl SessionConfig {
    // Missing keys fall back to the defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_limit == 0 || self.history_limit > MAX_HISTORY_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "history_limit must be between 1 and {}",
                MAX_HISTORY_LIMIT
            )));
        }
        if self.cache_ttl_seconds <= 0 || self.cache_ttl_seconds > MAX_CACHE_TTL_SECONDS {
            return Err(ConfigError::Invalid(format!(
                "cache_ttl_seconds must be between 1 and {}",
                MAX_CACHE_TTL_SECONDS
            )));
        }
        if self.client.base_url.is_empty() {
            return Err(ConfigError::Invalid("client.base_url is empty".to_string()));
        }
        Ok(())
    }

    // Clamped so an unvalidated config cannot overflow the duration
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_ttl_seconds.clamp(1, MAX_CACHE_TTL_SECONDS))
    }
}
