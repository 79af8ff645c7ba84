//! Room backplane settings
//!
//! Present only when several gateway instances must share rooms. Without
//! this section every instance delivers to its own connections only.

use serde::Deserialize;
use std::time::Duration;

use crate::adapters::websocket::DEFAULT_CHANNEL;

use super::error::ValidationError;

const URL_SCHEMES: [&str; 2] = ["redis://", "rediss://"];

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,

    /// Pub/sub channel; instances sharing rooms must agree on it
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Seconds allowed for the initial connection
    #[serde(default = "default_connect_timeout")]
    pub timeout_secs: u64,
}

impl RedisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.trim().is_empty() {
            return Err(ValidationError::MissingRequired("REDIS_URL"));
        }
        if !URL_SCHEMES.iter().any(|scheme| self.url.starts_with(scheme)) {
            return Err(ValidationError::InvalidRedisUrl);
        }
        if self.channel.trim().is_empty() {
            return Err(ValidationError::MissingRequired("REDIS_CHANNEL"));
        }
        Ok(())
    }
}

fn default_channel() -> String {
    DEFAULT_CHANNEL.to_string()
}

fn default_connect_timeout() -> u64 {
    5
}
