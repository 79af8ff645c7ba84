//! Runtime configuration
//!
//! Read once at startup from `ROOMIES__`-prefixed environment variables
//! (and a `.env` file in development). Nested keys are joined with `__`:
//!
//! | Variable | Field |
//! |---|---|
//! | `ROOMIES__SERVER__PORT` | `server.port` |
//! | `ROOMIES__DATABASE__URL` | `database.url` |
//! | `ROOMIES__DATABASE__POOL__MAX_CONNECTIONS` | `database.pool.max_connections` |
//! | `ROOMIES__REDIS__URL` | `redis.url` |
//! | `ROOMIES__MESSAGING__HISTORY_WINDOW` | `messaging.history_window` |
//!
//! ```no_run
//! use roomies_messaging::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod messaging;
mod redis;
mod server;

pub use database::{DatabaseConfig, PoolConfig};
pub use error::{ConfigError, ValidationError};
pub use messaging::{MessagingConfig, MAX_HISTORY_PAGE_SIZE};
pub use redis::RedisConfig;
pub use server::{Environment, LogFormat, ServerConfig};

use serde::Deserialize;

const ENV_PREFIX: &str = "ROOMIES";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL persistence; in-memory stores when absent
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Redis room backplane; local-only delivery when absent
    #[serde(default)]
    pub redis: Option<RedisConfig>,

    #[serde(default)]
    pub messaging: MessagingConfig,
}

impl AppConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// `ConfigError::LoadError` when a value cannot be parsed into its field.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let source = config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR);

        let config = config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Semantic checks on every present section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.messaging.validate()?;
        self.database
            .as_ref()
            .map_or(Ok(()), DatabaseConfig::validate)?;
        self.redis.as_ref().map_or(Ok(()), RedisConfig::validate)
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
