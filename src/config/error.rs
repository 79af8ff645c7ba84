//! Failures raised while reading or checking `AppConfig`

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable could not be parsed into its field.
    #[error("could not load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("configuration rejected: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Semantic problems found by the `validate` methods.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingRequired(&'static str),

    #[error("host {0:?} does not form a bindable address")]
    InvalidBindAddress(String),

    #[error("port must be non-zero")]
    InvalidPort,

    #[error("request timeout out of range")]
    InvalidTimeout,

    #[error("database URL must use postgres:// or postgresql://")]
    InvalidDatabaseUrl,

    #[error("Redis URL must use redis:// or rediss://")]
    InvalidRedisUrl,

    #[error("Pool max_connections must be positive and at least min_connections")]
    InvalidPoolSize,

    #[error("pool max_connections above the allowed ceiling")]
    PoolSizeTooLarge,

    #[error("history page size must be between 1 and {0}")]
    InvalidHistoryPageSize(u32),

    #[error("max content length must be positive")]
    InvalidContentLength,
}
