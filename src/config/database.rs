//! PostgreSQL settings
//!
//! The section is optional: without `ROOMIES__DATABASE__URL` the server
//! keeps conversations and messages in memory.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Hard ceiling on `pool.max_connections`.
const POOL_CEILING: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://` or `postgresql://` connection string
    pub url: String,

    #[serde(default)]
    pub pool: PoolConfig,

    /// Apply the embedded migrations before serving
    #[serde(default = "enabled")]
    pub run_migrations: bool,
}

/// Connection pool sizing, e.g. `ROOMIES__DATABASE__POOL__MAX_CONNECTIONS`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub min_connections: u32,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// Close idle connections after this many seconds; never when unset
    pub idle_timeout_secs: Option<u64>,
    /// Recycle connections after this many seconds; never when unset
    pub max_lifetime_secs: Option<u64>,
}

impl PoolConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }

    pub fn max_lifetime(&self) -> Option<Duration> {
        self.max_lifetime_secs.map(Duration::from_secs)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: 1,
            max_connections: 10,
            acquire_timeout_secs: 10,
            idle_timeout_secs: Some(600),
            max_lifetime_secs: Some(1800),
        }
    }
}

impl DatabaseConfig {
    /// Config for `url` with default pool settings.
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pool: PoolConfig::default(),
            run_migrations: true,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ValidationError::MissingRequired("DATABASE_URL"));
        }
        if !["postgres://", "postgresql://"]
            .iter()
            .any(|scheme| url.starts_with(scheme))
        {
            return Err(ValidationError::InvalidDatabaseUrl);
        }

        let pool = &self.pool;
        if pool.max_connections == 0 || pool.min_connections > pool.max_connections {
            return Err(ValidationError::InvalidPoolSize);
        }
        if pool.max_connections > POOL_CEILING {
            return Err(ValidationError::PoolSizeTooLarge);
        }
        Ok(())
    }
}

fn enabled() -> bool {
    true
}
