//! PostgreSQL adapters - Database implementations for the persistence ports.
//!
//! - `PostgresMessageStore` - Append-only message log
//! - `PostgresConversationStore` - Conversations with per-participant rows
//! - `PostgresUserDirectory` - Read-only view of the `users` table
//!
//! Schema lives in `migrations/` and is embedded with [`MIGRATOR`].

mod conversation_store;
mod message_store;
mod user_directory;

pub use conversation_store::PostgresConversationStore;
pub use message_store::PostgresMessageStore;
pub use user_directory::PostgresUserDirectory;

use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use crate::config::DatabaseConfig;
use crate::domain::foundation::DomainError;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Open a connection pool sized and timed by the database config.
pub async fn connect_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = &config.pool;
    PgPoolOptions::new()
        .min_connections(pool.min_connections)
        .max_connections(pool.max_connections)
        .acquire_timeout(pool.acquire_timeout())
        .idle_timeout(pool.idle_timeout())
        .max_lifetime(pool.max_lifetime())
        .connect(&config.url)
        .await
}

/// Read a typed column, mapping failures to a database error.
fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name)
        .map_err(|e| DomainError::database(format!("Failed to get {}: {}", name, e)))
}
