//! PostgreSQL user directory over the profile service's `users` table.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, UserId};
use crate::ports::{UserDirectory, UserSummary};

use super::column;

#[derive(Clone)]
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn resolve(&self, user_id: &UserId) -> Result<Option<UserSummary>, DomainError> {
        let row = sqlx::query("SELECT name, profile_picture FROM users WHERE id = $1")
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to fetch user: {}", e)))?;

        row.map(|row| {
            Ok(UserSummary {
                id: user_id.clone(),
                name: column(&row, "name")?,
                profile_picture: column(&row, "profile_picture")?,
            })
        })
        .transpose()
    }
}
