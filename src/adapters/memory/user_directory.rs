//! In-memory user directory.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, UserId};
use crate::ports::{UserDirectory, UserSummary};

/// Directory seeded by the caller. Unknown users resolve to `None`.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, UserSummary>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, summary: UserSummary) {
        self.users.write().await.insert(summary.id.clone(), summary);
    }

    /// Convenience for tests: register a user with a display name.
    pub async fn with_user(self, id: &str, name: &str) -> Self {
        if let Ok(user_id) = UserId::new(id) {
            self.insert(UserSummary {
                id: user_id,
                name: Some(name.to_string()),
                profile_picture: None,
            })
            .await;
        }
        self
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn resolve(&self, user_id: &UserId) -> Result<Option<UserSummary>, DomainError> {
        Ok(self.users.read().await.get(user_id).cloned())
    }
}
