//! User directory port - read-only access to display identity.
//!
//! Profiles are owned by the external profile service. Messaging only needs
//! enough to render who sent a message.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, UserId};

/// Display identity of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

impl UserSummary {
    /// Summary carrying only the id, for users the directory does not know.
    pub fn id_only(id: UserId) -> Self {
        Self {
            id,
            name: None,
            profile_picture: None,
        }
    }
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up a user's display identity. `None` if unknown.
    async fn resolve(&self, user_id: &UserId) -> Result<Option<UserSummary>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_only_summary_omits_optional_fields() {
        let summary = UserSummary::id_only(UserId::new("u1").unwrap());
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json, serde_json::json!({"id": "u1"}));
    }
}
