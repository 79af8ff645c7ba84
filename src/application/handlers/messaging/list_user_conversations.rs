//! ListUserConversationsHandler - the inbox view of one user.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::messaging::{Conversation, MessagingError};
use crate::ports::ConversationStore;

#[derive(Debug, Clone)]
pub struct ListUserConversationsQuery {
    pub user_id: UserId,
}

impl ListUserConversationsQuery {
    pub fn parse(user_id: &str) -> Result<Self, MessagingError> {
        Ok(Self {
            user_id: UserId::new(user_id)
                .map_err(|e| MessagingError::validation("userId", e.to_string()))?,
        })
    }
}

/// A conversation together with the requesting user's own unread count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserConversation {
    pub conversation: Conversation,
    pub unread_count: u32,
}

pub struct ListUserConversationsHandler {
    conversations: Arc<dyn ConversationStore>,
}

impl ListUserConversationsHandler {
    pub fn new(conversations: Arc<dyn ConversationStore>) -> Self {
        Self { conversations }
    }

    /// Conversations not deleted by the user, most recent activity first.
    pub async fn handle(
        &self,
        query: ListUserConversationsQuery,
    ) -> Result<Vec<UserConversation>, MessagingError> {
        let conversations = self.conversations.list_visible_for(&query.user_id).await?;

        Ok(conversations
            .into_iter()
            .map(|conversation| UserConversation {
                unread_count: conversation.unread_count_for(&query.user_id),
                conversation,
            })
            .collect())
    }
}
