//! StartConversationHandler - look up or create the conversation of a pair.

use std::sync::Arc;

use crate::domain::foundation::{ConversationKey, UserId};
use crate::domain::messaging::{Conversation, MessagingError};
use crate::ports::ConversationStore;

/// Command to open a conversation between two users.
#[derive(Debug, Clone)]
pub struct StartConversationCommand {
    pub user_id: UserId,
    pub other_user_id: UserId,
}

impl StartConversationCommand {
    /// Parse raw ids as received from a client.
    pub fn parse(user_id: &str, other_user_id: &str) -> Result<Self, MessagingError> {
        Ok(Self {
            user_id: UserId::new(user_id)
                .map_err(|e| MessagingError::validation("userId", e.to_string()))?,
            other_user_id: UserId::new(other_user_id)
                .map_err(|e| MessagingError::validation("otherUserId", e.to_string()))?,
        })
    }
}

/// Handler for starting conversations. Idempotent per unordered pair.
///
/// Users are not checked for existence here; that is the caller's concern.
pub struct StartConversationHandler {
    conversations: Arc<dyn ConversationStore>,
}

impl StartConversationHandler {
    pub fn new(conversations: Arc<dyn ConversationStore>) -> Self {
        Self { conversations }
    }

    pub async fn handle(
        &self,
        cmd: StartConversationCommand,
    ) -> Result<Conversation, MessagingError> {
        let key = ConversationKey::for_pair(&cmd.user_id, &cmd.other_user_id)?;

        let conversation = self.conversations.find_or_create(&key).await?;

        tracing::debug!(
            conversation_id = %key,
            user_id = %cmd.user_id,
            "Conversation started"
        );

        Ok(conversation)
    }
}
