//! DeleteConversationHandler - hide a conversation for one participant.

use std::sync::Arc;

use crate::domain::foundation::{ConversationKey, UserId};
use crate::domain::messaging::MessagingError;
use crate::ports::ConversationStore;

#[derive(Debug, Clone)]
pub struct DeleteConversationCommand {
    pub conversation_key: ConversationKey,
    pub user_id: UserId,
}

impl DeleteConversationCommand {
    pub fn parse(conversation_id: &str, user_id: &str) -> Result<Self, MessagingError> {
        Ok(Self {
            conversation_key: ConversationKey::parse(conversation_id)
                .map_err(|e| MessagingError::validation("conversationId", e.to_string()))?,
            user_id: UserId::new(user_id)
                .map_err(|e| MessagingError::validation("userId", e.to_string()))?,
        })
    }
}

/// Soft delete: the user is added to `deleted_by`, messages stay. The
/// next message between the pair makes it visible again.
pub struct DeleteConversationHandler {
    conversations: Arc<dyn ConversationStore>,
}

impl DeleteConversationHandler {
    pub fn new(conversations: Arc<dyn ConversationStore>) -> Self {
        Self { conversations }
    }

    pub async fn handle(&self, cmd: DeleteConversationCommand) -> Result<(), MessagingError> {
        self.conversations
            .soft_delete(&cmd.conversation_key, &cmd.user_id)
            .await?;

        tracing::info!(
            conversation_id = %cmd.conversation_key,
            user_id = %cmd.user_id,
            "Conversation deleted for user"
        );

        Ok(())
    }
}
