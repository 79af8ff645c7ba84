//! GetConversationMessagesHandler - read a capped page of history.

use std::sync::Arc;

use crate::domain::foundation::ConversationKey;
use crate::domain::messaging::{Message, MessagingError};
use crate::ports::{HistoryPage, MessageStore};

/// Query for a conversation's message history.
#[derive(Debug, Clone)]
pub struct GetConversationMessagesQuery {
    pub conversation_key: ConversationKey,
}

impl GetConversationMessagesQuery {
    pub fn parse(conversation_id: &str) -> Result<Self, MessagingError> {
        Ok(Self {
            conversation_key: ConversationKey::parse(conversation_id)
                .map_err(|e| MessagingError::validation("conversationId", e.to_string()))?,
        })
    }
}

/// Handler for history reads.
///
/// Participation is not enforced; an unknown key yields an empty list.
pub struct GetConversationMessagesHandler {
    messages: Arc<dyn MessageStore>,
    page: HistoryPage,
}

impl GetConversationMessagesHandler {
    pub fn new(messages: Arc<dyn MessageStore>, page: HistoryPage) -> Self {
        Self { messages, page }
    }

    pub async fn handle(
        &self,
        query: GetConversationMessagesQuery,
    ) -> Result<Vec<Message>, MessagingError> {
        let messages = self
            .messages
            .list_for_conversation(&query.conversation_key, self.page)
            .await?;
        Ok(messages)
    }
}
