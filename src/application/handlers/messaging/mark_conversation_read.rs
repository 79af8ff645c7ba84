//! MarkConversationReadHandler - zero a user's unread count.

use std::sync::Arc;

use crate::domain::foundation::{ConversationKey, Timestamp, UserId};
use crate::domain::messaging::MessagingError;
use crate::ports::{ConversationStore, MessageStore};

#[derive(Debug, Clone)]
pub struct MarkConversationReadCommand {
    pub conversation_key: ConversationKey,
    pub user_id: UserId,
}

impl MarkConversationReadCommand {
    pub fn parse(conversation_id: &str, user_id: &str) -> Result<Self, MessagingError> {
        Ok(Self {
            conversation_key: ConversationKey::parse(conversation_id)
                .map_err(|e| MessagingError::validation("conversationId", e.to_string()))?,
            user_id: UserId::new(user_id)
                .map_err(|e| MessagingError::validation("userId", e.to_string()))?,
        })
    }
}

/// Resets the user's counter on the conversation, then flips `read` on the
/// messages they received there up to the moment of the reset. The counter
/// is the value clients display.
pub struct MarkConversationReadHandler {
    conversations: Arc<dyn ConversationStore>,
    messages: Arc<dyn MessageStore>,
}

impl MarkConversationReadHandler {
    pub fn new(conversations: Arc<dyn ConversationStore>, messages: Arc<dyn MessageStore>) -> Self {
        Self {
            conversations,
            messages,
        }
    }

    /// Returns how many message flags changed.
    pub async fn handle(&self, cmd: MarkConversationReadCommand) -> Result<u64, MessagingError> {
        // Messages stamped after this instant arrive after the reset and
        // stay unread on both counter and flag.
        let cutoff = Timestamp::now();
        self.conversations
            .mark_read(&cmd.conversation_key, &cmd.user_id)
            .await?;

        let flipped = self
            .messages
            .mark_read_for(&cmd.conversation_key, &cmd.user_id, cutoff)
            .await?;

        tracing::debug!(
            conversation_id = %cmd.conversation_key,
            user_id = %cmd.user_id,
            flipped,
            "Conversation marked read"
        );

        Ok(flipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryConversationStore, InMemoryMessageStore};
    use crate::domain::messaging::{Message, DEFAULT_MAX_CONTENT_LENGTH};
    use crate::ports::{HistoryPage, HistoryWindow};

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    async fn deliver(
        messages: &InMemoryMessageStore,
        conversations: &InMemoryConversationStore,
        from: &str,
        to: &str,
    ) {
        let message = Message::new(
            ConversationKey::for_pair(&user(from), &user(to)).unwrap(),
            user(from),
            user(to),
            "hi",
            DEFAULT_MAX_CONTENT_LENGTH,
            Timestamp::now(),
        )
        .unwrap();
        messages.append(&message).await.unwrap();
        conversations.record_message(&message).await.unwrap();
    }

    #[tokio::test]
    async fn zeroes_counter_and_flags_received_messages() {
        let messages = Arc::new(InMemoryMessageStore::new());
        let conversations = Arc::new(InMemoryConversationStore::new());
        deliver(&messages, &conversations, "A", "B").await;
        deliver(&messages, &conversations, "A", "B").await;
        deliver(&messages, &conversations, "B", "A").await;
        let handler = MarkConversationReadHandler::new(conversations.clone(), messages.clone());

        let flipped = handler
            .handle(MarkConversationReadCommand::parse("A_B", "B").unwrap())
            .await
            .unwrap();

        assert_eq!(flipped, 2);
        let key = ConversationKey::parse("A_B").unwrap();
        let conversation = conversations.find_by_key(&key).await.unwrap().unwrap();
        assert_eq!(conversation.unread_count_for(&user("B")), 0);
        assert_eq!(conversation.unread_count_for(&user("A")), 1);

        let history = messages
            .list_for_conversation(&key, HistoryPage::new(50, HistoryWindow::Oldest))
            .await
            .unwrap();
        assert!(history
            .iter()
            .all(|m| m.is_read() == (m.receiver_id() == &user("B"))));
    }

    #[tokio::test]
    async fn message_after_reset_is_unread_on_counter_and_flag() {
        let messages = Arc::new(InMemoryMessageStore::new());
        let conversations = Arc::new(InMemoryConversationStore::new());
        deliver(&messages, &conversations, "A", "B").await;
        let handler = MarkConversationReadHandler::new(conversations.clone(), messages.clone());
        handler
            .handle(MarkConversationReadCommand::parse("A_B", "B").unwrap())
            .await
            .unwrap();

        deliver(&messages, &conversations, "A", "B").await;

        let key = ConversationKey::parse("A_B").unwrap();
        let conversation = conversations.find_by_key(&key).await.unwrap().unwrap();
        let history = messages
            .list_for_conversation(&key, HistoryPage::new(50, HistoryWindow::Oldest))
            .await
            .unwrap();
        let unread_flags = history.iter().filter(|m| !m.is_read()).count() as u32;
        assert_eq!(conversation.unread_count_for(&user("B")), 1);
        assert_eq!(unread_flags, 1);
    }

    #[tokio::test]
    async fn unknown_conversation_is_not_found() {
        let handler = MarkConversationReadHandler::new(
            Arc::new(InMemoryConversationStore::new()),
            Arc::new(InMemoryMessageStore::new()),
        );

        let result = handler
            .handle(MarkConversationReadCommand::parse("A_B", "A").unwrap())
            .await;

        assert!(matches!(result, Err(MessagingError::ConversationNotFound(_))));
    }
}
