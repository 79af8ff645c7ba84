//! SendMessageHandler - persist a message and fold it into its conversation.
//!
//! This is the only writer of unread increments. The message is stored
//! first, then folded into the conversation aggregate (created lazily if
//! this is the pair's first message). Both steps tolerate a replay, so a
//! client retrying with the same `clientMessageId` after a failure ends
//! with one message and one fold.

use std::sync::Arc;

use crate::domain::foundation::{ClientMessageId, ConversationKey, Timestamp, UserId};
use crate::domain::messaging::{Message, MessagingError};
use crate::ports::{ConversationStore, MessageStore, UserDirectory, UserSummary};

/// Command to send a direct message.
#[derive(Debug, Clone)]
pub struct SendMessageCommand {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub conversation_key: ConversationKey,
    pub client_message_id: Option<ClientMessageId>,
}

impl SendMessageCommand {
    /// Parse raw fields as received from a client.
    ///
    /// # Errors
    ///
    /// `Validation` naming the first missing or malformed field.
    pub fn parse(
        sender_id: &str,
        receiver_id: &str,
        content: &str,
        conversation_id: &str,
        client_message_id: Option<&str>,
    ) -> Result<Self, MessagingError> {
        let sender_id = UserId::new(sender_id)
            .map_err(|e| MessagingError::validation("senderId", e.to_string()))?;
        let receiver_id = UserId::new(receiver_id)
            .map_err(|e| MessagingError::validation("receiverId", e.to_string()))?;
        if content.trim().is_empty() {
            return Err(MessagingError::validation("content", "content is required"));
        }
        let conversation_key = ConversationKey::parse(conversation_id)
            .map_err(|e| MessagingError::validation("conversationId", e.to_string()))?;
        let client_message_id = client_message_id
            .filter(|raw| !raw.trim().is_empty())
            .map(ClientMessageId::new)
            .transpose()
            .map_err(|e| MessagingError::validation("clientMessageId", e.to_string()))?;

        Ok(Self {
            sender_id,
            receiver_id,
            content: content.to_string(),
            conversation_key,
            client_message_id,
        })
    }
}

/// Result of a send.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message: Message,
    /// Display identity of the sender; id-only when the directory has none.
    pub sender: UserSummary,
    /// True when this was a retry of an already stored message.
    pub duplicate: bool,
}

pub struct SendMessageHandler {
    messages: Arc<dyn MessageStore>,
    conversations: Arc<dyn ConversationStore>,
    users: Arc<dyn UserDirectory>,
    max_content_length: usize,
}

impl SendMessageHandler {
    pub fn new(
        messages: Arc<dyn MessageStore>,
        conversations: Arc<dyn ConversationStore>,
        users: Arc<dyn UserDirectory>,
        max_content_length: usize,
    ) -> Self {
        Self {
            messages,
            conversations,
            users,
            max_content_length,
        }
    }

    pub async fn handle(&self, cmd: SendMessageCommand) -> Result<SentMessage, MessagingError> {
        // 1. Validate and build the message (no writes on failure)
        let message = Message::new(
            cmd.conversation_key,
            cmd.sender_id,
            cmd.receiver_id,
            &cmd.content,
            self.max_content_length,
            Timestamp::now(),
        )?
        .with_client_message_id(cmd.client_message_id);

        // 2. Persist, deduplicating retries
        let outcome = self.messages.append(&message).await?;
        let duplicate = outcome.is_duplicate();
        let message = outcome.into_message();

        // 3. Fold into the conversation. A retry replays the fold, which the
        //    store applies at most once per message id, so an earlier send
        //    whose conversation update failed is completed here.
        let conversation = self
            .conversations
            .record_message(&message)
            .await
            .map_err(|e| {
                tracing::error!(
                    message_id = %message.id(),
                    conversation_id = %message.conversation_key(),
                    error = %e,
                    "Message stored but conversation update failed"
                );
                MessagingError::from(e)
            })?;

        if duplicate {
            tracing::debug!(
                message_id = %message.id(),
                conversation_id = %message.conversation_key(),
                "Duplicate send"
            );
        } else {
            tracing::info!(
                message_id = %message.id(),
                conversation_id = %conversation.key(),
                sender_id = %message.sender_id(),
                "Message sent"
            );
        }

        // 4. Resolve the sender's display identity
        let sender = self.resolve_sender(message.sender_id()).await;

        Ok(SentMessage {
            message,
            sender,
            duplicate,
        })
    }

    async fn resolve_sender(&self, sender_id: &UserId) -> UserSummary {
        match self.users.resolve(sender_id).await {
            Ok(Some(summary)) => summary,
            Ok(None) => UserSummary::id_only(sender_id.clone()),
            Err(e) => {
                tracing::warn!(user_id = %sender_id, error = %e, "Sender lookup failed");
                UserSummary::id_only(sender_id.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryConversationStore, InMemoryMessageStore, InMemoryUserDirectory,
    };
    use crate::domain::foundation::DomainError;
    use crate::domain::messaging::{Conversation, DEFAULT_MAX_CONTENT_LENGTH};
    use async_trait::async_trait;

    struct Fixture {
        messages: Arc<InMemoryMessageStore>,
        conversations: Arc<InMemoryConversationStore>,
        handler: SendMessageHandler,
    }

    async fn fixture() -> Fixture {
        let messages = Arc::new(InMemoryMessageStore::new());
        let conversations = Arc::new(InMemoryConversationStore::new());
        let users = Arc::new(InMemoryUserDirectory::new().with_user("A", "Alice").await);
        let handler = SendMessageHandler::new(
            messages.clone(),
            conversations.clone(),
            users,
            DEFAULT_MAX_CONTENT_LENGTH,
        );
        Fixture {
            messages,
            conversations,
            handler,
        }
    }

    fn send(from: &str, to: &str, content: &str) -> SendMessageCommand {
        let key = ConversationKey::for_pair(&UserId::new(from).unwrap(), &UserId::new(to).unwrap())
            .unwrap();
        SendMessageCommand::parse(from, to, content, key.as_str(), None).unwrap()
    }

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    async fn conversation(f: &Fixture, key: &str) -> Conversation {
        f.conversations
            .find_by_key(&ConversationKey::parse(key).unwrap())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn first_message_creates_conversation() {
        let f = fixture().await;

        let sent = f.handler.handle(send("A", "B", "  hi  ")).await.unwrap();

        assert_eq!(sent.message.content(), "hi");
        assert!(!sent.message.is_read());
        assert!(!sent.duplicate);

        let c = conversation(&f, "A_B").await;
        assert_eq!(c.unread_count_for(&user("A")), 0);
        assert_eq!(c.unread_count_for(&user("B")), 1);
        assert_eq!(c.last_message().unwrap().content, "hi");
    }

    #[tokio::test]
    async fn each_send_increments_only_the_receiver() {
        let f = fixture().await;

        f.handler.handle(send("A", "B", "one")).await.unwrap();
        f.handler.handle(send("A", "B", "two")).await.unwrap();
        f.handler.handle(send("B", "A", "three")).await.unwrap();

        let c = conversation(&f, "A_B").await;
        assert_eq!(c.unread_count_for(&user("A")), 1);
        assert_eq!(c.unread_count_for(&user("B")), 2);
        assert_eq!(c.last_message().unwrap().content, "three");
        assert_eq!(c.last_message().unwrap().sender_id, user("B"));
    }

    #[tokio::test]
    async fn resolves_sender_identity() {
        let f = fixture().await;

        let known = f.handler.handle(send("A", "B", "hi")).await.unwrap();
        let unknown = f.handler.handle(send("B", "A", "hey")).await.unwrap();

        assert_eq!(known.sender.name.as_deref(), Some("Alice"));
        assert_eq!(unknown.sender, UserSummary::id_only(user("B")));
    }

    #[tokio::test]
    async fn mismatched_conversation_is_rejected_without_writes() {
        let f = fixture().await;
        let cmd = SendMessageCommand::parse("A", "B", "hi", "A_C", None).unwrap();

        let result = f.handler.handle(cmd).await;

        assert!(matches!(result, Err(MessagingError::Validation { .. })));
        assert!(f.messages.is_empty().await);
        assert!(f.conversations.is_empty().await);
    }

    #[tokio::test]
    async fn oversized_content_is_rejected() {
        let f = fixture().await;
        let content = "x".repeat(DEFAULT_MAX_CONTENT_LENGTH + 1);

        let result = f.handler.handle(send("A", "B", &content)).await;

        assert!(matches!(
            result,
            Err(MessagingError::Validation { ref field, .. }) if field == "content"
        ));
    }

    #[tokio::test]
    async fn retry_with_client_id_is_stored_once() {
        let f = fixture().await;
        let cmd = SendMessageCommand::parse("A", "B", "hi", "A_B", Some("c-42")).unwrap();

        let first = f.handler.handle(cmd.clone()).await.unwrap();
        let retry = f.handler.handle(cmd).await.unwrap();

        assert!(retry.duplicate);
        assert_eq!(first.message.id(), retry.message.id());
        assert_eq!(f.messages.len().await, 1);
        assert_eq!(conversation(&f, "A_B").await.unread_count_for(&user("B")), 1);
    }

    #[test]
    fn parse_names_the_missing_field() {
        let cases = [
            (["", "B", "hi", "A_B"], "senderId"),
            (["A", "", "hi", "A_B"], "receiverId"),
            (["A", "B", "   ", "A_B"], "content"),
            (["A", "B", "hi", ""], "conversationId"),
        ];
        for ([sender, receiver, content, conversation], expected) in cases {
            match SendMessageCommand::parse(sender, receiver, content, conversation, None) {
                Err(MessagingError::Validation { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected validation error for {}, got {:?}", expected, other),
            }
        }
    }

    #[test]
    fn blank_client_message_id_is_ignored() {
        let cmd = SendMessageCommand::parse("A", "B", "hi", "A_B", Some(" ")).unwrap();
        assert!(cmd.client_message_id.is_none());
    }

    struct FailingConversationStore;

    #[async_trait]
    impl ConversationStore for FailingConversationStore {
        async fn find_by_key(
            &self,
            _key: &ConversationKey,
        ) -> Result<Option<Conversation>, DomainError> {
            Err(DomainError::database("connection refused"))
        }

        async fn find_or_create(&self, _key: &ConversationKey) -> Result<Conversation, DomainError> {
            Err(DomainError::database("connection refused"))
        }

        async fn record_message(&self, _message: &Message) -> Result<Conversation, DomainError> {
            Err(DomainError::database("connection refused"))
        }

        async fn mark_read(
            &self,
            _key: &ConversationKey,
            _user_id: &UserId,
        ) -> Result<Conversation, DomainError> {
            Err(DomainError::database("connection refused"))
        }

        async fn soft_delete(
            &self,
            _key: &ConversationKey,
            _user_id: &UserId,
        ) -> Result<Conversation, DomainError> {
            Err(DomainError::database("connection refused"))
        }

        async fn list_visible_for(&self, _user_id: &UserId) -> Result<Vec<Conversation>, DomainError> {
            Err(DomainError::database("connection refused"))
        }
    }

    /// Fails the first fold, then delegates.
    struct FailsFirstFold {
        inner: InMemoryConversationStore,
        failed: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl ConversationStore for FailsFirstFold {
        async fn find_by_key(
            &self,
            key: &ConversationKey,
        ) -> Result<Option<Conversation>, DomainError> {
            self.inner.find_by_key(key).await
        }

        async fn find_or_create(&self, key: &ConversationKey) -> Result<Conversation, DomainError> {
            self.inner.find_or_create(key).await
        }

        async fn record_message(&self, message: &Message) -> Result<Conversation, DomainError> {
            if !self.failed.swap(true, std::sync::atomic::Ordering::SeqCst) {
                return Err(DomainError::database("connection reset"));
            }
            self.inner.record_message(message).await
        }

        async fn mark_read(
            &self,
            key: &ConversationKey,
            user_id: &UserId,
        ) -> Result<Conversation, DomainError> {
            self.inner.mark_read(key, user_id).await
        }

        async fn soft_delete(
            &self,
            key: &ConversationKey,
            user_id: &UserId,
        ) -> Result<Conversation, DomainError> {
            self.inner.soft_delete(key, user_id).await
        }

        async fn list_visible_for(&self, user_id: &UserId) -> Result<Vec<Conversation>, DomainError> {
            self.inner.list_visible_for(user_id).await
        }
    }

    #[tokio::test]
    async fn retry_completes_a_send_whose_fold_failed() {
        let messages = Arc::new(InMemoryMessageStore::new());
        let conversations = Arc::new(FailsFirstFold {
            inner: InMemoryConversationStore::new(),
            failed: std::sync::atomic::AtomicBool::new(false),
        });
        let handler = SendMessageHandler::new(
            messages.clone(),
            conversations.clone(),
            Arc::new(InMemoryUserDirectory::new()),
            DEFAULT_MAX_CONTENT_LENGTH,
        );
        let cmd = SendMessageCommand::parse("A", "B", "hi", "A_B", Some("c-7")).unwrap();

        let first = handler.handle(cmd.clone()).await;
        assert!(matches!(first, Err(MessagingError::Store(_))));

        let retry = handler.handle(cmd.clone()).await.unwrap();
        assert!(retry.duplicate);
        assert_eq!(messages.len().await, 1);

        let key = ConversationKey::parse("A_B").unwrap();
        let c = conversations.find_by_key(&key).await.unwrap().unwrap();
        assert_eq!(c.unread_count_for(&user("B")), 1);
        assert_eq!(c.last_message().unwrap().content, "hi");
        assert_eq!(conversations.list_visible_for(&user("B")).await.unwrap().len(), 1);

        // A further retry changes nothing.
        handler.handle(cmd).await.unwrap();
        let c = conversations.find_by_key(&key).await.unwrap().unwrap();
        assert_eq!(c.unread_count_for(&user("B")), 1);
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_store_error() {
        let handler = SendMessageHandler::new(
            Arc::new(InMemoryMessageStore::new()),
            Arc::new(FailingConversationStore),
            Arc::new(InMemoryUserDirectory::new()),
            DEFAULT_MAX_CONTENT_LENGTH,
        );

        let result = handler.handle(send("A", "B", "hi")).await;

        match result {
            Err(MessagingError::Store(message)) => assert!(message.contains("connection refused")),
            other => panic!("expected store error, got {:?}", other),
        }
    }
}
