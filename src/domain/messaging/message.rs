//! Message entity - one direct message between two users.
//!
//! Messages are append-only. After creation only the `read` flag changes.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    ClientMessageId, ConversationKey, MessageId, Timestamp, UserId, ValidationError,
};

/// Default maximum length of message content, in characters.
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 5000;

/// A persisted direct message.
///
/// # Invariants
///
/// - `content` is trimmed and non-empty
/// - `sender_id != receiver_id`, and both are the participants of `conversation_key`
/// - only `read` is mutable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    conversation_key: ConversationKey,
    sender_id: UserId,
    receiver_id: UserId,
    content: String,
    sent_at: Timestamp,
    read: bool,
    client_message_id: Option<ClientMessageId>,
}

impl Message {
    /// Compose a new unread message.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if content is blank after trimming
    /// - `TooLong` if content exceeds `max_content_length` characters
    /// - `InvalidFormat` if the key does not belong to the sender/receiver pair
    pub fn new(
        conversation_key: ConversationKey,
        sender_id: UserId,
        receiver_id: UserId,
        content: &str,
        max_content_length: usize,
        sent_at: Timestamp,
    ) -> Result<Self, ValidationError> {
        let content = Self::validate_content(content, max_content_length)?;

        let expected = ConversationKey::for_pair(&sender_id, &receiver_id)?;
        if expected != conversation_key {
            return Err(ValidationError::invalid_format(
                "conversation_id",
                format!(
                    "'{}' does not match the sender/receiver pair '{}'",
                    conversation_key, expected
                ),
            ));
        }

        Ok(Self {
            id: MessageId::new(),
            conversation_key,
            sender_id,
            receiver_id,
            content,
            sent_at,
            read: false,
            client_message_id: None,
        })
    }

    /// Attach the client-generated id used to recognize retries.
    pub fn with_client_message_id(mut self, id: Option<ClientMessageId>) -> Self {
        self.client_message_id = id;
        self
    }

    /// Reconstitute a message from persistence (no validation).
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: MessageId,
        conversation_key: ConversationKey,
        sender_id: UserId,
        receiver_id: UserId,
        content: String,
        sent_at: Timestamp,
        read: bool,
        client_message_id: Option<ClientMessageId>,
    ) -> Self {
        Self {
            id,
            conversation_key,
            sender_id,
            receiver_id,
            content,
            sent_at,
            read,
            client_message_id,
        }
    }

    fn validate_content(content: &str, max_length: usize) -> Result<String, ValidationError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("content"));
        }
        if trimmed.chars().count() > max_length {
            return Err(ValidationError::too_long("content", max_length));
        }
        Ok(trimmed.to_string())
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn conversation_key(&self) -> &ConversationKey {
        &self.conversation_key
    }

    pub fn sender_id(&self) -> &UserId {
        &self.sender_id
    }

    pub fn receiver_id(&self) -> &UserId {
        &self.receiver_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn sent_at(&self) -> &Timestamp {
        &self.sent_at
    }

    pub fn is_read(&self) -> bool {
        self.read
    }

    pub fn client_message_id(&self) -> Option<&ClientMessageId> {
        self.client_message_id.as_ref()
    }

    /// Mark as read. Returns `true` if the flag changed.
    pub fn mark_read(&mut self) -> bool {
        let changed = !self.read;
        self.read = true;
        changed
    }
}
