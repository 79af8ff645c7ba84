//! Message store port.
//!
//! Append-only persistence of direct messages. The only mutation after
//! insertion is flipping the `read` flag.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ConversationKey, DomainError, Timestamp, UserId};
use crate::domain::messaging::Message;

/// Which end of a conversation's history a capped page is taken from.
///
/// Either way, the returned page is ordered oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryWindow {
    /// The first `limit` messages ever sent.
    #[default]
    Oldest,
    /// The most recent `limit` messages.
    Latest,
}

/// Size and position of a history page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryPage {
    pub limit: u32,
    pub window: HistoryWindow,
}

impl HistoryPage {
    pub fn new(limit: u32, window: HistoryWindow) -> Self {
        Self { limit, window }
    }
}

impl Default for HistoryPage {
    /// The oldest 50 messages.
    fn default() -> Self {
        Self::new(50, HistoryWindow::Oldest)
    }
}

/// Result of an append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The message was stored.
    Inserted(Message),
    /// A message with the same sender and client message id already
    /// exists; the stored original is returned and nothing was written.
    Duplicate(Message),
}

impl AppendOutcome {
    pub fn message(&self) -> &Message {
        match self {
            AppendOutcome::Inserted(m) | AppendOutcome::Duplicate(m) => m,
        }
    }

    pub fn into_message(self) -> Message {
        match self {
            AppendOutcome::Inserted(m) | AppendOutcome::Duplicate(m) => m,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, AppendOutcome::Duplicate(_))
    }
}

/// Persistence port for messages.
///
/// Implementations must make the duplicate check and the insert a single
/// atomic step, so two concurrent retries of one send store one message.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Append a message, deduplicating on `(sender_id, client_message_id)`
    /// when the message carries a client id.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn append(&self, message: &Message) -> Result<AppendOutcome, DomainError>;

    /// Messages of a conversation ordered by `sent_at` ascending (insertion
    /// order breaks ties), capped to `page.limit`.
    async fn list_for_conversation(
        &self,
        key: &ConversationKey,
        page: HistoryPage,
    ) -> Result<Vec<Message>, DomainError>;

    /// Set `read = true` on the messages of the conversation addressed to
    /// `receiver_id` and sent at or before `up_to`. Later messages keep
    /// their flag. Returns how many flags changed.
    async fn mark_read_for(
        &self,
        key: &ConversationKey,
        receiver_id: &UserId,
        up_to: Timestamp,
    ) -> Result<u64, DomainError>;
}
