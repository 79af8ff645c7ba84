//! In-memory implementation of MessageStore.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{ConversationKey, DomainError, Timestamp, UserId};
use crate::domain::messaging::Message;
use crate::ports::{AppendOutcome, HistoryPage, HistoryWindow, MessageStore};

#[derive(Default)]
struct State {
    /// Messages with their insertion sequence.
    messages: Vec<(u64, Message)>,
    next_seq: u64,
}

/// Message store backed by a vector.
#[derive(Default)]
pub struct InMemoryMessageStore {
    state: RwLock<State>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total stored messages across all conversations.
    pub async fn len(&self) -> usize {
        self.state.read().await.messages.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn append(&self, message: &Message) -> Result<AppendOutcome, DomainError> {
        let mut state = self.state.write().await;

        if let Some(client_id) = message.client_message_id() {
            let existing = state.messages.iter().find(|(_, m)| {
                m.sender_id() == message.sender_id() && m.client_message_id() == Some(client_id)
            });
            if let Some((_, original)) = existing {
                return Ok(AppendOutcome::Duplicate(original.clone()));
            }
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.messages.push((seq, message.clone()));

        Ok(AppendOutcome::Inserted(message.clone()))
    }

    async fn list_for_conversation(
        &self,
        key: &ConversationKey,
        page: HistoryPage,
    ) -> Result<Vec<Message>, DomainError> {
        let state = self.state.read().await;

        let mut matching: Vec<&(u64, Message)> = state
            .messages
            .iter()
            .filter(|(_, m)| m.conversation_key() == key)
            .collect();
        matching.sort_by(|(a_seq, a), (b_seq, b)| {
            a.sent_at().cmp(b.sent_at()).then(a_seq.cmp(b_seq))
        });

        let limit = page.limit as usize;
        let skip = match page.window {
            HistoryWindow::Oldest => 0,
            HistoryWindow::Latest => matching.len().saturating_sub(limit),
        };

        Ok(matching
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|(_, m)| m.clone())
            .collect())
    }

    async fn mark_read_for(
        &self,
        key: &ConversationKey,
        receiver_id: &UserId,
        up_to: Timestamp,
    ) -> Result<u64, DomainError> {
        let mut state = self.state.write().await;

        let mut changed = 0;
        for (_, message) in state.messages.iter_mut() {
            if message.conversation_key() == key
                && message.receiver_id() == receiver_id
                && *message.sent_at() <= up_to
                && message.mark_read()
            {
                changed += 1;
            }
        }
        Ok(changed)
    }
}
