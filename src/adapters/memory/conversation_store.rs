//! In-memory implementation of ConversationStore.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{ConversationKey, DomainError, MessageId, UserId};
use crate::domain::messaging::{conversation_not_found, Conversation, Message};
use crate::ports::ConversationStore;

#[derive(Default)]
struct State {
    conversations: HashMap<ConversationKey, Conversation>,
    /// Messages already folded into their conversation.
    recorded: HashSet<MessageId>,
}

/// Conversation store keyed by conversation key.
///
/// Each mutation reads and writes the record under one write lock.
#[derive(Default)]
pub struct InMemoryConversationStore {
    state: RwLock<State>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.conversations.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn update<F>(&self, key: &ConversationKey, apply: F) -> Result<Conversation, DomainError>
    where
        F: FnOnce(&mut Conversation) -> Result<(), DomainError> + Send,
    {
        let mut state = self.state.write().await;
        let conversation = state
            .conversations
            .get_mut(key)
            .ok_or_else(|| conversation_not_found(key))?;
        apply(conversation)?;
        Ok(conversation.clone())
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn find_by_key(&self, key: &ConversationKey) -> Result<Option<Conversation>, DomainError> {
        Ok(self.state.read().await.conversations.get(key).cloned())
    }

    async fn find_or_create(&self, key: &ConversationKey) -> Result<Conversation, DomainError> {
        let mut state = self.state.write().await;
        let conversation = state
            .conversations
            .entry(key.clone())
            .or_insert_with(|| Conversation::start(key.clone()));
        Ok(conversation.clone())
    }

    async fn record_message(&self, message: &Message) -> Result<Conversation, DomainError> {
        let mut state = self.state.write().await;
        let key = message.conversation_key();

        if !state.recorded.insert(*message.id()) {
            if let Some(existing) = state.conversations.get(key) {
                return Ok(existing.clone());
            }
        }

        let conversation = state
            .conversations
            .entry(key.clone())
            .and_modify(|existing| existing.record_message(message))
            .or_insert_with(|| Conversation::from_first_message(message));
        Ok(conversation.clone())
    }

    async fn mark_read(
        &self,
        key: &ConversationKey,
        user_id: &UserId,
    ) -> Result<Conversation, DomainError> {
        self.update(key, |c| c.mark_read(user_id)).await
    }

    async fn soft_delete(
        &self,
        key: &ConversationKey,
        user_id: &UserId,
    ) -> Result<Conversation, DomainError> {
        self.update(key, |c| c.soft_delete(user_id)).await
    }

    async fn list_visible_for(&self, user_id: &UserId) -> Result<Vec<Conversation>, DomainError> {
        let state = self.state.read().await;

        let mut visible: Vec<Conversation> = state
            .conversations
            .values()
            .filter(|c| c.is_visible_to(user_id))
            .cloned()
            .collect();

        // Most recent first, conversations without messages last.
        visible.sort_by(|a, b| match (a.last_message_at(), b.last_message_at()) {
            (Some(a_at), Some(b_at)) => b_at.cmp(a_at),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => b.created_at().cmp(a.created_at()),
        });

        Ok(visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{ErrorCode, Timestamp};
    use crate::domain::messaging::DEFAULT_MAX_CONTENT_LENGTH;
    use std::sync::Arc;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn key(a: &str, b: &str) -> ConversationKey {
        ConversationKey::for_pair(&user(a), &user(b)).unwrap()
    }

    fn message(from: &str, to: &str, content: &str, sent_at: Timestamp) -> Message {
        Message::new(
            key(from, to),
            user(from),
            user(to),
            content,
            DEFAULT_MAX_CONTENT_LENGTH,
            sent_at,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn record_message_creates_conversation_lazily() {
        let store = InMemoryConversationStore::new();

        let conversation = store
            .record_message(&message("A", "B", "hello", Timestamp::now()))
            .await
            .unwrap();

        assert_eq!(conversation.unread_count_for(&user("A")), 0);
        assert_eq!(conversation.unread_count_for(&user("B")), 1);
        assert_eq!(conversation.last_message().unwrap().content, "hello");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn recording_the_same_message_twice_counts_once() {
        let store = InMemoryConversationStore::new();
        let first = message("A", "B", "hello", Timestamp::now());

        store.record_message(&first).await.unwrap();
        store.soft_delete(&key("A", "B"), &user("A")).await.unwrap();
        let replayed = store.record_message(&first).await.unwrap();

        assert_eq!(replayed.unread_count_for(&user("B")), 1);
        assert!(!replayed.is_visible_to(&user("A")));
    }

    #[tokio::test]
    async fn find_or_create_returns_existing_record() {
        let store = InMemoryConversationStore::new();
        store
            .record_message(&message("A", "B", "hello", Timestamp::now()))
            .await
            .unwrap();

        let conversation = store.find_or_create(&key("B", "A")).await.unwrap();

        assert_eq!(conversation.unread_count_for(&user("B")), 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn concurrent_sends_lose_no_increment() {
        let store = Arc::new(InMemoryConversationStore::new());
        let mut tasks = Vec::new();
        for i in 0..50 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .record_message(&message("A", "B", &format!("m{}", i), Timestamp::now()))
                    .await
                    .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let conversation = store.find_by_key(&key("A", "B")).await.unwrap().unwrap();
        assert_eq!(conversation.unread_count_for(&user("B")), 50);
        assert_eq!(conversation.unread_count_for(&user("A")), 0);
    }

    #[tokio::test]
    async fn mark_read_unknown_conversation_is_not_found() {
        let store = InMemoryConversationStore::new();

        let err = store.mark_read(&key("A", "B"), &user("A")).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::ConversationNotFound);
    }

    #[tokio::test]
    async fn soft_delete_by_outsider_is_rejected() {
        let store = InMemoryConversationStore::new();
        store.find_or_create(&key("A", "B")).await.unwrap();

        let err = store.soft_delete(&key("A", "B"), &user("C")).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::NotParticipant);
    }

    #[tokio::test]
    async fn list_hides_deleted_and_orders_by_activity() {
        let store = InMemoryConversationStore::new();
        let t0 = Timestamp::now();
        store.find_or_create(&key("A", "D")).await.unwrap();
        store.record_message(&message("A", "B", "older", t0)).await.unwrap();
        store
            .record_message(&message("C", "A", "newer", t0.plus_millis(5)))
            .await
            .unwrap();
        store.record_message(&message("A", "E", "gone", t0)).await.unwrap();
        store.soft_delete(&key("A", "E"), &user("A")).await.unwrap();

        let listed = store.list_visible_for(&user("A")).await.unwrap();
        let keys: Vec<&str> = listed.iter().map(|c| c.key().as_str()).collect();

        assert_eq!(keys, vec!["A_C", "A_B", "A_D"]);

        let for_e = store.list_visible_for(&user("E")).await.unwrap();
        assert_eq!(for_e.len(), 1);
    }

    #[tokio::test]
    async fn new_message_reactivates_deleted_conversation() {
        let store = InMemoryConversationStore::new();
        store.record_message(&message("A", "B", "one", Timestamp::now())).await.unwrap();
        store.soft_delete(&key("A", "B"), &user("A")).await.unwrap();
        assert!(store.list_visible_for(&user("A")).await.unwrap().is_empty());

        store.record_message(&message("B", "A", "two", Timestamp::now())).await.unwrap();

        assert_eq!(store.list_visible_for(&user("A")).await.unwrap().len(), 1);
    }
}
