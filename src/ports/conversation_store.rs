//! Conversation store port.
//!
//! The conversation record is shared by both participants and mutated
//! concurrently: the sender bumps the receiver's unread count, the receiver
//! zeroes their own, either side soft-deletes, and any send reactivates.
//!
//! # Atomicity
//!
//! Every mutating method is a single atomic operation on the record.
//! Implementations must use field-targeted updates (increment, set-add,
//! set-clear) or an equivalent critical section, never a read of the whole
//! record followed by a blind write, so no increment is lost.

use async_trait::async_trait;

use crate::domain::foundation::{ConversationKey, DomainError, UserId};
use crate::domain::messaging::{Conversation, Message};

/// Persistence port for the Conversation aggregate.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Find a conversation by its natural key.
    async fn find_by_key(&self, key: &ConversationKey) -> Result<Option<Conversation>, DomainError>;

    /// Return the conversation for the key, creating it with zero unread
    /// counts if it does not exist. Concurrent callers get the same record.
    async fn find_or_create(&self, key: &ConversationKey) -> Result<Conversation, DomainError>;

    /// Fold a stored message into its conversation.
    ///
    /// Creates the conversation if absent (`{sender: 0, receiver: 1}`),
    /// otherwise updates the preview, increments the receiver's unread count
    /// by exactly one and clears `deleted_by`.
    ///
    /// Idempotent per message id: a message already folded in leaves the
    /// record untouched and the current state is returned. Claiming the id
    /// and applying the update are one atomic step.
    async fn record_message(&self, message: &Message) -> Result<Conversation, DomainError>;

    /// Set the user's unread count to zero.
    ///
    /// # Errors
    ///
    /// - `ConversationNotFound` if no conversation has this key
    /// - `NotParticipant` if the user is not part of it
    async fn mark_read(
        &self,
        key: &ConversationKey,
        user_id: &UserId,
    ) -> Result<Conversation, DomainError>;

    /// Add the user to `deleted_by`.
    ///
    /// # Errors
    ///
    /// - `ConversationNotFound` if no conversation has this key
    /// - `NotParticipant` if the user is not part of it
    async fn soft_delete(
        &self,
        key: &ConversationKey,
        user_id: &UserId,
    ) -> Result<Conversation, DomainError>;

    /// Conversations the user participates in and has not deleted, most
    /// recent activity first. Conversations without messages sort last.
    async fn list_visible_for(&self, user_id: &UserId) -> Result<Vec<Conversation>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn ConversationStore) {}
    }
}
