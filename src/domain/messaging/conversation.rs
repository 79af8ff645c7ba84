//! Conversation aggregate - per-pair preview, unread and visibility state.
//!
//! Exactly one conversation exists per unordered pair of users, addressed by
//! its [`ConversationKey`]. Messages reference it by key and are not owned.
//!
//! The mutators here describe the field-level transitions. Stores apply
//! them atomically: the in-memory store under a single write lock, the
//! Postgres store as targeted `UPDATE` statements.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    ConversationId, ConversationKey, DomainError, ErrorCode, Timestamp, UserId,
};

use super::message::Message;

/// Denormalized preview of the most recent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMessage {
    pub content: String,
    pub sent_at: Timestamp,
    pub sender_id: UserId,
}

impl From<&Message> for LastMessage {
    fn from(message: &Message) -> Self {
        Self {
            content: message.content().to_string(),
            sent_at: *message.sent_at(),
            sender_id: message.sender_id().clone(),
        }
    }
}

/// Conversation aggregate.
///
/// # Invariants
///
/// - `key` is unique; `participants` are the two users of the key
/// - every value in `unread_counts` is >= 0 and keyed by a participant
/// - a sender's own count is never incremented by their own message
/// - any new message empties `deleted_by`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    id: ConversationId,
    key: ConversationKey,
    last_message: Option<LastMessage>,
    unread_counts: BTreeMap<UserId, u32>,
    deleted_by: BTreeSet<UserId>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Conversation {
    /// Start an empty conversation with zero unread counts for both users.
    pub fn start(key: ConversationKey) -> Self {
        let now = Timestamp::now();
        let mut conversation = Self {
            id: ConversationId::new(),
            key,
            last_message: None,
            unread_counts: BTreeMap::new(),
            deleted_by: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        };
        conversation.ensure_counters();
        conversation
    }

    /// Create a conversation lazily from its first message.
    ///
    /// Resulting counts are `{sender: 0, receiver: 1}`.
    pub fn from_first_message(message: &Message) -> Self {
        let mut conversation = Self::start(message.conversation_key().clone());
        conversation.record_message(message);
        conversation
    }

    /// Reconstitute a conversation from persistence (no validation).
    pub fn reconstitute(
        id: ConversationId,
        key: ConversationKey,
        last_message: Option<LastMessage>,
        unread_counts: BTreeMap<UserId, u32>,
        deleted_by: BTreeSet<UserId>,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            key,
            last_message,
            unread_counts,
            deleted_by,
            created_at,
            updated_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    pub fn key(&self) -> &ConversationKey {
        &self.key
    }

    pub fn participants(&self) -> [&UserId; 2] {
        self.key.participants()
    }

    pub fn last_message(&self) -> Option<&LastMessage> {
        self.last_message.as_ref()
    }

    pub fn last_message_at(&self) -> Option<&Timestamp> {
        self.last_message.as_ref().map(|m| &m.sent_at)
    }

    pub fn unread_counts(&self) -> &BTreeMap<UserId, u32> {
        &self.unread_counts
    }

    pub fn deleted_by(&self) -> &BTreeSet<UserId> {
        &self.deleted_by
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    /// The user's own unread count (0 for unknown users).
    pub fn unread_count_for(&self, user_id: &UserId) -> u32 {
        self.unread_counts.get(user_id).copied().unwrap_or(0)
    }

    /// Whether the conversation shows up in the user's list.
    pub fn is_visible_to(&self, user_id: &UserId) -> bool {
        self.key.includes(user_id) && !self.deleted_by.contains(user_id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────────────────────

    /// Initialize missing counters to zero for both participants.
    pub fn ensure_counters(&mut self) {
        for participant in self.key.participants() {
            self.unread_counts.entry(participant.clone()).or_insert(0);
        }
    }

    /// Apply a newly persisted message.
    ///
    /// Increments the receiver's unread count, reactivates the conversation
    /// for both participants, and moves the preview forward. A message older
    /// than the current preview (concurrent sends) leaves the preview alone.
    pub fn record_message(&mut self, message: &Message) {
        self.ensure_counters();

        let newer = self
            .last_message
            .as_ref()
            .map_or(true, |last| !message.sent_at().is_before(&last.sent_at));
        if newer {
            self.last_message = Some(LastMessage::from(message));
        }

        *self
            .unread_counts
            .entry(message.receiver_id().clone())
            .or_insert(0) += 1;
        self.deleted_by.clear();
        self.touch();
    }

    /// Zero the user's unread count.
    ///
    /// # Errors
    ///
    /// - `NotParticipant` if the user is not part of this conversation
    pub fn mark_read(&mut self, user_id: &UserId) -> Result<(), DomainError> {
        self.require_participant(user_id)?;
        self.ensure_counters();
        self.unread_counts.insert(user_id.clone(), 0);
        self.touch();
        Ok(())
    }

    /// Hide the conversation from the user's list (set semantics).
    ///
    /// # Errors
    ///
    /// - `NotParticipant` if the user is not part of this conversation
    pub fn soft_delete(&mut self, user_id: &UserId) -> Result<(), DomainError> {
        self.require_participant(user_id)?;
        self.deleted_by.insert(user_id.clone());
        self.touch();
        Ok(())
    }

    fn require_participant(&self, user_id: &UserId) -> Result<(), DomainError> {
        if self.key.includes(user_id) {
            Ok(())
        } else {
            Err(not_participant(&self.key, user_id))
        }
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}

/// Error for a key that addresses no stored conversation.
pub fn conversation_not_found(key: &ConversationKey) -> DomainError {
    DomainError::new(
        ErrorCode::ConversationNotFound,
        format!("Conversation not found: {}", key),
    )
    .with_detail("conversation_id", key.as_str())
}

/// Error for a user acting on a conversation they are not part of.
pub fn not_participant(key: &ConversationKey, user_id: &UserId) -> DomainError {
    DomainError::new(
        ErrorCode::NotParticipant,
        format!("User {} is not a participant of {}", user_id, key),
    )
    .with_detail("conversation_id", key.as_str())
    .with_detail("user_id", user_id.as_str())
}
