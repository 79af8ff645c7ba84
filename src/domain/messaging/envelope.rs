//! Transient realtime envelope relayed to a receiver's room.
//!
//! Envelopes are notification hints only. They are never persisted; the
//! durable copy of a message is whatever the REST send path stored.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId};

/// Live message pushed to every connection of the receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeEnvelope {
    pub sender_id: UserId,
    pub sender_name: String,
    pub message: String,
    pub timestamp: Timestamp,
}

impl RealtimeEnvelope {
    /// Build an envelope stamped with the current time.
    pub fn new(sender_id: UserId, sender_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sender_id,
            sender_name: sender_name.into(),
            message: message.into(),
            timestamp: Timestamp::now(),
        }
    }
}

/// An envelope addressed to a user's room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDelivery {
    pub receiver_id: UserId,
    pub envelope: RealtimeEnvelope,
}
