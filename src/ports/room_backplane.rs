//! RoomBackplane port - cross-instance fan-out of realtime envelopes.
//!
//! A WebSocket is held by exactly one gateway instance, but a relay can be
//! requested on any of them. With a backplane configured, the gateway
//! publishes every addressed envelope to a shared channel and each instance
//! delivers it to the room members it holds locally.
//!
//! ## Flow
//!
//! 1. User B connects to instance 1 and joins room `user-B`
//! 2. User A asks instance 2 to relay a message to B
//! 3. Instance 2 publishes the `RoomDelivery` to the backplane
//! 4. Every instance (2 included) receives it through its subscription
//! 5. Instance 1 finds B's connections and pushes the envelope
//!
//! Delivery stays at-most-once: a publish with no subscriber holding the
//! room is dropped like any other delivery miss.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::domain::messaging::RoomDelivery;

/// Errors that can occur in backplane operations.
#[derive(Debug, thiserror::Error)]
pub enum BackplaneError {
    /// Redis communication error
    #[error("Redis error: {0}")]
    Redis(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The backplane has been shut down
    #[error("Backplane closed")]
    Closed,
}

/// Receives deliveries that arrived through the backplane.
#[async_trait]
pub trait DeliveryHandler: Send + Sync {
    /// Deliver to local room members. Returns how many connections got it.
    async fn deliver(&self, delivery: RoomDelivery) -> usize;
}

/// Port for publishing addressed envelopes to every gateway instance.
#[async_trait]
pub trait RoomBackplane: Send + Sync {
    /// Publish a delivery to all subscribed instances.
    ///
    /// Fire-and-forget: success means the backplane accepted it, not that
    /// any connection received it.
    async fn publish(&self, delivery: &RoomDelivery) -> Result<(), BackplaneError>;

    /// Start feeding incoming deliveries to `handler` on a background task.
    ///
    /// The task runs until the subscription ends or the handle is aborted.
    async fn subscribe(
        &self,
        handler: Arc<dyn DeliveryHandler>,
    ) -> Result<JoinHandle<()>, BackplaneError>;
}
