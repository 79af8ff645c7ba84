//! Realtime gateway - join, relay and disconnect over user rooms.
//!
//! Relay is a transient notification path. Nothing is persisted here; the
//! REST send is the source of truth and clients re-fetch history when they
//! reconnect.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::foundation::{UserId, ValidationError};
use crate::domain::messaging::{RealtimeEnvelope, RoomDelivery};
use crate::ports::{BackplaneError, DeliveryHandler, RoomBackplane};

use super::messages::{SendMessageFrame, ServerMessage};
use super::rooms::{ClientId, RoomManager};

/// Errors reported to the connection that asked for a relay.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("relay failed: {0}")]
    Backplane(#[from] BackplaneError),
}

impl GatewayError {
    /// Code carried by the `message-error` frame.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Validation(_) => "VALIDATION_FAILED",
            GatewayError::Backplane(_) => "RELAY_FAILED",
        }
    }
}

/// What happened to a relayed envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Queued for this many local connections of the receiver.
    Delivered(usize),
    /// The receiver's room has no members here. Not an error.
    Missed,
    /// Handed to the backplane; delivery happens on every instance.
    Published,
}

/// Room-based realtime relay.
pub struct RealtimeGateway {
    rooms: Arc<RoomManager>,
    backplane: Option<Arc<dyn RoomBackplane>>,
    max_content_length: usize,
}

impl RealtimeGateway {
    /// Gateway delivering to local connections only.
    pub fn new(rooms: Arc<RoomManager>, max_content_length: usize) -> Self {
        Self {
            rooms,
            backplane: None,
            max_content_length,
        }
    }

    /// Route every relay through a backplane shared by all instances.
    pub fn with_backplane(mut self, backplane: Arc<dyn RoomBackplane>) -> Self {
        self.backplane = Some(backplane);
        self
    }

    pub fn rooms(&self) -> &Arc<RoomManager> {
        &self.rooms
    }

    /// Subscribe this gateway to its backplane, if any.
    ///
    /// Must be called once at startup; without it published envelopes
    /// never reach local connections.
    pub async fn start_backplane(
        self: &Arc<Self>,
    ) -> Result<Option<JoinHandle<()>>, BackplaneError> {
        match &self.backplane {
            Some(backplane) => {
                let handler: Arc<dyn DeliveryHandler> = self.clone();
                Ok(Some(backplane.subscribe(handler).await?))
            }
            None => Ok(None),
        }
    }

    /// Register a new connection in the Connected state.
    pub async fn connect(&self) -> (ClientId, mpsc::UnboundedReceiver<ServerMessage>) {
        let (client_id, rx) = self.rooms.connect().await;
        tracing::debug!(client_id = %client_id, "Client connected");
        (client_id, rx)
    }

    /// Join the connection to `user-{user_id}`. Idempotent.
    ///
    /// Returns the room name.
    pub async fn join(&self, client_id: &ClientId, user_id: &str) -> Result<String, GatewayError> {
        let user_id = UserId::new(user_id)?;
        let room = user_id.room_name();

        if self.rooms.join(client_id, &user_id).await {
            tracing::debug!(client_id = %client_id, room = %room, "Joined room");
        }
        Ok(room)
    }

    /// Relay a live message to every connection of the receiver.
    ///
    /// An empty `sender_name` falls back to the sender id.
    pub async fn relay(&self, frame: SendMessageFrame) -> Result<RelayOutcome, GatewayError> {
        let delivery = self.build_delivery(frame)?;

        if let Some(backplane) = &self.backplane {
            backplane.publish(&delivery).await?;
            return Ok(RelayOutcome::Published);
        }

        let delivered = self.deliver_local(&delivery).await;
        if delivered == 0 {
            tracing::debug!(
                receiver_id = %delivery.receiver_id,
                "Receiver not connected, live message dropped"
            );
            Ok(RelayOutcome::Missed)
        } else {
            Ok(RelayOutcome::Delivered(delivered))
        }
    }

    /// Remove the connection from all rooms. Terminal.
    pub async fn disconnect(&self, client_id: &ClientId) {
        self.rooms.disconnect(client_id).await;
        tracing::debug!(client_id = %client_id, "Client disconnected");
    }

    /// Push a frame to one connection (acks and errors).
    pub async fn reply(&self, client_id: &ClientId, message: ServerMessage) -> bool {
        self.rooms.send_to(client_id, message).await
    }

    async fn deliver_local(&self, delivery: &RoomDelivery) -> usize {
        let message = ServerMessage::ReceiveMessage(delivery.envelope.clone());
        self.rooms.send_to_room(&delivery.receiver_id, &message).await
    }

    fn build_delivery(&self, frame: SendMessageFrame) -> Result<RoomDelivery, GatewayError> {
        let sender_id = UserId::new(frame.sender_id)
            .map_err(|_| ValidationError::empty_field("senderId"))?;
        let receiver_id = UserId::new(frame.receiver_id)
            .map_err(|_| ValidationError::empty_field("receiverId"))?;

        let message = frame.message.trim();
        if message.is_empty() {
            return Err(ValidationError::empty_field("message").into());
        }
        if message.chars().count() > self.max_content_length {
            return Err(ValidationError::too_long("message", self.max_content_length).into());
        }

        let sender_name = match frame.sender_name.trim() {
            "" => sender_id.to_string(),
            name => name.to_string(),
        };

        Ok(RoomDelivery {
            receiver_id,
            envelope: RealtimeEnvelope::new(sender_id, sender_name, message),
        })
    }
}

#[async_trait]
impl DeliveryHandler for RealtimeGateway {
    async fn deliver(&self, delivery: RoomDelivery) -> usize {
        self.deliver_local(&delivery).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryBackplane;
    use crate::domain::messaging::DEFAULT_MAX_CONTENT_LENGTH;

    fn gateway() -> RealtimeGateway {
        RealtimeGateway::new(Arc::new(RoomManager::new()), DEFAULT_MAX_CONTENT_LENGTH)
    }

    fn frame(from: &str, to: &str, text: &str) -> SendMessageFrame {
        SendMessageFrame {
            sender_id: from.to_string(),
            receiver_id: to.to_string(),
            sender_name: "Alice".to_string(),
            message: text.to_string(),
        }
    }

    #[tokio::test]
    async fn relay_reaches_each_receiver_connection_once() {
        let gateway = gateway();
        let (tab1, mut rx1) = gateway.connect().await;
        let (tab2, mut rx2) = gateway.connect().await;
        gateway.join(&tab1, "B").await.unwrap();
        gateway.join(&tab2, "B").await.unwrap();

        let outcome = gateway.relay(frame("A", "B", "hi")).await.unwrap();

        assert_eq!(outcome, RelayOutcome::Delivered(2));
        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await {
                Some(ServerMessage::ReceiveMessage(envelope)) => {
                    assert_eq!(envelope.message, "hi");
                    assert_eq!(envelope.sender_name, "Alice");
                }
                other => panic!("unexpected {:?}", other),
            }
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn relay_to_empty_room_is_a_miss() {
        let gateway = gateway();

        let outcome = gateway.relay(frame("A", "B", "hi")).await.unwrap();

        assert_eq!(outcome, RelayOutcome::Missed);
    }

    #[tokio::test]
    async fn relay_rejects_missing_fields() {
        let gateway = gateway();

        let err = gateway.relay(frame("A", "", "hi")).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED");

        assert!(gateway.relay(frame("A", "B", "  ")).await.is_err());
    }

    #[tokio::test]
    async fn join_returns_room_name() {
        let gateway = gateway();
        let (client, _rx) = gateway.connect().await;

        assert_eq!(gateway.join(&client, "B").await.unwrap(), "user-B");
        assert!(gateway.join(&client, " ").await.is_err());
    }

    #[tokio::test]
    async fn disconnected_client_receives_nothing() {
        let gateway = gateway();
        let (client, _rx) = gateway.connect().await;
        gateway.join(&client, "B").await.unwrap();

        gateway.disconnect(&client).await;

        assert_eq!(
            gateway.relay(frame("A", "B", "hi")).await.unwrap(),
            RelayOutcome::Missed
        );
    }

    #[tokio::test]
    async fn missing_sender_name_falls_back_to_id() {
        let gateway = gateway();
        let (client, mut rx) = gateway.connect().await;
        gateway.join(&client, "B").await.unwrap();

        let mut unnamed = frame("A", "B", "hi");
        unnamed.sender_name.clear();
        gateway.relay(unnamed).await.unwrap();

        match rx.recv().await {
            Some(ServerMessage::ReceiveMessage(envelope)) => assert_eq!(envelope.sender_name, "A"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn backplane_relay_is_delivered_through_subscription() {
        let backplane = Arc::new(InMemoryBackplane::default());
        let gateway = Arc::new(gateway().with_backplane(backplane));
        gateway.start_backplane().await.unwrap();
        let (client, mut rx) = gateway.connect().await;
        gateway.join(&client, "B").await.unwrap();

        let outcome = gateway.relay(frame("A", "B", "hi")).await.unwrap();

        assert_eq!(outcome, RelayOutcome::Published);
        let received = tokio::time::timeout(std::time::Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert!(matches!(received, Some(ServerMessage::ReceiveMessage(_))));
    }
}
