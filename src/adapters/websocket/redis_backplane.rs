//! Redis pub/sub room backplane for multi-instance deployments.
//!
//! Every gateway instance publishes addressed envelopes to one channel and
//! subscribes to it; each instance delivers to the room members it holds.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::task::JoinHandle;

use crate::domain::messaging::RoomDelivery;
use crate::ports::{BackplaneError, DeliveryHandler, RoomBackplane};

/// Default pub/sub channel name.
pub const DEFAULT_CHANNEL: &str = "roomies:rooms";

/// Redis-backed backplane.
///
/// Publishing goes through a shared multiplexed connection; each
/// subscription opens its own dedicated pub/sub connection.
#[derive(Clone)]
pub struct RedisBackplane {
    client: redis::Client,
    conn: MultiplexedConnection,
    channel: String,
}

impl RedisBackplane {
    /// Connect to Redis and prepare the publishing connection.
    pub async fn connect(url: &str, channel: impl Into<String>) -> Result<Self, BackplaneError> {
        let client = redis::Client::open(url).map_err(|e| BackplaneError::Redis(e.to_string()))?;
        let conn = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| BackplaneError::Redis(e.to_string()))?;

        Ok(Self {
            client,
            conn,
            channel: channel.into(),
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

#[async_trait]
impl RoomBackplane for RedisBackplane {
    async fn publish(&self, delivery: &RoomDelivery) -> Result<(), BackplaneError> {
        let payload = encode(delivery)?;

        let mut conn = self.conn.clone();
        let receivers: i64 = conn
            .publish(&self.channel, payload)
            .await
            .map_err(|e| BackplaneError::Redis(e.to_string()))?;

        tracing::trace!(
            channel = %self.channel,
            receiver_id = %delivery.receiver_id,
            receivers,
            "Published room delivery"
        );
        Ok(())
    }

    async fn subscribe(
        &self,
        handler: Arc<dyn DeliveryHandler>,
    ) -> Result<JoinHandle<()>, BackplaneError> {
        let mut pubsub = self
            .client
            .get_async_connection()
            .await
            .map_err(|e| BackplaneError::Redis(e.to_string()))?
            .into_pubsub();
        pubsub
            .subscribe(&self.channel)
            .await
            .map_err(|e| BackplaneError::Redis(e.to_string()))?;

        tracing::info!(channel = %self.channel, "Subscribed to room backplane");

        let channel = self.channel.clone();
        Ok(tokio::spawn(async move {
            let mut stream = pubsub.on_message();

            while let Some(msg) = stream.next().await {
                let payload = match msg.get_payload::<String>() {
                    Ok(p) => p,
                    Err(e) => {
                        tracing::error!(error = ?e, "Failed to get backplane payload");
                        continue;
                    }
                };

                match decode(&payload) {
                    Ok(delivery) => {
                        handler.deliver(delivery).await;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to decode backplane payload");
                    }
                }
            }

            tracing::warn!(channel = %channel, "Room backplane subscription ended");
        }))
    }
}

fn encode(delivery: &RoomDelivery) -> Result<String, BackplaneError> {
    serde_json::to_string(delivery).map_err(|e| BackplaneError::Serialization(e.to_string()))
}

fn decode(payload: &str) -> Result<RoomDelivery, BackplaneError> {
    serde_json::from_str(payload).map_err(|e| BackplaneError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;
    use crate::domain::messaging::RealtimeEnvelope;

    #[test]
    fn payload_survives_the_wire_format() {
        let delivery = RoomDelivery {
            receiver_id: UserId::new("B").unwrap(),
            envelope: RealtimeEnvelope::new(UserId::new("A").unwrap(), "Alice", "hi"),
        };

        let decoded = decode(&encode(&delivery).unwrap()).unwrap();

        assert_eq!(decoded, delivery);
    }

    #[test]
    fn garbage_payload_is_serialization_error() {
        assert!(matches!(
            decode("{not json"),
            Err(BackplaneError::Serialization(_))
        ));
    }

    struct CountingHandler(tokio::sync::mpsc::UnboundedSender<RoomDelivery>);

    #[async_trait]
    impl DeliveryHandler for CountingHandler {
        async fn deliver(&self, delivery: RoomDelivery) -> usize {
            let _ = self.0.send(delivery);
            1
        }
    }

    #[tokio::test]
    #[ignore] // Requires Redis. Run with: cargo test -- --ignored
    async fn publish_reaches_subscriber_through_redis() {
        let backplane = RedisBackplane::connect("redis://127.0.0.1/", "roomies:test")
            .await
            .unwrap();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        backplane.subscribe(Arc::new(CountingHandler(tx))).await.unwrap();

        let delivery = RoomDelivery {
            receiver_id: UserId::new("B").unwrap(),
            envelope: RealtimeEnvelope::new(UserId::new("A").unwrap(), "Alice", "hi"),
        };
        backplane.publish(&delivery).await.unwrap();

        let received = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .unwrap();
        assert_eq!(received, Some(delivery));
    }
}
