//! In-memory room backplane.
//!
//! Connects several gateway instances living in one process, which is how
//! the cross-instance relay is exercised in tests.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::domain::messaging::RoomDelivery;
use crate::ports::{BackplaneError, DeliveryHandler, RoomBackplane};

/// Backplane over a `tokio::sync::broadcast` channel.
///
/// Subscribers that fall behind by more than the channel capacity skip the
/// deliveries they missed.
#[derive(Clone)]
pub struct InMemoryBackplane {
    sender: broadcast::Sender<RoomDelivery>,
}

impl InMemoryBackplane {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Number of active subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for InMemoryBackplane {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl RoomBackplane for InMemoryBackplane {
    async fn publish(&self, delivery: &RoomDelivery) -> Result<(), BackplaneError> {
        // No subscribers is a delivery miss, not an error.
        let _ = self.sender.send(delivery.clone());
        Ok(())
    }

    async fn subscribe(
        &self,
        handler: Arc<dyn DeliveryHandler>,
    ) -> Result<JoinHandle<()>, BackplaneError> {
        let mut receiver = self.sender.subscribe();

        Ok(tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(delivery) => {
                        handler.deliver(delivery).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Backplane subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }))
    }
}
