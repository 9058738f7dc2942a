//! In-memory pub/sub for single-node deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::RwLock;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, trace};

use dirhub_core::error::AppError;
use dirhub_core::result::AppResult;

use super::{EventBus, PayloadStream};

/// In-memory pub/sub implementation over tokio broadcast channels.
#[derive(Debug)]
pub struct MemoryBus {
    /// Topic → broadcast sender
    channels: RwLock<HashMap<String, broadcast::Sender<String>>>,
    /// Buffer size for channels
    buffer_size: usize,
}

impl MemoryBus {
    /// Create a new in-memory bus
    pub fn new(buffer_size: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            buffer_size: buffer_size.max(1),
        }
    }

    /// Drop every live subscription, as if the transport went away.
    ///
    /// Payloads published before the next subscribe reach nobody.
    pub async fn sever(&self) {
        let dropped = self.channels.write().await.drain().count();
        debug!(topics = dropped, "Severed all bus subscriptions");
    }

    /// Number of live subscribers on `topic`.
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.channels
            .read()
            .await
            .get(topic)
            .map_or(0, |tx| tx.receiver_count())
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EventBus for MemoryBus {
    async fn publish(&self, topic: &str, payload: String) -> AppResult<()> {
        let channels = self.channels.read().await;
        match channels.get(topic) {
            Some(tx) => {
                let delivered = tx.send(payload).unwrap_or(0);
                trace!(topic, delivered, "Published payload");
            }
            None => trace!(topic, "Published payload with no subscribers"),
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> AppResult<PayloadStream> {
        let rx = {
            let mut channels = self.channels.write().await;
            channels
                .entry(topic.to_string())
                .or_insert_with(|| broadcast::channel(self.buffer_size).0)
                .subscribe()
        };

        let stream = futures::stream::unfold(Some(rx), |state| async move {
            let mut rx = state?;
            match rx.recv().await {
                Ok(payload) => Some((Ok(payload), Some(rx))),
                Err(RecvError::Lagged(skipped)) => Some((
                    Err(AppError::bus(format!(
                        "subscriber lagged and lost {skipped} payloads"
                    ))),
                    None,
                )),
                Err(RecvError::Closed) => None,
            }
        });
        Ok(stream.boxed())
    }
}
