//! Watcher reading JSON envelopes from a bus topic.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use dirhub_core::error::AppError;
use dirhub_core::result::AppResult;
use dirhub_entity::DirectoryEvent;

use super::{WatchSession, Watcher};
use crate::bus::{EventBus, PayloadStream};

/// Subscribes to `topic` and decodes each payload into a [`DirectoryEvent`].
#[derive(Debug, Clone)]
pub struct BusWatcher {
    bus: Arc<dyn EventBus>,
    topic: String,
}

impl BusWatcher {
    pub fn new(bus: Arc<dyn EventBus>, topic: impl Into<String>) -> Self {
        Self {
            bus,
            topic: topic.into(),
        }
    }
}

#[async_trait]
impl Watcher for BusWatcher {
    async fn watch(&self, cancel: CancellationToken) -> AppResult<WatchSession> {
        let stream = self.bus.subscribe(&self.topic).await?;
        let (events_tx, events) = mpsc::unbounded_channel();
        let (errors_tx, errors) = oneshot::channel();

        debug!(topic = %self.topic, "Watch started");
        tokio::spawn(forward(stream, events_tx, errors_tx, cancel, self.topic.clone()));

        Ok(WatchSession { events, errors })
    }
}

async fn forward(
    mut stream: PayloadStream,
    events: mpsc::UnboundedSender<DirectoryEvent>,
    errors: oneshot::Sender<AppError>,
    cancel: CancellationToken,
    topic: String,
) {
    loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(%topic, "Watch cancelled");
                return;
            }
            item = stream.next() => item,
        };

        let payload = match item {
            Some(Ok(payload)) => payload,
            Some(Err(e)) => {
                let _ = errors.send(e);
                return;
            }
            None => {
                let _ = errors.send(AppError::bus(format!("subscription to {topic} closed")));
                return;
            }
        };

        match DirectoryEvent::from_json(&payload) {
            Ok(event) => {
                if events.send(event).is_err() {
                    debug!(%topic, "Watch session dropped");
                    return;
                }
            }
            Err(e) => warn!(%topic, error = %e, "Skipping undecodable event payload"),
        }
    }
}
