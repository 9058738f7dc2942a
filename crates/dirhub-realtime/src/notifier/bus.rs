//! Notifier that publishes JSON envelopes on a bus topic.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use dirhub_core::result::AppResult;
use dirhub_entity::DirectoryEvent;

use super::Notifier;
use crate::bus::EventBus;

/// Serializes each event and publishes it on `topic`.
#[derive(Debug, Clone)]
pub struct BusNotifier {
    bus: Arc<dyn EventBus>,
    topic: String,
}

impl BusNotifier {
    /// Create a notifier publishing on `topic`.
    pub fn new(bus: Arc<dyn EventBus>, topic: impl Into<String>) -> Self {
        Self {
            bus,
            topic: topic.into(),
        }
    }
}

#[async_trait]
impl Notifier for BusNotifier {
    async fn publish(&self, event: DirectoryEvent) -> AppResult<()> {
        let payload = event.to_json()?;
        self.bus.publish(&self.topic, payload).await?;
        trace!(
            topic = %self.topic,
            event_type = %event.event_type,
            directory_id = %event.directory.id,
            "Event published"
        );
        Ok(())
    }
}
