//! Notifier that logs every event before forwarding it.

use async_trait::async_trait;
use tracing::{info, warn};

use dirhub_core::result::AppResult;
use dirhub_entity::DirectoryEvent;

use super::Notifier;

/// Logs each event, then publishes it through the wrapped notifier.
#[derive(Debug)]
pub struct LoggingNotifier<N> {
    inner: N,
}

impl<N: Notifier> LoggingNotifier<N> {
    pub fn new(inner: N) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<N: Notifier> Notifier for LoggingNotifier<N> {
    async fn publish(&self, event: DirectoryEvent) -> AppResult<()> {
        info!(
            event_type = %event.event_type,
            directory_id = %event.directory.id,
            time = %event.time,
            "Publishing directory event"
        );
        let result = self.inner.publish(event).await;
        if let Err(e) = &result {
            warn!(error = %e, "Directory event publication failed");
        }
        result
    }
}
