//! Notifier that drops every event.

use async_trait::async_trait;

use dirhub_core::result::AppResult;
use dirhub_entity::DirectoryEvent;

use super::Notifier;

/// Accepts and discards events. Used when no bus is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn publish(&self, _event: DirectoryEvent) -> AppResult<()> {
        Ok(())
    }
}
