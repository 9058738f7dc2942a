//! Publication of directory events after store mutations.
//!
//! Notifiers compose: [`RetryNotifier`] and [`LoggingNotifier`] wrap any
//! other notifier, and [`BusNotifier`] is the one that reaches a transport.

pub mod bus;
pub mod logging;
pub mod noop;
pub mod retry;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use dirhub_core::config::NotifierConfig;
use dirhub_core::result::AppResult;
use dirhub_entity::{Directory, DirectoryEvent, EventType};

pub use bus::BusNotifier;
pub use logging::LoggingNotifier;
pub use noop::NoopNotifier;
pub use retry::{ExponentialBackoff, RetryNotifier};

use crate::bus::EventBus;

/// Publishes directory events.
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug + 'static {
    /// Publish one event.
    async fn publish(&self, event: DirectoryEvent) -> AppResult<()>;

    async fn notify_create(&self, directory: Directory) -> AppResult<()> {
        self.publish(DirectoryEvent::new(EventType::Create, directory))
            .await
    }

    async fn notify_update(&self, directory: Directory) -> AppResult<()> {
        self.publish(DirectoryEvent::new(EventType::Update, directory))
            .await
    }

    async fn notify_delete_soft(&self, directory: Directory) -> AppResult<()> {
        self.publish(DirectoryEvent::new(EventType::Delete, directory))
            .await
    }

    async fn notify_delete_hard(&self, directory: Directory) -> AppResult<()> {
        self.publish(DirectoryEvent::new(EventType::DeleteHard, directory))
            .await
    }
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    async fn publish(&self, event: DirectoryEvent) -> AppResult<()> {
        (**self).publish(event).await
    }
}

/// Compose the notifier described by `[notifier]` on top of `bus`.
///
/// Without a bus events are dropped. Otherwise the stack is
/// `Retry(Logging(Bus))`, with the logging and retry layers present only
/// when enabled. Retries stop when `cancel` fires.
pub fn build_notifier(
    config: &NotifierConfig,
    bus: Option<Arc<dyn EventBus>>,
    cancel: CancellationToken,
) -> Arc<dyn Notifier> {
    let Some(bus) = bus else {
        return Arc::new(NoopNotifier);
    };

    let mut notifier: Arc<dyn Notifier> = Arc::new(BusNotifier::new(bus, config.topic.clone()));
    if config.log_events {
        notifier = Arc::new(LoggingNotifier::new(notifier));
    }
    if config.retry.enabled {
        notifier = Arc::new(RetryNotifier::from_config(notifier, &config.retry, cancel));
    }
    notifier
}
