//! Message bus bridges carrying serialized directory events.

pub mod memory;
#[cfg(feature = "redis-pubsub")]
pub mod redis_pubsub;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use dirhub_core::config::{NotifierBackend, NotifierConfig};
use dirhub_core::result::AppResult;

pub use memory::MemoryBus;
#[cfg(feature = "redis-pubsub")]
pub use redis_pubsub::RedisBus;

/// Payloads received on a subscription.
///
/// The stream ends when the transport closes. An `Err` item is terminal:
/// delivery can no longer be guaranteed for this subscription.
pub type PayloadStream = BoxStream<'static, AppResult<String>>;

/// Topic-based publish/subscribe transport.
#[async_trait]
pub trait EventBus: Send + Sync + std::fmt::Debug + 'static {
    /// Publish one payload to every current subscriber of `topic`.
    async fn publish(&self, topic: &str, payload: String) -> AppResult<()>;

    /// Subscribe to `topic`. The subscription is live when this returns.
    async fn subscribe(&self, topic: &str) -> AppResult<PayloadStream>;
}

#[async_trait]
impl<T: EventBus + ?Sized> EventBus for Arc<T> {
    async fn publish(&self, topic: &str, payload: String) -> AppResult<()> {
        (**self).publish(topic, payload).await
    }

    async fn subscribe(&self, topic: &str) -> AppResult<PayloadStream> {
        (**self).subscribe(topic).await
    }
}

/// Open the bus selected by `[notifier]`, or `None` for the `none` backend.
pub async fn connect_bus(config: &NotifierConfig) -> AppResult<Option<Arc<dyn EventBus>>> {
    match config.backend {
        NotifierBackend::None => Ok(None),
        NotifierBackend::Memory => Ok(Some(Arc::new(MemoryBus::new(config.channel_buffer_size)))),
        NotifierBackend::Redis => connect_redis(config).await.map(Some),
    }
}

#[cfg(feature = "redis-pubsub")]
async fn connect_redis(config: &NotifierConfig) -> AppResult<Arc<dyn EventBus>> {
    let url = config.redis_url.as_deref().ok_or_else(|| {
        dirhub_core::error::AppError::configuration("notifier.redis_url is not set")
    })?;
    Ok(Arc::new(RedisBus::connect(url).await?))
}

#[cfg(not(feature = "redis-pubsub"))]
async fn connect_redis(_config: &NotifierConfig) -> AppResult<Arc<dyn EventBus>> {
    Err(dirhub_core::error::AppError::configuration(
        "the redis backend requires the redis-pubsub feature",
    ))
}
