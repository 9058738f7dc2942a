//! Redis pub/sub bridge for multi-node deployments.

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::MultiplexedConnection;
use tracing::{debug, info};

use dirhub_core::error::{AppError, ErrorKind};
use dirhub_core::result::AppResult;

use super::{EventBus, PayloadStream};

/// Redis pub/sub bus for cross-node event relay.
#[derive(Clone)]
pub struct RedisBus {
    client: redis::Client,
    conn: MultiplexedConnection,
}

impl std::fmt::Debug for RedisBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBus").finish_non_exhaustive()
    }
}

impl RedisBus {
    /// Connect to the Redis server at `url`.
    pub async fn connect(url: &str) -> AppResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| AppError::with_source(ErrorKind::Configuration, "Invalid Redis URL", e))?;

        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Bus, "Redis connection failed", e))?;

        info!("Connected to Redis pub/sub");
        Ok(Self { client, conn })
    }
}

#[async_trait]
impl EventBus for RedisBus {
    async fn publish(&self, topic: &str, payload: String) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let receivers = redis::cmd("PUBLISH")
            .arg(topic)
            .arg(payload)
            .query_async::<i64>(&mut conn)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Bus, "Redis PUBLISH failed", e))?;

        debug!(topic, receivers, "Published payload to Redis");
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> AppResult<PayloadStream> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Bus, "Redis pub/sub connection failed", e))?;

        pubsub
            .subscribe(topic)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Bus, "Redis SUBSCRIBE failed", e))?;

        debug!(topic, "Subscribed to Redis channel");
        let stream = pubsub.into_on_message().map(|msg| {
            msg.get_payload::<String>().map_err(|e| {
                AppError::with_source(ErrorKind::Bus, "Malformed Redis payload", e)
            })
        });
        Ok(stream.boxed())
    }
}
