//! Watchers deliver directory events to applications.

pub mod bus;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use dirhub_core::error::AppError;
use dirhub_core::result::AppResult;
use dirhub_entity::DirectoryEvent;

pub use bus::BusWatcher;

/// A live subscription returned by [`Watcher::watch`].
///
/// `events` closes when the subscription ends. At most one error is
/// delivered on `errors`, after which no further events arrive.
#[derive(Debug)]
pub struct WatchSession {
    /// Decoded events in delivery order.
    pub events: mpsc::UnboundedReceiver<DirectoryEvent>,
    /// Terminal subscription failure.
    pub errors: oneshot::Receiver<AppError>,
}

/// Subscribes to directory events.
#[async_trait]
pub trait Watcher: Send + Sync + std::fmt::Debug + 'static {
    /// Start a subscription that lives until `cancel` fires or the
    /// transport fails. Events published after this returns are delivered.
    async fn watch(&self, cancel: CancellationToken) -> AppResult<WatchSession>;
}

#[async_trait]
impl<T: Watcher + ?Sized> Watcher for Arc<T> {
    async fn watch(&self, cancel: CancellationToken) -> AppResult<WatchSession> {
        (**self).watch(cancel).await
    }
}
