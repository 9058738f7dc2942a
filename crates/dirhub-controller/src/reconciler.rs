//! Application hooks invoked for each directory change.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use dirhub_core::result::AppResult;
use dirhub_entity::DirectoryEvent;

/// Applies a directory change to application resources.
///
/// Implementations must be idempotent: the controller may deliver the same
/// transition twice, once from a sweep and once from the event stream. An
/// error stops the controller.
#[async_trait]
pub trait Reconciler: Send + Sync + 'static {
    async fn reconcile(&self, event: &DirectoryEvent) -> AppResult<()>;
}

#[async_trait]
impl<T: Reconciler + ?Sized> Reconciler for Arc<T> {
    async fn reconcile(&self, event: &DirectoryEvent) -> AppResult<()> {
        (**self).reconcile(event).await
    }
}

/// Does nothing. For applications that only need the projection kept current.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReconciler;

#[async_trait]
impl Reconciler for NoopReconciler {
    async fn reconcile(&self, _event: &DirectoryEvent) -> AppResult<()> {
        Ok(())
    }
}

/// Logs every change it is handed.
#[derive(Debug, Clone, Default)]
pub struct LoggingReconciler {
    app: String,
}

impl LoggingReconciler {
    pub fn new(app: impl Into<String>) -> Self {
        Self { app: app.into() }
    }
}

#[async_trait]
impl Reconciler for LoggingReconciler {
    async fn reconcile(&self, event: &DirectoryEvent) -> AppResult<()> {
        info!(
            app = %self.app,
            event_type = %event.event_type,
            directory_id = %event.directory.id,
            name = %event.directory.name,
            deleted = event.directory.is_deleted(),
            "Reconciled directory"
        );
        Ok(())
    }
}
