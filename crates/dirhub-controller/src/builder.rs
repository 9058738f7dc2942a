//! Construction of a [`Controller`].

use std::sync::Arc;
use std::time::Duration;

use dirhub_core::config::ControllerConfig;
use dirhub_core::error::AppError;
use dirhub_core::result::AppResult;
use dirhub_core::types::DirectoryId;
use dirhub_database::{MemoryProjectionStore, ProjectionStore, Reader};
use dirhub_realtime::Watcher;

use crate::controller::Controller;
use crate::reconciler::Reconciler;

/// Builder for a [`Controller`] following one subtree.
///
/// A reconciler is mandatory. Without a client the controller runs on
/// events alone; without a watcher it runs on sweeps alone. The projection
/// store defaults to an empty in-memory one.
#[derive(Default)]
pub struct ControllerBuilder {
    base_dir: Option<DirectoryId>,
    app_name: Option<String>,
    reconciler: Option<Arc<dyn Reconciler>>,
    client: Option<Arc<dyn Reader>>,
    watcher: Option<Arc<dyn Watcher>>,
    projection: Option<Arc<dyn ProjectionStore>>,
    sweep_interval: Option<(Duration, Duration)>,
}

impl ControllerBuilder {
    /// Start building a controller for the subtree rooted at `base_dir`.
    pub fn new(base_dir: DirectoryId) -> Self {
        Self {
            base_dir: Some(base_dir),
            ..Self::default()
        }
    }

    /// Start from the `[controller]` configuration section.
    pub fn from_config(config: &ControllerConfig) -> AppResult<Self> {
        let base_dir = config
            .base_dir
            .as_deref()
            .ok_or_else(|| AppError::configuration("controller.base_dir is not set"))?
            .parse::<DirectoryId>()?;
        let (min, max) = config.sweep_range();
        Ok(Self::new(base_dir)
            .app_name(config.app_name.clone())
            .sweep_interval(min, max))
    }

    /// Name used in logs.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    pub fn reconciler(mut self, reconciler: Arc<dyn Reconciler>) -> Self {
        self.reconciler = Some(reconciler);
        self
    }

    /// Read access to the directory store, enabling sweeps.
    pub fn client(mut self, client: Arc<dyn Reader>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn watcher(mut self, watcher: Arc<dyn Watcher>) -> Self {
        self.watcher = Some(watcher);
        self
    }

    pub fn projection(mut self, projection: Arc<dyn ProjectionStore>) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Sweep interval bounds; each period is drawn uniformly from `[min, max]`.
    pub fn sweep_interval(mut self, min: Duration, max: Duration) -> Self {
        self.sweep_interval = Some((min, max));
        self
    }

    /// Validate and build the controller.
    pub fn build(self) -> AppResult<Controller> {
        let reconciler = self.reconciler.ok_or_else(AppError::no_reconciler)?;
        let base_dir = self
            .base_dir
            .ok_or_else(|| AppError::validation("a controller requires a base directory"))?;
        if self.client.is_none() && self.watcher.is_none() {
            return Err(AppError::validation(
                "a controller requires a client, a watcher, or both",
            ));
        }

        let defaults = ControllerConfig::default();
        let (min, max) = self.sweep_interval.unwrap_or_else(|| defaults.sweep_range());
        if min.is_zero() || max.is_zero() {
            return Err(AppError::validation("sweep interval must be positive"));
        }

        Ok(Controller {
            base_dir,
            app_name: self.app_name.unwrap_or(defaults.app_name),
            reconciler,
            client: self.client,
            watcher: self.watcher,
            projection: self
                .projection
                .unwrap_or_else(|| Arc::new(MemoryProjectionStore::new())),
            sweep_interval: (min, max),
        })
    }
}
