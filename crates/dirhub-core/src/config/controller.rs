//! Application controller configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings of the application-side reconciliation loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Identifier of the subtree root the application follows.
    #[serde(default)]
    pub base_dir: Option<String>,
    /// Name under which the projection is stored.
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Lower bound of the sweep interval, in seconds.
    #[serde(default = "default_sweep_min")]
    pub sweep_min_seconds: u64,
    /// Upper bound of the sweep interval, in seconds.
    #[serde(default = "default_sweep_max")]
    pub sweep_max_seconds: u64,
    /// Subscribe to the event stream in addition to sweeping.
    #[serde(default = "default_true")]
    pub watch: bool,
}

impl ControllerConfig {
    /// The configured `[min, max]` sweep interval.
    pub fn sweep_range(&self) -> (Duration, Duration) {
        (
            Duration::from_secs(self.sweep_min_seconds),
            Duration::from_secs(self.sweep_max_seconds),
        )
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            app_name: default_app_name(),
            sweep_min_seconds: default_sweep_min(),
            sweep_max_seconds: default_sweep_max(),
            watch: true,
        }
    }
}

fn default_app_name() -> String {
    "dirhub-agent".to_string()
}

fn default_sweep_min() -> u64 {
    5 * 60
}

fn default_sweep_max() -> u64 {
    30 * 60
}

fn default_true() -> bool {
    true
}
