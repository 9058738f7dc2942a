//! Directory store configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Access and consistency mode of the directory store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Reject every write with `ReadOnly`.
    #[serde(default)]
    pub read_only: bool,
    /// Serve reads from a bounded-staleness snapshot.
    #[serde(default)]
    pub fast_reads: bool,
    /// Staleness bound for fast reads, in seconds.
    #[serde(default = "default_staleness")]
    pub staleness_seconds: u64,
}

impl StoreConfig {
    /// The staleness bound as a duration.
    pub fn staleness(&self) -> Duration {
        Duration::from_secs(self.staleness_seconds)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            read_only: false,
            fast_reads: false,
            staleness_seconds: default_staleness(),
        }
    }
}

fn default_staleness() -> u64 {
    5
}
