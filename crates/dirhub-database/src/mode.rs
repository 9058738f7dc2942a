//! Access and consistency modes shared by every store backend.

use std::time::Duration;

use dirhub_core::config::StoreConfig;
use dirhub_core::error::AppError;
use dirhub_core::result::AppResult;

/// Whether a store accepts writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Reads and writes.
    ReadWrite,
    /// Reads only; writes fail with `ReadOnly`.
    ReadOnly,
}

/// Access mode plus the read consistency of a store handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreMode {
    /// Write permission.
    pub access: AccessMode,
    /// Staleness bound for reads; `None` means strongly consistent reads.
    pub staleness: Option<Duration>,
}

impl StoreMode {
    /// Full read/write access with strongly consistent reads.
    pub fn admin() -> Self {
        Self {
            access: AccessMode::ReadWrite,
            staleness: None,
        }
    }

    /// Read-only access with strongly consistent reads.
    pub fn read_only() -> Self {
        Self {
            access: AccessMode::ReadOnly,
            staleness: None,
        }
    }

    /// Allow reads to observe a snapshot at most `bound` old.
    pub fn with_fast_reads(mut self, bound: Duration) -> Self {
        self.staleness = (!bound.is_zero()).then_some(bound);
        self
    }

    /// Build the mode described by the `[store]` configuration section.
    pub fn from_config(config: &StoreConfig) -> Self {
        let base = if config.read_only {
            Self::read_only()
        } else {
            Self::admin()
        };
        if config.fast_reads {
            base.with_fast_reads(config.staleness())
        } else {
            base
        }
    }

    /// Fail with `ReadOnly` unless writes are permitted.
    pub fn ensure_writable(&self) -> AppResult<()> {
        match self.access {
            AccessMode::ReadWrite => Ok(()),
            AccessMode::ReadOnly => Err(AppError::read_only()),
        }
    }
}

impl Default for StoreMode {
    fn default() -> Self {
        Self::admin()
    }
}
