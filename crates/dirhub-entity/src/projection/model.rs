//! Tracked directory record kept by an application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use dirhub_core::types::DirectoryId;

use crate::directory::Directory;

/// A directory the application has observed, with the deletion state it saw.
///
/// The record never implies the directory still exists upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TrackedDirectory {
    /// The observed directory.
    pub id: DirectoryId,
    /// The deletion timestamp last observed for it.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TrackedDirectory {
    /// Record a directory as observed right now.
    pub fn observe(directory: &Directory) -> Self {
        Self {
            id: directory.id,
            deleted_at: directory.deleted_at,
        }
    }

    /// Whether this record reflects the deletion state of `directory`.
    pub fn is_up_to_date(&self, directory: &Directory) -> bool {
        self.id == directory.id && self.deleted_at == directory.deleted_at
    }
}
