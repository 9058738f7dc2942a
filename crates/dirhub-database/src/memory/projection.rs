//! In-memory projection store using dashmap.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use dirhub_core::result::AppResult;
use dirhub_core::types::DirectoryId;
use dirhub_entity::{Directory, TrackedDirectory};

use crate::traits::ProjectionStore;

/// Projection store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryProjectionStore {
    records: DashMap<DirectoryId, TrackedDirectory>,
}

impl MemoryProjectionStore {
    /// Create an empty projection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked directories.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// A copy of every record, ordered by id.
    pub fn records(&self) -> Vec<TrackedDirectory> {
        let mut records: Vec<_> = self.records.iter().map(|e| e.value().clone()).collect();
        records.sort_by_key(|r| r.id);
        records
    }
}

#[async_trait]
impl ProjectionStore for MemoryProjectionStore {
    async fn create_directory(&self, directory: &Directory) -> AppResult<TrackedDirectory> {
        let record = self
            .records
            .entry(directory.id)
            .or_insert_with(|| {
                debug!(directory_id = %directory.id, "Tracking directory");
                TrackedDirectory::observe(directory)
            })
            .clone();
        Ok(record)
    }

    async fn delete_directory(
        &self,
        id: DirectoryId,
        deleted_at: DateTime<Utc>,
    ) -> AppResult<TrackedDirectory> {
        let mut entry = self.records.entry(id).or_insert(TrackedDirectory {
            id,
            deleted_at: None,
        });
        if entry.deleted_at.is_none() {
            entry.deleted_at = Some(deleted_at);
            debug!(directory_id = %id, "Tracked directory marked deleted");
        }
        Ok(entry.clone())
    }

    async fn get(&self, id: DirectoryId) -> AppResult<Option<TrackedDirectory>> {
        Ok(self.records.get(&id).map(|e| e.value().clone()))
    }
}
