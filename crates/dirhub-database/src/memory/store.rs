//! In-memory directory store.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info};

use dirhub_core::result::AppResult;
use dirhub_core::types::{DirectoryId, GetOptions, ListOptions};
use dirhub_entity::{Directory, NewDirectory};

use super::forest::Forest;
use crate::mode::StoreMode;
use crate::traits::{Reader, RootReader, RootWriter, Writer};

/// Directory store holding the forest in process memory.
///
/// Handles created with [`MemoryDirectoryStore::view`] share the same
/// forest, so a read-only or fast-read handle observes writes made
/// through the administrative one.
#[derive(Debug)]
pub struct MemoryDirectoryStore {
    forest: Arc<RwLock<Forest>>,
    mode: StoreMode,
    snapshot: Mutex<Option<(Instant, Arc<Forest>)>>,
    reads: AtomicU64,
}

impl MemoryDirectoryStore {
    /// Create an empty store with administrative access.
    pub fn new() -> Self {
        Self::with_mode(StoreMode::admin())
    }

    /// Create an empty store with the given mode.
    pub fn with_mode(mode: StoreMode) -> Self {
        Self {
            forest: Arc::new(RwLock::new(Forest::default())),
            mode,
            snapshot: Mutex::new(None),
            reads: AtomicU64::new(0),
        }
    }

    /// Another handle on the same forest with a different mode.
    pub fn view(&self, mode: StoreMode) -> Self {
        Self {
            forest: Arc::clone(&self.forest),
            mode,
            snapshot: Mutex::new(None),
            reads: AtomicU64::new(0),
        }
    }

    /// The mode of this handle.
    pub fn mode(&self) -> StoreMode {
        self.mode
    }

    /// Number of reads this handle has served from storage.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    async fn read<R>(&self, f: impl FnOnce(&Forest) -> AppResult<R>) -> AppResult<R> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        match self.mode.staleness {
            Some(bound) => {
                let snapshot = self.snapshot(bound).await;
                f(&snapshot)
            }
            None => {
                let forest = self.forest.read().await;
                f(&forest)
            }
        }
    }

    async fn snapshot(&self, bound: Duration) -> Arc<Forest> {
        let mut slot = self.snapshot.lock().await;
        if let Some((taken, forest)) = slot.as_ref() {
            if taken.elapsed() <= bound {
                return Arc::clone(forest);
            }
        }
        let fresh = Arc::new(self.forest.read().await.clone());
        *slot = Some((Instant::now(), Arc::clone(&fresh)));
        debug!(bound_ms = bound.as_millis() as u64, "Refreshed fast-read snapshot");
        fresh
    }
}

impl Default for MemoryDirectoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Reader for MemoryDirectoryStore {
    async fn get_directory(&self, id: DirectoryId, opts: GetOptions) -> AppResult<Directory> {
        self.read(|forest| forest.get(id, opts.with_deleted).cloned())
            .await
    }

    async fn get_parents(
        &self,
        id: DirectoryId,
        opts: ListOptions,
    ) -> AppResult<Vec<DirectoryId>> {
        let chain = self
            .read(|forest| forest.ancestors(id, opts.with_deleted))
            .await?;
        Ok(opts.paginate(chain))
    }

    async fn get_parents_until(
        &self,
        child: DirectoryId,
        ancestor: DirectoryId,
        opts: ListOptions,
    ) -> AppResult<Vec<DirectoryId>> {
        if child == ancestor {
            return Ok(Vec::new());
        }
        let chain = self
            .read(|forest| forest.ancestors_until(child, ancestor, opts.with_deleted))
            .await?;
        Ok(opts.paginate(chain))
    }

    async fn get_children(
        &self,
        id: DirectoryId,
        opts: ListOptions,
    ) -> AppResult<Vec<DirectoryId>> {
        let subtree = self
            .read(|forest| forest.descendants(id, opts.with_deleted))
            .await?;
        Ok(opts.paginate(subtree))
    }

    fn as_root_reader(&self) -> Option<&dyn RootReader> {
        Some(self)
    }
}

#[async_trait]
impl RootReader for MemoryDirectoryStore {
    async fn list_roots(&self, opts: ListOptions) -> AppResult<Vec<DirectoryId>> {
        let roots = self.read(|forest| Ok(forest.roots(opts.with_deleted))).await?;
        Ok(opts.paginate(roots))
    }
}

#[async_trait]
impl Writer for MemoryDirectoryStore {
    async fn create_directory(&self, data: NewDirectory) -> AppResult<Directory> {
        self.mode.ensure_writable()?;
        let parent = data.validate_child()?;

        let directory = self
            .forest
            .write()
            .await
            .insert_child(data, parent, Utc::now())?;

        info!(directory_id = %directory.id, parent_id = %parent, "Directory created");
        Ok(directory)
    }

    async fn delete_directory(&self, id: DirectoryId) -> AppResult<Vec<Directory>> {
        self.mode.ensure_writable()?;

        let deleted = self.forest.write().await.soft_delete(id, Utc::now())?;

        info!(directory_id = %id, affected = deleted.len(), "Directory deleted");
        Ok(deleted)
    }

    fn as_root_writer(&self) -> Option<&dyn RootWriter> {
        Some(self)
    }
}

#[async_trait]
impl RootWriter for MemoryDirectoryStore {
    async fn create_root(&self, data: NewDirectory) -> AppResult<Directory> {
        self.mode.ensure_writable()?;
        data.validate_root()?;

        let directory = self.forest.write().await.insert_root(data, Utc::now());

        info!(directory_id = %directory.id, "Root directory created");
        Ok(directory)
    }
}
