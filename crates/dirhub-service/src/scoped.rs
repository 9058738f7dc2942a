//! Capability-narrowing store wrapper.

use async_trait::async_trait;

use dirhub_core::result::AppResult;
use dirhub_core::types::{DirectoryId, GetOptions, ListOptions};
use dirhub_database::{Reader, Writer};
use dirhub_entity::{Directory, NewDirectory};

/// Exposes only the non-root read and write operations of a store.
///
/// Applications handed a `ScopedStore` can work below directories they
/// already know but cannot list or create roots: narrowing it with
/// [`dirhub_database::require_root_reader`] or
/// [`dirhub_database::require_root_writer`] fails with `NoRootAccess`.
#[derive(Debug, Clone)]
pub struct ScopedStore<S> {
    store: S,
}

impl<S: Reader + Writer> ScopedStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: Reader> Reader for ScopedStore<S> {
    async fn get_directory(&self, id: DirectoryId, opts: GetOptions) -> AppResult<Directory> {
        self.store.get_directory(id, opts).await
    }

    async fn get_parents(
        &self,
        id: DirectoryId,
        opts: ListOptions,
    ) -> AppResult<Vec<DirectoryId>> {
        self.store.get_parents(id, opts).await
    }

    async fn get_parents_until(
        &self,
        child: DirectoryId,
        ancestor: DirectoryId,
        opts: ListOptions,
    ) -> AppResult<Vec<DirectoryId>> {
        self.store.get_parents_until(child, ancestor, opts).await
    }

    async fn get_children(
        &self,
        id: DirectoryId,
        opts: ListOptions,
    ) -> AppResult<Vec<DirectoryId>> {
        self.store.get_children(id, opts).await
    }
}

#[async_trait]
impl<S: Writer> Writer for ScopedStore<S> {
    async fn create_directory(&self, data: NewDirectory) -> AppResult<Directory> {
        self.store.create_directory(data).await
    }

    async fn delete_directory(&self, id: DirectoryId) -> AppResult<Vec<Directory>> {
        self.store.delete_directory(id).await
    }
}
