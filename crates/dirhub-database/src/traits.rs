//! Storage contract consumed by the core.
//!
//! A store is a capability set. Backends implement whichever of
//! [`Reader`], [`RootReader`], [`Writer`] and [`RootWriter`] they support;
//! [`DirectoryAdmin`] is the full set. Callers holding only a `Reader`
//! can ask for root access through [`require_root_reader`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use dirhub_core::error::AppError;
use dirhub_core::result::AppResult;
use dirhub_core::types::{DirectoryId, GetOptions, ListOptions};
use dirhub_entity::{Directory, NewDirectory, TrackedDirectory};

/// Read access to directories below a known anchor.
#[async_trait]
pub trait Reader: Send + Sync + 'static {
    /// Fetch one directory.
    async fn get_directory(&self, id: DirectoryId, opts: GetOptions) -> AppResult<Directory>;

    /// Ancestors of `id`, nearest first, up to and including the root.
    async fn get_parents(&self, id: DirectoryId, opts: ListOptions)
    -> AppResult<Vec<DirectoryId>>;

    /// Ancestors of `child`, nearest first, up to and including `ancestor`.
    ///
    /// Returns an empty sequence without touching storage when
    /// `child == ancestor`, and `NotFound` when `ancestor` is not an
    /// ancestor of `child`.
    async fn get_parents_until(
        &self,
        child: DirectoryId,
        ancestor: DirectoryId,
        opts: ListOptions,
    ) -> AppResult<Vec<DirectoryId>>;

    /// Every descendant of `id`, each one after all of its ancestors.
    async fn get_children(&self, id: DirectoryId, opts: ListOptions)
    -> AppResult<Vec<DirectoryId>>;

    /// This store as a [`RootReader`], when it grants root access.
    fn as_root_reader(&self) -> Option<&dyn RootReader> {
        None
    }
}

/// Read access including the set of roots.
#[async_trait]
pub trait RootReader: Reader {
    /// Identifiers of root directories.
    async fn list_roots(&self, opts: ListOptions) -> AppResult<Vec<DirectoryId>>;
}

/// Write access below existing directories.
#[async_trait]
pub trait Writer: Send + Sync + 'static {
    /// Create a directory under a live parent.
    async fn create_directory(&self, data: NewDirectory) -> AppResult<Directory>;

    /// Soft delete a directory and all of its live descendants.
    ///
    /// Returns exactly the directories whose `deleted_at` this call set.
    async fn delete_directory(&self, id: DirectoryId) -> AppResult<Vec<Directory>>;

    /// This store as a [`RootWriter`], when it grants root access.
    fn as_root_writer(&self) -> Option<&dyn RootWriter> {
        None
    }
}

/// Write access including root creation.
#[async_trait]
pub trait RootWriter: Writer {
    /// Create a root directory.
    async fn create_root(&self, data: NewDirectory) -> AppResult<Directory>;
}

/// Full administrative access.
pub trait DirectoryAdmin: RootReader + RootWriter {}

impl<T> DirectoryAdmin for T where T: RootReader + RootWriter {}

/// Narrow a reader to a root reader or fail with `NoRootAccess`.
pub fn require_root_reader(reader: &dyn Reader) -> AppResult<&dyn RootReader> {
    reader.as_root_reader().ok_or_else(AppError::no_root_access)
}

/// Narrow a writer to a root writer or fail with `NoRootAccess`.
pub fn require_root_writer(writer: &dyn Writer) -> AppResult<&dyn RootWriter> {
    writer.as_root_writer().ok_or_else(AppError::no_root_access)
}

#[async_trait]
impl<T: Reader + ?Sized> Reader for Arc<T> {
    async fn get_directory(&self, id: DirectoryId, opts: GetOptions) -> AppResult<Directory> {
        (**self).get_directory(id, opts).await
    }

    async fn get_parents(
        &self,
        id: DirectoryId,
        opts: ListOptions,
    ) -> AppResult<Vec<DirectoryId>> {
        (**self).get_parents(id, opts).await
    }

    async fn get_parents_until(
        &self,
        child: DirectoryId,
        ancestor: DirectoryId,
        opts: ListOptions,
    ) -> AppResult<Vec<DirectoryId>> {
        (**self).get_parents_until(child, ancestor, opts).await
    }

    async fn get_children(
        &self,
        id: DirectoryId,
        opts: ListOptions,
    ) -> AppResult<Vec<DirectoryId>> {
        (**self).get_children(id, opts).await
    }

    fn as_root_reader(&self) -> Option<&dyn RootReader> {
        (**self).as_root_reader()
    }
}

#[async_trait]
impl<T: Writer + ?Sized> Writer for Arc<T> {
    async fn create_directory(&self, data: NewDirectory) -> AppResult<Directory> {
        (**self).create_directory(data).await
    }

    async fn delete_directory(&self, id: DirectoryId) -> AppResult<Vec<Directory>> {
        (**self).delete_directory(id).await
    }

    fn as_root_writer(&self) -> Option<&dyn RootWriter> {
        (**self).as_root_writer()
    }
}

#[async_trait]
impl<T: RootReader + ?Sized> RootReader for Arc<T> {
    async fn list_roots(&self, opts: ListOptions) -> AppResult<Vec<DirectoryId>> {
        (**self).list_roots(opts).await
    }
}

#[async_trait]
impl<T: RootWriter + ?Sized> RootWriter for Arc<T> {
    async fn create_root(&self, data: NewDirectory) -> AppResult<Directory> {
        (**self).create_root(data).await
    }
}

/// An application's record of the directories it has observed.
///
/// One controller owns a projection store; sharing one between
/// concurrently running controllers is unsupported.
#[async_trait]
pub trait ProjectionStore: Send + Sync + 'static {
    /// Start tracking a directory. Tracking an already tracked id is a
    /// no-op that returns the existing record.
    async fn create_directory(&self, directory: &Directory) -> AppResult<TrackedDirectory>;

    /// Record that a directory was deleted at `deleted_at`. If a deletion
    /// is already recorded it is kept, whatever its timestamp.
    async fn delete_directory(
        &self,
        id: DirectoryId,
        deleted_at: DateTime<Utc>,
    ) -> AppResult<TrackedDirectory>;

    /// The record for `id`, if tracked.
    async fn get(&self, id: DirectoryId) -> AppResult<Option<TrackedDirectory>>;

    /// Whether `id` has been observed.
    async fn is_tracked(&self, id: DirectoryId) -> AppResult<bool> {
        Ok(self.get(id).await?.is_some())
    }

    /// Whether the record for `directory` carries its current `deleted_at`.
    async fn is_up_to_date(&self, directory: &Directory) -> AppResult<bool> {
        Ok(self
            .get(directory.id)
            .await?
            .is_some_and(|record| record.is_up_to_date(directory)))
    }
}

#[async_trait]
impl<T: ProjectionStore + ?Sized> ProjectionStore for Arc<T> {
    async fn create_directory(&self, directory: &Directory) -> AppResult<TrackedDirectory> {
        (**self).create_directory(directory).await
    }

    async fn delete_directory(
        &self,
        id: DirectoryId,
        deleted_at: DateTime<Utc>,
    ) -> AppResult<TrackedDirectory> {
        (**self).delete_directory(id, deleted_at).await
    }

    async fn get(&self, id: DirectoryId) -> AppResult<Option<TrackedDirectory>> {
        (**self).get(id).await
    }
}
