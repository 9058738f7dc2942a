//! Store wrapper that publishes directory events.

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use dirhub_core::error::AppError;
use dirhub_core::result::AppResult;
use dirhub_core::types::{DirectoryId, GetOptions, ListOptions};
use dirhub_database::{Reader, RootReader, RootWriter, Writer};
use dirhub_entity::{Directory, DirectoryEvent, EventType, NewDirectory};
use dirhub_realtime::Notifier;

/// Events of a committed mutation that could not be published.
///
/// Carried as the source of a `NotifyFailed` error so callers can learn
/// what was written and publish it again with
/// [`NotifyingStore::republish`].
#[derive(Debug, Error)]
#[error("{} event(s) not published: {cause}", .events.len())]
pub struct Unpublished {
    /// Events in the order they should have been published.
    pub events: Vec<DirectoryEvent>,
    /// The first publication failure.
    #[source]
    pub cause: AppError,
}

impl Unpublished {
    /// The unpublished events behind a `NotifyFailed` error, if any.
    pub fn of(err: &AppError) -> Option<&Self> {
        err.source.as_deref()?.downcast_ref::<Self>()
    }

    /// Ids of the directories the mutation wrote.
    pub fn directory_ids(&self) -> Vec<DirectoryId> {
        self.events.iter().map(|e| e.directory.id).collect()
    }
}

/// Wraps a store so that every committed mutation is followed by an event.
///
/// Publication happens after the write returns. If it fails the write
/// stays committed and the call returns `NotifyFailed`, whose source is an
/// [`Unpublished`] holding the events that were not delivered.
///
/// Capability narrowing through [`Writer::as_root_writer`] is not
/// forwarded, since the inner root writer would skip publication. Reads
/// are forwarded unchanged.
#[derive(Debug)]
pub struct NotifyingStore<S, N> {
    store: S,
    notifier: N,
}

impl<S, N> NotifyingStore<S, N> {
    pub fn new(store: S, notifier: N) -> Self {
        Self { store, notifier }
    }
}

impl<S, N: Notifier> NotifyingStore<S, N> {
    /// Publish `events` in order, collecting the ones that failed.
    async fn announce(&self, events: Vec<DirectoryEvent>) -> AppResult<()> {
        let mut failed = Vec::new();
        let mut cause = None;
        for event in events {
            if let Err(e) = self.notifier.publish(event.clone()).await {
                warn!(
                    event_type = %event.event_type,
                    directory_id = %event.directory.id,
                    error = %e,
                    "Event not published"
                );
                cause.get_or_insert(e);
                failed.push(event);
            }
        }

        match cause {
            Some(cause) => Err(AppError::notify_failed(Unpublished {
                events: failed,
                cause,
            })),
            None => Ok(()),
        }
    }

    /// Publish the events of an earlier failed notification again.
    pub async fn republish(&self, unpublished: &Unpublished) -> AppResult<()> {
        self.announce(unpublished.events.clone()).await
    }
}

#[async_trait]
impl<S: Reader, N: Notifier> Reader for NotifyingStore<S, N> {
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

    fn as_root_reader(&self) -> Option<&dyn RootReader> {
        self.store.as_root_reader()
    }
}

#[async_trait]
impl<S: RootReader, N: Notifier> RootReader for NotifyingStore<S, N> {
    async fn list_roots(&self, opts: ListOptions) -> AppResult<Vec<DirectoryId>> {
        self.store.list_roots(opts).await
    }
}

#[async_trait]
impl<S: Writer, N: Notifier> Writer for NotifyingStore<S, N> {
    async fn create_directory(&self, data: NewDirectory) -> AppResult<Directory> {
        let directory = self.store.create_directory(data).await?;
        self.announce(vec![DirectoryEvent::new(EventType::Create, directory.clone())])
            .await?;
        Ok(directory)
    }

    async fn delete_directory(&self, id: DirectoryId) -> AppResult<Vec<Directory>> {
        let deleted = self.store.delete_directory(id).await?;
        let events = deleted
            .iter()
            .map(|d| DirectoryEvent::new(EventType::Delete, d.clone()))
            .collect();
        self.announce(events).await?;
        Ok(deleted)
    }
}

#[async_trait]
impl<S: RootWriter, N: Notifier> RootWriter for NotifyingStore<S, N> {
    async fn create_root(&self, data: NewDirectory) -> AppResult<Directory> {
        let directory = self.store.create_root(data).await?;
        self.announce(vec![DirectoryEvent::new(EventType::Create, directory.clone())])
            .await?;
        Ok(directory)
    }
}
