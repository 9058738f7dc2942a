//! The reconciliation loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use dirhub_core::error::{AppError, ErrorKind};
use dirhub_core::result::AppResult;
use dirhub_core::types::{DirectoryId, GetOptions, ListOptions};
use dirhub_database::{ProjectionStore, Reader};
use dirhub_entity::{Directory, DirectoryEvent, EventType};
use dirhub_realtime::{WatchSession, Watcher};

use crate::reconciler::Reconciler;
use crate::ticker::JitterTicker;

/// Page size used when a sweep walks the subtree.
const SWEEP_PAGE_SIZE: u64 = 100;

/// Drives an application's projection of one subtree toward the store.
///
/// Built with [`crate::ControllerBuilder`]. All state is owned by the task
/// calling [`Controller::run`].
pub struct Controller {
    pub(crate) base_dir: DirectoryId,
    pub(crate) app_name: String,
    pub(crate) reconciler: Arc<dyn Reconciler>,
    pub(crate) client: Option<Arc<dyn Reader>>,
    pub(crate) watcher: Option<Arc<dyn Watcher>>,
    pub(crate) projection: Arc<dyn ProjectionStore>,
    pub(crate) sweep_interval: (Duration, Duration),
}

enum WatchSignal {
    Event(DirectoryEvent),
    Lost(AppError),
}

impl Controller {
    /// Root of the followed subtree.
    pub fn base_dir(&self) -> DirectoryId {
        self.base_dir
    }

    /// The projection store this controller maintains.
    pub fn projection(&self) -> &Arc<dyn ProjectionStore> {
        &self.projection
    }

    /// Run until `cancel` fires or an error occurs.
    ///
    /// Performs an initial sweep, subscribes to events, then interleaves
    /// events with jittered sweeps. Returns `Cancelled` on cancellation.
    /// A lost subscription ends the run unless a client is configured, in
    /// which case the controller keeps sweeping and resubscribes after
    /// each sweep until a subscription succeeds.
    pub async fn run(&self, cancel: CancellationToken) -> AppResult<()> {
        info!(
            app = %self.app_name,
            base_dir = %self.base_dir,
            sweeps = self.client.is_some(),
            watches = self.watcher.is_some(),
            "Controller started"
        );

        guarded(&cancel, self.sweep()).await?;
        let mut session = self.subscribe(&cancel).await?;
        let mut ticker = self
            .client
            .as_ref()
            .map(|_| JitterTicker::new(self.sweep_interval.0, self.sweep_interval.1));

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(app = %self.app_name, "Controller cancelled");
                    return Err(AppError::cancelled("controller cancelled"));
                }
                _ = next_tick(&mut ticker) => {
                    guarded(&cancel, self.sweep()).await?;
                    if session.is_none() {
                        session = self.subscribe(&cancel).await?;
                    }
                }
                signal = next_signal(&mut session) => match signal {
                    WatchSignal::Event(event) => {
                        guarded(&cancel, self.process_event(&event)).await?;
                    }
                    WatchSignal::Lost(err) => {
                        session = None;
                        if self.client.is_none() {
                            return Err(err);
                        }
                        warn!(
                            app = %self.app_name,
                            error = %err,
                            "Watch lost, continuing with sweeps"
                        );
                    }
                },
            }
        }
    }

    /// Open a watch session. A failure is fatal only without a client.
    async fn subscribe(&self, cancel: &CancellationToken) -> AppResult<Option<WatchSession>> {
        let Some(watcher) = &self.watcher else {
            return Ok(None);
        };
        match guarded(cancel, watcher.watch(cancel.child_token())).await {
            Ok(session) => {
                debug!(app = %self.app_name, "Watching directory events");
                Ok(Some(session))
            }
            Err(e) if e.is(ErrorKind::Cancelled) || self.client.is_none() => Err(e),
            Err(e) => {
                warn!(app = %self.app_name, error = %e, "Subscribe failed, retrying after next sweep");
                Ok(None)
            }
        }
    }

    /// Pull the subtree from the store and project every stale directory.
    ///
    /// Visits the base directory and then all of its descendants, each one
    /// after its ancestors. Directories whose projection is current are
    /// skipped, so repeated sweeps leave the projection unchanged. Returns
    /// the number of directories handed to the reconciler. Without a
    /// client this does nothing.
    #[instrument(skip(self), fields(app = %self.app_name, base_dir = %self.base_dir))]
    pub async fn sweep(&self) -> AppResult<usize> {
        let Some(client) = &self.client else {
            return Ok(0);
        };

        let base = match client
            .get_directory(self.base_dir, GetOptions::with_deleted())
            .await
        {
            Ok(base) => base,
            Err(e) if e.is(ErrorKind::NotFound) => {
                debug!("Base directory does not exist yet");
                return Ok(0);
            }
            Err(e) => return Err(e),
        };

        let mut reconciled = usize::from(self.project(base).await?);

        let mut opts = ListOptions::new(1, SWEEP_PAGE_SIZE).including_deleted(true);
        loop {
            let page = client.get_children(self.base_dir, opts).await?;
            let last_page = (page.len() as u64) < opts.limit();
            for id in page {
                let directory = client.get_directory(id, GetOptions::with_deleted()).await?;
                reconciled += usize::from(self.project(directory).await?);
            }
            if last_page {
                break;
            }
            opts = opts.next_page();
        }

        debug!(reconciled, "Sweep complete");
        Ok(reconciled)
    }

    /// Bring one swept directory into the projection, announcing it with a
    /// synthetic event when its state changed. Records already marked
    /// deleted are final and never revisited.
    async fn project(&self, directory: Directory) -> AppResult<bool> {
        let record = self.projection.get(directory.id).await?;
        match &record {
            Some(record) if record.deleted_at.is_some() || record.is_up_to_date(&directory) => {
                return Ok(false);
            }
            None if directory.is_deleted() => return Ok(false),
            _ => {}
        }

        self.persist(&directory).await?;
        let event = if directory.is_deleted() {
            DirectoryEvent::deleted(directory)
        } else {
            DirectoryEvent::created(directory)
        };
        self.reconciler.reconcile(&event).await?;
        Ok(true)
    }

    /// Apply one watched event.
    ///
    /// An event is relevant when its directory is tracked or is the base
    /// directory, or when it is a `create` whose parent is tracked. Relevant
    /// events are persisted and handed to the reconciler unchanged, except
    /// repeated deliveries the projection already reflects. Once a record
    /// is deleted only a `deletehard` still passes; late `create`, `update`
    /// and `delete` events are dropped without touching the projection.
    /// Returns whether the reconciler was invoked.
    #[instrument(
        skip(self, event),
        fields(
            app = %self.app_name,
            event_type = %event.event_type,
            directory_id = %event.directory.id
        )
    )]
    pub async fn process_event(&self, event: &DirectoryEvent) -> AppResult<bool> {
        let directory = &event.directory;
        let record = self.projection.get(directory.id).await?;

        let relevant = match (&record, event.event_type) {
            (Some(_), _) => true,
            _ if directory.id == self.base_dir => true,
            (None, EventType::Create) => match directory.parent {
                Some(parent) => self.projection.is_tracked(parent).await?,
                None => false,
            },
            (None, _) => false,
        };
        if !relevant {
            debug!("Dropping irrelevant event");
            return Ok(false);
        }

        let applied = match (&record, event.event_type) {
            (Some(_), EventType::DeleteHard) => false,
            (Some(record), _) if record.deleted_at.is_some() => true,
            (Some(record), EventType::Create) => record.is_up_to_date(directory),
            _ => false,
        };
        if applied {
            debug!("Dropping already applied event");
            return Ok(false);
        }

        match event.event_type {
            EventType::Create | EventType::Update => self.persist(directory).await?,
            EventType::Delete | EventType::DeleteHard => {
                let at = directory.deleted_at.unwrap_or(event.time);
                self.projection.delete_directory(directory.id, at).await?;
            }
        }

        self.reconciler.reconcile(event).await?;
        Ok(true)
    }

    async fn persist(&self, directory: &Directory) -> AppResult<()> {
        match directory.deleted_at {
            Some(at) => self.projection.delete_directory(directory.id, at).await?,
            None => self.projection.create_directory(directory).await?,
        };
        Ok(())
    }
}

/// Run `fut` unless `cancel` fires first.
async fn guarded<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = AppResult<T>>,
) -> AppResult<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AppError::cancelled("controller cancelled")),
        result = fut => result,
    }
}

async fn next_tick(ticker: &mut Option<JitterTicker>) {
    match ticker {
        Some(ticker) => ticker.tick().await,
        None => std::future::pending().await,
    }
}

async fn next_signal(session: &mut Option<WatchSession>) -> WatchSignal {
    let Some(session) = session.as_mut() else {
        return std::future::pending().await;
    };
    tokio::select! {
        biased;
        Some(event) = session.events.recv() => WatchSignal::Event(event),
        result = &mut session.errors => WatchSignal::Lost(
            result.unwrap_or_else(|_| AppError::bus("watch session ended"))
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ControllerBuilder;
    use async_trait::async_trait;
    use chrono::Utc;
    use dirhub_database::{MemoryDirectoryStore, MemoryProjectionStore, RootWriter, Writer};
    use dirhub_entity::NewDirectory;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Recording {
        seen: Mutex<Vec<(EventType, DirectoryId)>>,
    }

    impl Recording {
        fn seen(&self) -> Vec<(EventType, DirectoryId)> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Reconciler for Recording {
        async fn reconcile(&self, event: &DirectoryEvent) -> AppResult<()> {
            self.seen
                .lock()
                .unwrap()
                .push((event.event_type, event.directory.id));
            Ok(())
        }
    }

    struct Fixture {
        store: Arc<MemoryDirectoryStore>,
        projection: Arc<MemoryProjectionStore>,
        reconciler: Arc<Recording>,
        controller: Controller,
        root: Directory,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryDirectoryStore::new());
        let root = store.create_root(NewDirectory::root("r")).await.unwrap();
        let projection = Arc::new(MemoryProjectionStore::new());
        let reconciler = Arc::new(Recording::default());
        let controller = ControllerBuilder::new(root.id)
            .client(store.clone())
            .projection(projection.clone())
            .reconciler(reconciler.clone())
            .build()
            .unwrap();
        Fixture {
            store,
            projection,
            reconciler,
            controller,
            root,
        }
    }

    #[tokio::test]
    async fn test_sweep_projects_subtree_once() {
        let f = fixture().await;
        let a = f
            .store
            .create_directory(NewDirectory::child("a", f.root.id))
            .await
            .unwrap();
        let b = f
            .store
            .create_directory(NewDirectory::child("b", a.id))
            .await
            .unwrap();

        assert_eq!(f.controller.sweep().await.unwrap(), 3);
        assert_eq!(
            f.reconciler.seen(),
            vec![
                (EventType::Create, f.root.id),
                (EventType::Create, a.id),
                (EventType::Create, b.id),
            ]
        );

        assert_eq!(f.controller.sweep().await.unwrap(), 0);
        assert_eq!(f.projection.len(), 3);
    }

    #[tokio::test]
    async fn test_sweep_reports_deletions() {
        let f = fixture().await;
        let a = f
            .store
            .create_directory(NewDirectory::child("a", f.root.id))
            .await
            .unwrap();
        f.controller.sweep().await.unwrap();

        f.store.delete_directory(a.id).await.unwrap();
        let gone = f
            .store
            .create_directory(NewDirectory::child("gone", f.root.id))
            .await
            .unwrap();
        f.store.delete_directory(gone.id).await.unwrap();

        assert_eq!(f.controller.sweep().await.unwrap(), 1);
        assert_eq!(f.reconciler.seen().last(), Some(&(EventType::Delete, a.id)));
        assert!(!f.projection.is_tracked(gone.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_sweep_before_base_exists_is_noop() {
        let reconciler = Arc::new(Recording::default());
        let controller = ControllerBuilder::new(DirectoryId::new())
            .client(Arc::new(MemoryDirectoryStore::new()))
            .reconciler(reconciler.clone())
            .build()
            .unwrap();
        assert_eq!(controller.sweep().await.unwrap(), 0);
        assert!(reconciler.seen().is_empty());
    }

    #[tokio::test]
    async fn test_relevance_filter() {
        let f = fixture().await;
        f.controller.sweep().await.unwrap();
        let before = f.reconciler.seen().len();

        let stranger = Directory::create(
            NewDirectory::child("x", DirectoryId::new()),
            Utc::now(),
        );
        assert!(!f
            .controller
            .process_event(&DirectoryEvent::created(stranger.clone()))
            .await
            .unwrap());
        assert!(!f.projection.is_tracked(stranger.id).await.unwrap());

        let mut untracked = Directory::create(NewDirectory::child("y", f.root.id), Utc::now());
        untracked.mark_deleted(Utc::now());
        assert!(!f
            .controller
            .process_event(&DirectoryEvent::deleted(untracked))
            .await
            .unwrap());

        let child = Directory::create(NewDirectory::child("c", f.root.id), Utc::now());
        assert!(f
            .controller
            .process_event(&DirectoryEvent::created(child.clone()))
            .await
            .unwrap());
        assert!(f.projection.is_tracked(child.id).await.unwrap());
        assert_eq!(f.reconciler.seen().len(), before + 1);
    }

    #[tokio::test]
    async fn test_duplicate_deliveries_reconcile_once() {
        let f = fixture().await;
        f.controller.sweep().await.unwrap();

        let child = Directory::create(NewDirectory::child("c", f.root.id), Utc::now());
        let event = DirectoryEvent::created(child.clone());
        assert!(f.controller.process_event(&event).await.unwrap());
        assert!(!f.controller.process_event(&event).await.unwrap());

        let update = DirectoryEvent::new(EventType::Update, child.clone());
        assert!(f.controller.process_event(&update).await.unwrap());

        let mut deleted = child.clone();
        deleted.mark_deleted(Utc::now());
        let event = DirectoryEvent::deleted(deleted);
        assert!(f.controller.process_event(&event).await.unwrap());
        assert!(!f.controller.process_event(&event).await.unwrap());

        assert!(!f.controller.process_event(&update).await.unwrap());
        let hard = DirectoryEvent::new(EventType::DeleteHard, child);
        assert!(f.controller.process_event(&hard).await.unwrap());
    }

    #[tokio::test]
    async fn test_stale_create_after_swept_delete_is_dropped() {
        let f = fixture().await;
        let x = f
            .store
            .create_directory(NewDirectory::child("x", f.root.id))
            .await
            .unwrap();
        f.controller.sweep().await.unwrap();

        f.store.delete_directory(x.id).await.unwrap();
        assert_eq!(f.controller.sweep().await.unwrap(), 1);
        let deleted_at = f.projection.get(x.id).await.unwrap().unwrap().deleted_at;
        assert!(deleted_at.is_some());

        assert!(!f
            .controller
            .process_event(&DirectoryEvent::created(x.clone()))
            .await
            .unwrap());
        let late_delete = f
            .store
            .get_directory(x.id, GetOptions::with_deleted())
            .await
            .unwrap();
        assert!(!f
            .controller
            .process_event(&DirectoryEvent::deleted(late_delete))
            .await
            .unwrap());

        let calls_for_x: Vec<_> = f
            .reconciler
            .seen()
            .into_iter()
            .filter(|(_, id)| *id == x.id)
            .collect();
        assert_eq!(
            calls_for_x,
            vec![(EventType::Create, x.id), (EventType::Delete, x.id)]
        );
        let record = f.projection.get(x.id).await.unwrap().unwrap();
        assert_eq!(record.deleted_at, deleted_at);
        assert_eq!(f.controller.sweep().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sweep_does_not_revisit_deleted_records() {
        let f = fixture().await;
        let x = f
            .store
            .create_directory(NewDirectory::child("x", f.root.id))
            .await
            .unwrap();
        f.controller.sweep().await.unwrap();

        // Deletion learned from an event stamped differently from the store.
        let mut seen_deleted = x.clone();
        seen_deleted.mark_deleted(Utc::now() - chrono::Duration::seconds(30));
        assert!(f
            .controller
            .process_event(&DirectoryEvent::deleted(seen_deleted))
            .await
            .unwrap());
        f.store.delete_directory(x.id).await.unwrap();

        assert_eq!(f.controller.sweep().await.unwrap(), 0);
        assert_eq!(f.reconciler.seen().last(), Some(&(EventType::Delete, x.id)));
    }

    #[tokio::test]
    async fn test_reconciler_error_stops_run() {
        #[derive(Debug)]
        struct Broken;

        #[async_trait]
        impl Reconciler for Broken {
            async fn reconcile(&self, _event: &DirectoryEvent) -> AppResult<()> {
                Err(AppError::internal("application failure"))
            }
        }

        let store = Arc::new(MemoryDirectoryStore::new());
        let root = store.create_root(NewDirectory::root("r")).await.unwrap();
        let controller = ControllerBuilder::new(root.id)
            .client(store)
            .reconciler(Arc::new(Broken))
            .build()
            .unwrap();

        let err = controller.run(CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Internal);
    }

    #[tokio::test]
    async fn test_cancel_returns_cancelled() {
        let f = fixture().await;
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = f.controller.run(cancel).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Cancelled);
    }
}
