//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use dirhub_controller::{Controller, ControllerBuilder, Reconciler};
use dirhub_core::config::NotifierConfig;
use dirhub_core::result::AppResult;
use dirhub_core::types::DirectoryId;
use dirhub_database::{MemoryDirectoryStore, MemoryProjectionStore};
use dirhub_entity::{DirectoryEvent, EventType};
use dirhub_realtime::{BusWatcher, EventBus, MemoryBus, Notifier, build_notifier};
use dirhub_service::NotifyingStore;

pub const TOPIC: &str = "directories";

/// Store wired to an in-memory bus, as an application would see it.
pub struct TestHub {
    /// The raw store, bypassing notification
    pub store: Arc<MemoryDirectoryStore>,
    /// The store every test mutation goes through
    pub hub: NotifyingStore<Arc<MemoryDirectoryStore>, Arc<dyn Notifier>>,
    pub bus: Arc<MemoryBus>,
    pub cancel: CancellationToken,
}

impl TestHub {
    pub fn new() -> Self {
        let store = Arc::new(MemoryDirectoryStore::new());
        let bus = Arc::new(MemoryBus::new(256));
        let cancel = CancellationToken::new();
        let bus_dyn: Arc<dyn EventBus> = bus.clone();
        let notifier = build_notifier(&NotifierConfig::default(), Some(bus_dyn), cancel.clone());
        Self {
            hub: NotifyingStore::new(Arc::clone(&store), notifier),
            store,
            bus,
            cancel,
        }
    }

    pub fn watcher(&self) -> Arc<BusWatcher> {
        Arc::new(BusWatcher::new(self.bus.clone(), TOPIC))
    }

    /// Wait until `n` watch sessions are subscribed.
    pub async fn wait_for_subscribers(&self, n: usize) {
        let bus = Arc::clone(&self.bus);
        eventually(move || {
            let bus = Arc::clone(&bus);
            async move { bus.subscriber_count(TOPIC).await == n }
        })
        .await;
    }
}

impl Drop for TestHub {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Reconciler recording every call.
#[derive(Debug, Default)]
pub struct CountingReconciler {
    calls: Mutex<Vec<(EventType, DirectoryId)>>,
}

impl CountingReconciler {
    pub fn calls(&self) -> Vec<(EventType, DirectoryId)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, event_type: EventType, id: DirectoryId) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, d)| *t == event_type && *d == id)
            .count()
    }

    pub fn total(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Reconciler for CountingReconciler {
    async fn reconcile(&self, event: &DirectoryEvent) -> AppResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push((event.event_type, event.directory.id));
        Ok(())
    }
}

/// A controller under test with handles on its collaborators.
pub struct RunningController {
    pub projection: Arc<MemoryProjectionStore>,
    pub reconciler: Arc<CountingReconciler>,
    pub cancel: CancellationToken,
    pub handle: JoinHandle<AppResult<()>>,
}

impl RunningController {
    pub fn spawn(
        builder: ControllerBuilder,
        projection: Arc<MemoryProjectionStore>,
    ) -> Self {
        let reconciler = Arc::new(CountingReconciler::default());
        let controller: Controller = builder
            .projection(projection.clone())
            .reconciler(reconciler.clone())
            .build()
            .expect("controller builds");
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move { controller.run(token).await });
        Self {
            projection,
            reconciler,
            cancel,
            handle,
        }
    }

    /// Wait until the reconciler saw `event_type` for `id` at least once.
    pub async fn wait_for(&self, event_type: EventType, id: DirectoryId) {
        let reconciler = Arc::clone(&self.reconciler);
        eventually(move || {
            let seen = reconciler.count(event_type, id) > 0;
            async move { seen }
        })
        .await;
    }

    pub async fn stop(self) -> AppResult<()> {
        self.cancel.cancel();
        self.handle.await.expect("controller task panicked")
    }
}

/// Poll `check` until it holds, failing the test after five seconds.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !check().await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached within 5s"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Short jittered sweep interval for tests that rely on sweeps.
pub fn fast_sweeps(builder: ControllerBuilder) -> ControllerBuilder {
    builder.sweep_interval(Duration::from_millis(50), Duration::from_millis(100))
}
