//! Integration tests for the application controller.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use dirhub_controller::{ControllerBuilder, NoopReconciler};
use dirhub_core::error::ErrorKind;
use dirhub_database::{MemoryProjectionStore, ProjectionStore, RootWriter, Writer};
use dirhub_entity::{Directory, DirectoryEvent, EventType, NewDirectory};
use dirhub_realtime::EventBus;

use helpers::{RunningController, TOPIC, TestHub, eventually, fast_sweeps};

#[tokio::test]
async fn test_controller_reconnects_after_transport_loss() {
    let hub = TestHub::new();
    let r = hub.hub.create_root(NewDirectory::root("r")).await.unwrap();

    let running = RunningController::spawn(
        fast_sweeps(ControllerBuilder::new(r.id))
            .client(hub.store.clone())
            .watcher(hub.watcher()),
        Arc::new(MemoryProjectionStore::new()),
    );
    running.wait_for(EventType::Create, r.id).await;
    hub.wait_for_subscribers(1).await;

    let x = hub
        .hub
        .create_directory(NewDirectory::child("x", r.id))
        .await
        .unwrap();
    running.wait_for(EventType::Create, x.id).await;

    hub.bus.sever().await;
    let y = hub
        .hub
        .create_directory(NewDirectory::child("y", r.id))
        .await
        .unwrap();
    running.wait_for(EventType::Create, y.id).await;

    // Resubscribed after a sweep; new events flow again.
    hub.wait_for_subscribers(1).await;
    let z = hub
        .hub
        .create_directory(NewDirectory::child("z", r.id))
        .await
        .unwrap();
    running.wait_for(EventType::Create, z.id).await;

    // A few more sweeps must not repeat anything.
    tokio::time::sleep(Duration::from_millis(300)).await;
    for id in [r.id, x.id, y.id, z.id] {
        assert_eq!(running.reconciler.count(EventType::Create, id), 1);
    }
    assert_eq!(running.reconciler.total(), 4);

    let err = running.stop().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cancelled);
}

#[tokio::test]
async fn test_controller_started_before_base_directory_exists() {
    let hub = TestHub::new();
    // Store ids are assigned on insert, so mint R up front and announce it
    // the way a notifying store would once it commits.
    let r = Directory::create(NewDirectory::root("r"), Utc::now());

    let running = RunningController::spawn(
        fast_sweeps(ControllerBuilder::new(r.id))
            .client(hub.store.clone())
            .watcher(hub.watcher()),
        Arc::new(MemoryProjectionStore::new()),
    );
    // The watch opens only after the initial sweep returned.
    hub.wait_for_subscribers(1).await;
    assert_eq!(running.reconciler.total(), 0);

    hub.bus
        .publish(TOPIC, DirectoryEvent::created(r.clone()).to_json().unwrap())
        .await
        .unwrap();
    running.wait_for(EventType::Create, r.id).await;

    let x = Directory::create(NewDirectory::child("x", r.id), Utc::now());
    hub.bus
        .publish(TOPIC, DirectoryEvent::created(x.clone()).to_json().unwrap())
        .await
        .unwrap();
    running.wait_for(EventType::Create, x.id).await;

    // Sweeps keep finding no base directory and must not disturb the projection.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(
        running.reconciler.calls(),
        vec![(EventType::Create, r.id), (EventType::Create, x.id)]
    );
    assert!(running.projection.is_tracked(r.id).await.unwrap());
    assert!(running.projection.is_tracked(x.id).await.unwrap());

    let err = running.stop().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cancelled);
}

#[tokio::test]
async fn test_event_only_controller_reconciles_once_per_directory() {
    let hub = TestHub::new();
    let r = hub.hub.create_root(NewDirectory::root("r")).await.unwrap();

    let projection = Arc::new(MemoryProjectionStore::new());
    projection.create_directory(&r).await.unwrap();
    let running = RunningController::spawn(
        ControllerBuilder::new(r.id).watcher(hub.watcher()),
        projection,
    );
    hub.wait_for_subscribers(1).await;

    let x = hub
        .hub
        .create_directory(NewDirectory::child("x", r.id))
        .await
        .unwrap();
    running.wait_for(EventType::Create, x.id).await;

    // Redeliver the same create, then use a fresh directory as a barrier.
    let duplicate = DirectoryEvent::created(x.clone()).to_json().unwrap();
    hub.bus.publish(TOPIC, duplicate).await.unwrap();
    let barrier = hub
        .hub
        .create_directory(NewDirectory::child("barrier", r.id))
        .await
        .unwrap();
    running.wait_for(EventType::Create, barrier.id).await;

    assert_eq!(running.reconciler.count(EventType::Create, x.id), 1);
    assert_eq!(running.reconciler.total(), 2);

    hub.hub.delete_directory(x.id).await.unwrap();
    running.wait_for(EventType::Delete, x.id).await;
    let record = running.projection.get(x.id).await.unwrap().unwrap();
    assert!(record.deleted_at.is_some());

    running.stop().await.unwrap_err();
}

#[tokio::test]
async fn test_event_only_controller_stops_on_transport_loss() {
    let hub = TestHub::new();
    let r = hub.hub.create_root(NewDirectory::root("r")).await.unwrap();
    let running = RunningController::spawn(
        ControllerBuilder::new(r.id).watcher(hub.watcher()),
        Arc::new(MemoryProjectionStore::new()),
    );
    hub.wait_for_subscribers(1).await;

    hub.bus.sever().await;
    let err = tokio::time::timeout(Duration::from_secs(5), running.handle)
        .await
        .expect("controller stops")
        .unwrap()
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Bus);
}

#[tokio::test]
async fn test_relevance_filter() {
    let hub = TestHub::new();
    let r = hub.hub.create_root(NewDirectory::root("r")).await.unwrap();

    let projection = Arc::new(MemoryProjectionStore::new());
    projection.create_directory(&r).await.unwrap();
    let running = RunningController::spawn(
        ControllerBuilder::new(r.id).watcher(hub.watcher()),
        projection.clone(),
    );
    hub.wait_for_subscribers(1).await;

    let stranger = Directory::create(
        NewDirectory::child("stranger", dirhub_core::types::DirectoryId::new()),
        Utc::now(),
    );
    let mut gone = Directory::create(NewDirectory::child("gone", r.id), Utc::now());
    gone.mark_deleted(Utc::now());
    for event in [
        DirectoryEvent::created(stranger.clone()),
        DirectoryEvent::deleted(gone.clone()),
    ] {
        hub.bus.publish(TOPIC, event.to_json().unwrap()).await.unwrap();
    }

    let accepted = hub
        .hub
        .create_directory(NewDirectory::child("accepted", r.id))
        .await
        .unwrap();
    running.wait_for(EventType::Create, accepted.id).await;

    assert_eq!(running.reconciler.calls(), vec![(EventType::Create, accepted.id)]);
    assert!(!projection.is_tracked(stranger.id).await.unwrap());
    assert!(!projection.is_tracked(gone.id).await.unwrap());
    assert_eq!(projection.len(), 2);

    running.stop().await.unwrap_err();
}

#[tokio::test]
async fn test_descendants_converge() {
    let hub = TestHub::new();
    let r = hub.hub.create_root(NewDirectory::root("r")).await.unwrap();
    let running = RunningController::spawn(
        fast_sweeps(ControllerBuilder::new(r.id))
            .client(hub.store.clone())
            .watcher(hub.watcher()),
        Arc::new(MemoryProjectionStore::new()),
    );

    let mut parent = r.id;
    let mut created = Vec::new();
    for depth in 0..5 {
        for i in 0..3 {
            let d = hub
                .hub
                .create_directory(NewDirectory::child(format!("d{depth}-{i}"), parent))
                .await
                .unwrap();
            created.push(d.id);
        }
        parent = *created.last().unwrap();
    }

    let projection = running.projection.clone();
    let ids = created.clone();
    eventually(move || {
        let projection = projection.clone();
        let ids = ids.clone();
        async move {
            for id in ids {
                if !projection.is_tracked(id).await.unwrap() {
                    return false;
                }
            }
            true
        }
    })
    .await;

    for id in created {
        assert_eq!(running.reconciler.count(EventType::Create, id), 1);
    }
    running.stop().await.unwrap_err();
}

#[tokio::test]
async fn test_repeated_sweeps_are_idempotent() {
    let hub = TestHub::new();
    let r = hub.hub.create_root(NewDirectory::root("r")).await.unwrap();
    let a = hub
        .hub
        .create_directory(NewDirectory::child("a", r.id))
        .await
        .unwrap();
    hub.hub
        .create_directory(NewDirectory::child("b", a.id))
        .await
        .unwrap();
    hub.hub.delete_directory(a.id).await.unwrap();
    hub.hub
        .create_directory(NewDirectory::child("c", r.id))
        .await
        .unwrap();

    let projection = Arc::new(MemoryProjectionStore::new());
    let controller = ControllerBuilder::new(r.id)
        .client(hub.store.clone())
        .projection(projection.clone())
        .reconciler(Arc::new(NoopReconciler))
        .build()
        .unwrap();

    controller.sweep().await.unwrap();
    let first = projection.records();
    for _ in 0..3 {
        assert_eq!(controller.sweep().await.unwrap(), 0);
        assert_eq!(projection.records(), first);
    }
    // Deleted before ever being observed, so never tracked.
    assert_eq!(first.len(), 2);
}

#[tokio::test]
async fn test_replaying_a_prefix_converges() {
    let hub = TestHub::new();
    let r = hub.hub.create_root(NewDirectory::root("r")).await.unwrap();
    let a = hub
        .hub
        .create_directory(NewDirectory::child("a", r.id))
        .await
        .unwrap();
    let b = hub
        .hub
        .create_directory(NewDirectory::child("b", a.id))
        .await
        .unwrap();
    let deleted = hub.hub.delete_directory(a.id).await.unwrap();

    let mut stream = vec![DirectoryEvent::created(a), DirectoryEvent::created(b)];
    stream.extend(deleted.into_iter().map(DirectoryEvent::deleted));

    let controller_for = |projection: Arc<MemoryProjectionStore>| {
        ControllerBuilder::new(r.id)
            .watcher(hub.watcher())
            .projection(projection)
            .reconciler(Arc::new(NoopReconciler))
            .build()
            .unwrap()
    };

    let full = Arc::new(MemoryProjectionStore::new());
    full.create_directory(&r).await.unwrap();
    let controller = controller_for(full.clone());
    for event in &stream {
        controller.process_event(event).await.unwrap();
    }

    for prefix in 0..=stream.len() {
        let replayed = Arc::new(MemoryProjectionStore::new());
        replayed.create_directory(&r).await.unwrap();
        let controller = controller_for(replayed.clone());
        for event in stream[..prefix].iter().chain(stream.iter()) {
            controller.process_event(event).await.unwrap();
        }
        assert_eq!(replayed.records(), full.records(), "prefix {prefix}");
    }
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let hub = TestHub::new();
    let r = hub.hub.create_root(NewDirectory::root("r")).await.unwrap();
    let controller = ControllerBuilder::new(r.id)
        .client(hub.store.clone())
        .reconciler(Arc::new(NoopReconciler))
        .build()
        .unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = controller.run(cancel).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cancelled);
}
