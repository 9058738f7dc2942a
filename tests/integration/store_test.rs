//! Integration tests for the directory store contract.

use std::collections::HashSet;

use dirhub_core::error::ErrorKind;
use dirhub_core::types::{DirectoryId, GetOptions, ListOptions};
use dirhub_database::{
    MemoryDirectoryStore, Reader, RootReader, RootWriter, StoreMode, Writer,
};
use dirhub_entity::{Directory, NewDirectory};

async fn chain(store: &MemoryDirectoryStore, names: &[&str]) -> Vec<Directory> {
    let mut dirs = vec![store.create_root(NewDirectory::root(names[0])).await.unwrap()];
    for name in &names[1..] {
        let parent = dirs.last().unwrap().id;
        dirs.push(
            store
                .create_directory(NewDirectory::child(*name, parent))
                .await
                .unwrap(),
        );
    }
    dirs
}

#[tokio::test]
async fn test_two_roots() {
    let store = MemoryDirectoryStore::new();
    let r1 = store.create_root(NewDirectory::root("r1")).await.unwrap();
    let r2 = store.create_root(NewDirectory::root("r2")).await.unwrap();

    let roots: HashSet<_> = store
        .list_roots(ListOptions::default())
        .await
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(roots, HashSet::from([r1.id, r2.id]));
}

#[tokio::test]
async fn test_cascade_delete() {
    let store = MemoryDirectoryStore::new();
    let r = store.create_root(NewDirectory::root("r")).await.unwrap();
    let a = store.create_directory(NewDirectory::child("a", r.id)).await.unwrap();
    let b = store.create_directory(NewDirectory::child("b", a.id)).await.unwrap();
    let c = store.create_directory(NewDirectory::child("c", a.id)).await.unwrap();

    let deleted = store.delete_directory(a.id).await.unwrap();
    let ids: HashSet<_> = deleted.iter().map(|d| d.id).collect();
    assert_eq!(ids, HashSet::from([a.id, b.id, c.id]));

    let stamp = deleted[0].deleted_at.expect("deleted_at set");
    for d in &deleted {
        let stored = store.get_directory(d.id, GetOptions::with_deleted()).await.unwrap();
        assert_eq!(stored.deleted_at, Some(stamp));
    }

    let err = store.get_directory(b.id, GetOptions::default()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    let b = store.get_directory(b.id, GetOptions::with_deleted()).await.unwrap();
    assert!(b.is_deleted());

    assert!(!store.get_directory(r.id, GetOptions::default()).await.unwrap().is_deleted());
    assert!(
        store
            .get_children(r.id, ListOptions::default())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_parents_until() {
    let store = MemoryDirectoryStore::new();
    let dirs = chain(&store, &["r", "a", "b", "c", "d"]).await;
    let [r, a, b, c, d] = [0, 1, 2, 3, 4].map(|i| dirs[i].id);

    assert_eq!(
        store.get_parents(d, ListOptions::default()).await.unwrap(),
        vec![c, b, a, r]
    );
    assert_eq!(
        store.get_parents_until(d, a, ListOptions::default()).await.unwrap(),
        vec![c, b, a]
    );
    assert!(
        store
            .get_parents_until(d, d, ListOptions::default())
            .await
            .unwrap()
            .is_empty()
    );

    let err = store
        .get_parents_until(a, d, ListOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_boundary_errors() {
    let store = MemoryDirectoryStore::new();
    let r = store.create_root(NewDirectory::root("r")).await.unwrap();

    let mut with_parent = NewDirectory::root("bad");
    with_parent.parent = Some(r.id);
    assert_eq!(
        store.create_root(with_parent).await.unwrap_err().kind,
        ErrorKind::RootWithParent
    );

    assert_eq!(
        store
            .create_directory(NewDirectory::root("orphan"))
            .await
            .unwrap_err()
            .kind,
        ErrorKind::WithoutParent
    );

    assert_eq!(
        store.delete_directory(DirectoryId::new()).await.unwrap_err().kind,
        ErrorKind::NotFound
    );

    assert_eq!(
        store
            .create_directory(NewDirectory::child("lost", DirectoryId::new()))
            .await
            .unwrap_err()
            .kind,
        ErrorKind::NotFound
    );

    let leaf = store.create_directory(NewDirectory::child("leaf", r.id)).await.unwrap();
    assert!(
        store
            .get_children(leaf.id, ListOptions::default())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_traversals_exclude_self() {
    let store = MemoryDirectoryStore::new();
    let dirs = chain(&store, &["r", "a", "b"]).await;
    for d in &dirs {
        let children = store.get_children(d.id, ListOptions::default()).await.unwrap();
        let parents = store.get_parents(d.id, ListOptions::default()).await.unwrap();
        assert!(!children.contains(&d.id));
        assert!(!parents.contains(&d.id));
    }
}

#[tokio::test]
async fn test_round_trip_create_then_get() {
    let store = MemoryDirectoryStore::new();
    let root = store
        .create_root(NewDirectory::root("projects").with_metadata("owner", "ops"))
        .await
        .unwrap();
    let fetched = store.get_directory(root.id, GetOptions::default()).await.unwrap();
    assert_eq!(fetched, root);
    assert_eq!(fetched.metadata.get("owner").map(String::as_str), Some("ops"));
}

#[tokio::test]
async fn test_children_paging_walks_flat_sequence() {
    let store = MemoryDirectoryStore::new();
    let r = store.create_root(NewDirectory::root("r")).await.unwrap();
    let mut expected = Vec::new();
    for i in 0..7 {
        let d = store
            .create_directory(NewDirectory::child(format!("d{i}"), r.id))
            .await
            .unwrap();
        expected.push(d.id);
    }

    let mut seen = Vec::new();
    let mut opts = ListOptions::new(1, 3);
    loop {
        let page = store.get_children(r.id, opts).await.unwrap();
        let done = page.len() < 3;
        seen.extend(page);
        if done {
            break;
        }
        opts = opts.next_page();
    }
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_last_representable_page_is_empty() {
    let store = MemoryDirectoryStore::new();
    let dirs = chain(&store, &["r", "a", "b"]).await;
    let opts = ListOptions {
        with_deleted: false,
        page: u64::MAX,
        page_size: 10,
    };

    assert!(store.get_children(dirs[0].id, opts).await.unwrap().is_empty());
    assert!(store.get_parents(dirs[2].id, opts).await.unwrap().is_empty());
    assert!(store.list_roots(opts).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_deleted_anchor_needs_with_deleted() {
    let store = MemoryDirectoryStore::new();
    let dirs = chain(&store, &["r", "a", "b"]).await;
    store.delete_directory(dirs[1].id).await.unwrap();

    let err = store
        .get_children(dirs[1].id, ListOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let children = store
        .get_children(dirs[1].id, ListOptions::default().including_deleted(true))
        .await
        .unwrap();
    assert_eq!(children, vec![dirs[2].id]);
}

#[tokio::test]
async fn test_read_only_store() {
    let admin = MemoryDirectoryStore::new();
    let r = admin.create_root(NewDirectory::root("r")).await.unwrap();
    let reader = admin.view(StoreMode::read_only());

    assert_eq!(
        reader.delete_directory(r.id).await.unwrap_err().kind,
        ErrorKind::ReadOnly
    );
    assert_eq!(reader.list_roots(ListOptions::default()).await.unwrap(), vec![r.id]);
}
