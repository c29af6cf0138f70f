//! Integration tests for the sync engine: two devices sharing one remote
//! store, offline edits, conflicts and their resolution.

use std::sync::Arc;

use futures_lite::future::block_on;

use gitnotes_core::cache::InMemoryCache;
use gitnotes_core::connectivity::ConnectivityMonitor;
use gitnotes_core::remote::{InMemoryStore, RemoteContentStore};
use gitnotes_core::sync::{ConflictResolution, SyncEngine, SyncStatus};

type Engine = SyncEngine<Arc<InMemoryStore>, Arc<InMemoryCache>>;

fn device(store: &Arc<InMemoryStore>) -> (Engine, Arc<InMemoryCache>) {
    let cache = Arc::new(InMemoryCache::new());
    let monitor = Arc::new(ConnectivityMonitor::new());
    let engine = SyncEngine::new(Arc::clone(store), Arc::clone(&cache), monitor);
    (engine, cache)
}

#[test]
fn two_devices_converge_through_the_store() {
    let store = Arc::new(InMemoryStore::new());
    let (mut a, _) = device(&store);
    let (mut b, _) = device(&store);

    let created = block_on(a.create_note("Shared", "from device A", None)).unwrap();
    assert!(created.synced);

    block_on(b.fetch_all());
    let seen = b.notes();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].title, "Shared");
    assert_eq!(seen[0].content, "from device A");
    assert_eq!(seen[0].id, created.id);

    // device B edits; device A picks the edit up on its next fetch
    let updated = block_on(b.update_note(&created.id, "# Shared\nfrom device B", None)).unwrap();
    assert!(updated.synced);

    block_on(a.fetch_all());
    assert_eq!(a.notes()[0].content, "from device B");
    assert_eq!(a.notes()[0].id, updated.id);
    assert_eq!(a.sync_status(), SyncStatus::Synced);
}

#[test]
fn concurrent_edits_surface_as_a_conflict_and_resolve() {
    let store = Arc::new(InMemoryStore::new());
    let (mut a, _) = device(&store);
    let (mut b, _) = device(&store);

    let note = block_on(a.create_note("Plan", "v1", None)).unwrap();
    block_on(b.fetch_all());

    // both devices edit the same note; B lands first
    let b_id = b.notes()[0].id.clone();
    block_on(b.update_note(&b_id, "# Plan\nB wins the race", None)).unwrap();

    let moved = block_on(a.update_note(&note.id, "# Plan\nA was here", None)).unwrap();
    assert!(!moved.synced);
    assert_eq!(a.sync_status(), SyncStatus::Conflicted);

    let conflicts = a.conflicts();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].local.content, "A was here");
    assert_eq!(
        conflicts[0].remote.content.as_deref(),
        Some("# Plan\nB wins the race")
    );

    // A keeps its own version; the store now carries A's edit
    let a_id = a.notes()[0].id.clone();
    let resolved = block_on(a.resolve_conflict(&a_id, ConflictResolution::KeepLocal)).unwrap();
    assert!(resolved.synced);
    assert_eq!(a.sync_status(), SyncStatus::Synced);

    block_on(b.fetch_all());
    assert_eq!(b.notes()[0].content, "A was here");
    assert_eq!(b.sync_status(), SyncStatus::Synced);
}

#[test]
fn offline_session_catches_up_after_restart() {
    let store = Arc::new(InMemoryStore::new());
    let (mut a, cache) = device(&store);

    a.monitor().set_online(false);
    block_on(a.create_note("Offline note", "drafted on a plane", Some("travel")));
    block_on(a.create_folder("archive"));
    assert_eq!(a.sync_status(), SyncStatus::Offline);
    assert!(store.is_empty());
    drop(a);

    // restart: state comes back from the cache, then syncs
    let monitor = Arc::new(ConnectivityMonitor::new());
    let mut a = SyncEngine::new(Arc::clone(&store), cache, monitor);
    assert_eq!(a.notes().len(), 1);
    assert_eq!(a.folders().len(), 2);
    assert_eq!(a.sync_status(), SyncStatus::Pending);

    block_on(a.sync_notes());
    assert_eq!(a.sync_status(), SyncStatus::Synced);
    assert!(store.contains("travel/.gitkeep"));
    assert!(store.contains("archive/.gitkeep"));
    assert_eq!(
        store.len(),
        3,
        "one note and two folder markers should have landed"
    );

    // a second device sees exactly the offline-created note
    let (mut b, _) = device(&store);
    block_on(b.fetch_all());
    assert_eq!(b.notes().len(), 1);
    assert_eq!(b.notes()[0].title, "Offline note");
    assert_eq!(b.notes()[0].folder.as_deref(), Some("travel"));
    let names: Vec<&str> = b.folders().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["archive", "travel"]);
}

#[test]
fn folder_deletion_removes_every_member() {
    let store = Arc::new(InMemoryStore::new());
    let (mut a, _) = device(&store);

    block_on(a.create_folder("inbox"));
    block_on(a.create_note("One", "1", Some("inbox"))).unwrap();
    block_on(a.create_note("Two", "2", Some("inbox"))).unwrap();
    block_on(a.create_note("Elsewhere", "3", None)).unwrap();

    block_on(a.delete_folder("inbox"));

    assert!(a.folders().is_empty());
    assert_eq!(a.notes().len(), 1);
    assert_eq!(a.notes()[0].title, "Elsewhere");

    // remote reflects the same end state
    let (mut b, _) = device(&store);
    block_on(b.fetch_all());
    assert_eq!(b.notes().len(), 1);
    assert!(b.folders().is_empty());
    assert!(!store.contains("inbox/.gitkeep"));
}

#[test]
fn moving_a_note_between_folders_relocates_the_remote_file() {
    let store = Arc::new(InMemoryStore::new());
    let (mut a, _) = device(&store);

    block_on(a.create_folder("drafts"));
    let note = block_on(a.create_note("Post", "wip", Some("drafts"))).unwrap();
    assert!(note.path.starts_with("drafts/"));

    let moved = block_on(a.update_note(&note.id, "# Post\nfinal", Some("published"))).unwrap();
    assert!(moved.path.starts_with("published/"));
    assert!(!store.contains(&note.path));
    assert!(store.contains(&moved.path));

    // the other device observes the move as delete + create
    let (mut b, _) = device(&store);
    block_on(b.fetch_all());
    assert_eq!(b.notes().len(), 1);
    assert_eq!(b.notes()[0].folder.as_deref(), Some("published"));
    assert_eq!(b.notes()[0].content, "final");
}

#[test]
fn scenario_create_ideas_note() {
    // start with notes=[], create "Ideas" with a heading-carrying body
    let store = Arc::new(InMemoryStore::new());
    let (mut engine, _) = device(&store);
    assert!(engine.notes().is_empty());

    let note = block_on(engine.create_note("Ideas", "# Ideas\nfirst", None)).unwrap();

    assert_eq!(engine.notes().len(), 1);
    assert_eq!(note.title, "Ideas");
    assert_eq!(note.content, "first");
    assert!(note.synced);

    let name = note.path.as_str();
    assert!(name.starts_with("note_"));
    assert!(name.ends_with(".md"));
    let digits = &name["note_".len()..name.len() - ".md".len()];
    assert!(!digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()));

    // the stored file carries the synthesized heading
    let raw = block_on(store.read_file(name)).unwrap();
    assert_eq!(raw.content, "# Ideas\nfirst");
}
