//! Sync engine orchestrator.
//!
//! The engine owns the in-memory note/folder set, reads and writes the
//! durable cache, and talks to the remote store when online. All operations
//! run on one logical task queue (`&mut self`); network calls suspend the
//! calling operation without blocking others, and every remote mutation is
//! compare-and-swap keyed so stale interleavings surface as conflicts
//! instead of silent overwrites.
//!
//! Expected failures never escape a public operation: they are folded into
//! per-note state, the derived [`SyncStatus`] and `last_error`, and every
//! mutation is mirrored to the cache before the operation returns so a
//! reload never loses an optimistic local edit.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use indexmap::IndexMap;

use super::conflict::{ConflictResolution, NoteConflict};
use super::merge::{FetchedNote, merge_fetched};
use super::{NoteState, RemoteVersion, SyncStatus, TrackedNote};
use crate::cache::{CachedState, LocalCache, NoteRecord};
use crate::connectivity::ConnectivityMonitor;
use crate::error::{Result, SyncError};
use crate::note::{Folder, Note, note_path};
use crate::remote::{RemoteContentStore, RemoteFile};

/// The reconciliation engine.
///
/// Generic over the remote store and the cache so the merge and state
/// machinery can be driven entirely in-process in tests.
pub struct SyncEngine<S: RemoteContentStore, C: LocalCache> {
    store: S,
    cache: C,
    monitor: Arc<ConnectivityMonitor>,
    notes: IndexMap<String, TrackedNote>,
    folders: IndexMap<String, Folder>,
    current_note_id: Option<String>,
    pending_deletes: Vec<RemoteFile>,
    last_error: Option<String>,
}

impl<S: RemoteContentStore, C: LocalCache> SyncEngine<S, C> {
    /// Create an engine, hydrating state from the cache so optimistic edits
    /// survive a restart.
    pub fn new(store: S, cache: C, monitor: Arc<ConnectivityMonitor>) -> Self {
        let mut engine = Self {
            store,
            cache,
            monitor,
            notes: IndexMap::new(),
            folders: IndexMap::new(),
            current_note_id: None,
            pending_deletes: Vec::new(),
            last_error: None,
        };
        engine.hydrate();
        engine
    }

    fn hydrate(&mut self) {
        let state = self.cache.load();
        for record in state.notes {
            // a write that was in flight when the process died never landed
            let note_state = match record.state {
                NoteState::Writing => NoteState::Dirty,
                other => other,
            };
            self.notes.insert(
                record.note.path.clone(),
                TrackedNote {
                    note: record.note,
                    state: note_state,
                    remote_sha: record.remote_sha,
                    pending_move: record.pending_move,
                    conflict: None,
                },
            );
        }
        for folder in state.folders {
            self.folders.insert(folder.name.clone(), folder);
        }
        self.current_note_id = state.current_note_id;
        self.pending_deletes = state.pending_deletes;
    }

    fn persist(&mut self) {
        let state = CachedState {
            notes: self
                .notes
                .values()
                .map(|tracked| NoteRecord {
                    note: tracked.note.clone(),
                    state: tracked.state,
                    remote_sha: tracked.remote_sha.clone(),
                    pending_move: tracked.pending_move.clone(),
                })
                .collect(),
            folders: self.folders.values().cloned().collect(),
            current_note_id: self.current_note_id.clone(),
            pending_deletes: self.pending_deletes.clone(),
        };
        if let Err(err) = self.cache.save(&state) {
            log::warn!("failed to persist local cache: {}", err);
        }
    }

    // ========================================================================
    // Read accessors
    // ========================================================================

    /// All notes, in tracking order.
    pub fn notes(&self) -> Vec<&Note> {
        self.notes.values().map(|tracked| &tracked.note).collect()
    }

    /// All folders, in tracking order.
    pub fn folders(&self) -> Vec<&Folder> {
        self.folders.values().collect()
    }

    /// Look up a note by id.
    pub fn note(&self, id: &str) -> Option<&Note> {
        self.notes
            .values()
            .map(|tracked| &tracked.note)
            .find(|note| note.id == id)
    }

    /// The currently open note, if any.
    pub fn current_note(&self) -> Option<&Note> {
        self.current_note_id
            .as_deref()
            .and_then(|id| self.note(id))
    }

    /// Every unresolved conflicting pair.
    pub fn conflicts(&self) -> Vec<NoteConflict> {
        self.notes
            .values()
            .filter(|tracked| tracked.state == NoteState::Conflicted)
            .map(|tracked| NoteConflict {
                path: tracked.note.path.clone(),
                local: tracked.note.clone(),
                remote: tracked.conflict.clone().unwrap_or(RemoteVersion {
                    sha: tracked.remote_sha.clone().unwrap_or_default(),
                    content: None,
                }),
            })
            .collect()
    }

    /// Derived process-wide status.
    pub fn sync_status(&self) -> SyncStatus {
        if !self.monitor.is_online() {
            return SyncStatus::Offline;
        }
        if self
            .notes
            .values()
            .any(|tracked| tracked.state == NoteState::Conflicted)
        {
            return SyncStatus::Conflicted;
        }
        let pending_notes = self
            .notes
            .values()
            .any(|tracked| matches!(tracked.state, NoteState::Dirty | NoteState::Writing));
        let pending_folders = self.folders.values().any(|folder| !folder.synced);
        if pending_notes || pending_folders || !self.pending_deletes.is_empty() {
            return SyncStatus::Pending;
        }
        SyncStatus::Synced
    }

    /// Message of the most recent failed operation, cleared by the next
    /// successful fetch.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The connectivity monitor this engine observes.
    pub fn monitor(&self) -> &Arc<ConnectivityMonitor> {
        &self.monitor
    }

    /// Identifier of the remote store this engine syncs against.
    pub fn provider_id(&self) -> String {
        self.store.provider_id()
    }

    /// Swap in a store carrying a refreshed session token. State and cache
    /// are untouched; the store must target the same repository.
    pub fn replace_store(&mut self, store: S) {
        self.store = store;
    }

    fn path_of(&self, id: &str) -> Option<String> {
        self.notes
            .values()
            .find(|tracked| tracked.note.id == id)
            .map(|tracked| tracked.note.path.clone())
    }

    fn retarget_current(&mut self, old_id: &str, new_id: &str) {
        if self.current_note_id.as_deref() == Some(old_id) {
            self.current_note_id = Some(new_id.to_string());
        }
    }

    fn record_failure(&mut self, context: &str, err: &SyncError) {
        if err.is_offline() {
            self.monitor.set_online(false);
        }
        log::warn!("{}: {}", context, err);
        self.last_error = Some(err.to_string());
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Fetch the full remote listing and merge it into the local set.
    ///
    /// Remote notes replace clean local ones; dirty local notes are retained
    /// and flagged conflicted when the remote diverged. A no-op while
    /// offline.
    pub async fn fetch_all(&mut self) {
        if !self.monitor.is_online() {
            return;
        }
        match self.try_fetch_all().await {
            Ok(()) => {
                self.last_error = None;
            }
            Err(err) => self.record_failure("fetch failed", &err),
        }
        self.persist();
    }

    async fn try_fetch_all(&mut self) -> Result<()> {
        let files = self.store.list_note_files().await?;
        let mut fetched = Vec::with_capacity(files.len());
        for file in files {
            match self.store.read_file(&file.path).await {
                Ok(body) => fetched.push(FetchedNote {
                    path: file.path,
                    sha: body.sha,
                    raw: body.content,
                }),
                // vanished between listing and read; treated as deleted
                Err(SyncError::NotFound(_)) => continue,
                Err(err) => return Err(err),
            }
        }

        let outcome = merge_fetched(&mut self.notes, fetched);
        for path in &outcome.conflicts {
            log::info!("conflict detected for '{}'", path);
        }

        let remote_folders = self.store.list_folders().await?;
        self.merge_folders(remote_folders);

        // drop a dangling current-note reference
        if let Some(id) = self.current_note_id.clone()
            && self.note(&id).is_none()
        {
            self.current_note_id = None;
        }
        Ok(())
    }

    fn merge_folders(&mut self, remote: Vec<String>) {
        let remote_set: HashSet<&str> = remote.iter().map(String::as_str).collect();
        let mut next: IndexMap<String, Folder> = IndexMap::new();
        for name in &remote {
            if Folder::is_valid_name(name) {
                next.insert(name.clone(), Folder::remote(name));
            }
        }
        // locally created folders whose marker hasn't been pushed yet
        for (name, folder) in &self.folders {
            if !folder.synced && !remote_set.contains(name.as_str()) {
                next.insert(name.clone(), folder.clone());
            }
        }
        // folders implied by retained unsynced notes
        for tracked in self.notes.values() {
            if let Some(name) = &tracked.note.folder {
                next.entry(name.clone()).or_insert_with(|| Folder::new(name));
            }
        }
        self.folders = next;
    }

    /// Create a note, immediately visible locally, and push it when online.
    ///
    /// Returns the note as it stands after the attempt (synced when the
    /// create landed, dirty otherwise).
    pub async fn create_note(
        &mut self,
        title: &str,
        content: &str,
        folder: Option<&str>,
    ) -> Option<Note> {
        let folder = folder.map(str::trim).filter(|f| !f.is_empty());
        if let Some(name) = folder {
            if !Folder::is_valid_name(name) {
                log::warn!("rejecting invalid folder name '{}'", name);
                return None;
            }
            self.folders
                .entry(name.to_string())
                .or_insert_with(|| Folder::new(name));
        }

        let path = self.unique_note_path(folder);
        let note = Note::new_local(title, content, folder, &path);
        self.notes.insert(path.clone(), TrackedNote::local(note));
        self.persist();

        if self.monitor.is_online() {
            self.push_note(&path).await;
        }
        self.note_at(&path).cloned()
    }

    /// Update a note's content and, optionally, move it to another folder
    /// (`None` = repository root). The local mutation is visible immediately;
    /// the remote write is best-effort.
    pub async fn update_note(
        &mut self,
        id: &str,
        content: &str,
        folder: Option<&str>,
    ) -> Option<Note> {
        let path = self.path_of(id)?;
        let folder = folder.map(str::trim).filter(|f| !f.is_empty());
        if let Some(name) = folder
            && !Folder::is_valid_name(name)
        {
            log::warn!("rejecting invalid folder name '{}'", name);
            return None;
        }

        let mut moved = false;
        {
            let tracked = self.notes.get_mut(&path)?;
            tracked.note.set_content(content);
            if tracked.note.folder.as_deref() != folder {
                // the move has no remote primitive: the old path is deleted
                // and the new one created. Remember the displaced copy.
                if tracked.pending_move.is_none()
                    && let Some(sha) = &tracked.remote_sha
                {
                    tracked.pending_move = Some(RemoteFile {
                        path: path.clone(),
                        sha: sha.clone(),
                    });
                }
                tracked.note.set_folder(folder);
                // the new path does not exist remotely; next write is a create
                tracked.remote_sha = None;
                moved = true;
            }
            tracked.mark_dirty();
        }

        let path = if moved {
            let tracked = self.notes.shift_remove(&path)?;
            let new_path = tracked.note.path.clone();
            self.notes.insert(new_path.clone(), tracked);
            new_path
        } else {
            path
        };
        if let Some(name) = folder {
            self.folders
                .entry(name.to_string())
                .or_insert_with(|| Folder::new(name));
        }
        self.persist();

        if self.monitor.is_online() {
            self.push_note(&path).await;
        }
        self.note_at(&path).cloned()
    }

    /// Delete a note locally and best-effort remotely.
    ///
    /// Tombstone semantics: the local removal always stands. When offline
    /// the remote deletion is queued and attempted once on the next sync
    /// pass; a remote failure is logged, never rolled back.
    pub async fn delete_note(&mut self, id: &str) {
        let Some(path) = self.path_of(id) else {
            return;
        };
        let Some(tracked) = self.notes.shift_remove(&path) else {
            return;
        };
        if self.current_note_id.as_deref() == Some(id) {
            self.current_note_id = None;
        }

        let mut targets = Vec::new();
        if let Some(sha) = tracked.remote_sha {
            targets.push(RemoteFile { path, sha });
        }
        if let Some(displaced) = tracked.pending_move {
            targets.push(displaced);
        }

        if self.monitor.is_online() {
            for target in targets {
                self.delete_remote(target).await;
            }
        } else {
            self.pending_deletes.extend(targets);
        }
        self.persist();
    }

    async fn delete_remote(&mut self, target: RemoteFile) {
        match self.store.delete_file(&target.path, &target.sha).await {
            Ok(()) | Err(SyncError::NotFound(_)) => {}
            Err(err) if err.is_offline() => {
                self.record_failure(
                    &format!("failed to delete '{}' remotely", target.path),
                    &err,
                );
                self.pending_deletes.push(target);
            }
            Err(err) => {
                self.record_failure(
                    &format!("failed to delete '{}' remotely", target.path),
                    &err,
                );
            }
        }
    }

    /// Create a folder: a local entry plus, when online, its remote marker.
    pub async fn create_folder(&mut self, name: &str) -> Option<Folder> {
        let name = name.trim();
        if !Folder::is_valid_name(name) {
            log::warn!("rejecting invalid folder name '{}'", name);
            return None;
        }
        if !self.folders.contains_key(name) {
            self.folders.insert(name.to_string(), Folder::new(name));
            self.persist();
            if self.monitor.is_online() {
                self.push_folder_marker(name).await;
            }
        }
        self.folders.get(name).cloned()
    }

    async fn push_folder_marker(&mut self, name: &str) {
        match self.store.create_folder_marker(name).await {
            // an existing marker means the folder is already materialized
            Ok(_) | Err(SyncError::Conflict(_)) => {
                if let Some(folder) = self.folders.get_mut(name) {
                    folder.synced = true;
                }
            }
            Err(err) => {
                self.record_failure(&format!("failed to create folder '{}'", name), &err);
            }
        }
        self.persist();
    }

    /// Delete a folder: every member note, then the marker.
    ///
    /// Best-effort remotely, but the local set is always left without any
    /// member of the folder, even when some remote deletions failed.
    pub async fn delete_folder(&mut self, id: &str) {
        let Some(folder) = self.folders.shift_remove(id) else {
            return;
        };
        let member_ids: Vec<String> = self
            .notes
            .values()
            .filter(|tracked| tracked.note.folder.as_deref() == Some(folder.name.as_str()))
            .map(|tracked| tracked.note.id.clone())
            .collect();
        for note_id in member_ids {
            self.delete_note(&note_id).await;
        }

        if self.monitor.is_online() {
            if let Err(err) = self.store.delete_folder_marker(&folder.name).await {
                self.record_failure(
                    &format!("failed to delete folder marker for '{}'", folder.name),
                    &err,
                );
            }
        }
        self.persist();
    }

    /// Push everything pending: queued deletions, unsynced folder markers,
    /// then every dirty or conflicted note, each keyed on its last-known
    /// hash. A conflicting push flags the note instead of overwriting; an
    /// offline failure stops the pass with local state untouched.
    pub async fn sync_notes(&mut self) {
        if !self.monitor.is_online() {
            return;
        }

        // queued deletions get exactly one attempt each
        let mut queued = std::mem::take(&mut self.pending_deletes);
        while !queued.is_empty() {
            if !self.monitor.is_online() {
                // keep what we didn't get to for the next pass
                self.pending_deletes.extend(queued);
                self.persist();
                return;
            }
            let target = queued.remove(0);
            self.delete_remote(target).await;
        }
        self.persist();

        let unsynced_folders: Vec<String> = self
            .folders
            .values()
            .filter(|folder| !folder.synced)
            .map(|folder| folder.name.clone())
            .collect();
        for name in unsynced_folders {
            if !self.monitor.is_online() {
                return;
            }
            self.push_folder_marker(&name).await;
        }

        let pending: Vec<String> = self
            .notes
            .iter()
            .filter(|(_, tracked)| {
                matches!(tracked.state, NoteState::Dirty | NoteState::Conflicted)
            })
            .map(|(path, _)| path.clone())
            .collect();
        for path in pending {
            if !self.monitor.is_online() {
                return;
            }
            self.push_note(&path).await;
        }
    }

    /// Write one note to the remote store, keyed on its last-known hash.
    async fn push_note(&mut self, path: &str) {
        let (content, expected, pending_move, old_id) = {
            let Some(tracked) = self.notes.get_mut(path) else {
                return;
            };
            tracked.state = NoteState::Writing;
            (
                tracked.note.to_markdown(),
                tracked.remote_sha.clone(),
                tracked.pending_move.clone(),
                tracked.note.id.clone(),
            )
        };

        // a move deletes the displaced copy first so both files never coexist
        if let Some(displaced) = pending_move {
            match self.store.delete_file(&displaced.path, &displaced.sha).await {
                Ok(()) | Err(SyncError::NotFound(_)) => {
                    if let Some(tracked) = self.notes.get_mut(path) {
                        tracked.pending_move = None;
                    }
                }
                Err(err) => {
                    if let Some(tracked) = self.notes.get_mut(path) {
                        tracked.state = NoteState::Dirty;
                    }
                    self.record_failure(
                        &format!("failed to remove old copy '{}'", displaced.path),
                        &err,
                    );
                    self.persist();
                    return;
                }
            }
        }

        match self.store.write_file(path, &content, expected.as_deref()).await {
            Ok(sha) => {
                let new_id = sha.clone();
                if let Some(tracked) = self.notes.get_mut(path) {
                    tracked.mark_clean(sha);
                }
                self.retarget_current(&old_id, &new_id);
            }
            Err(SyncError::Conflict(_)) => {
                // capture the remote side of the pair, best effort
                let remote = match self.store.read_file(path).await {
                    Ok(body) => RemoteVersion {
                        sha: body.sha,
                        content: Some(body.content),
                    },
                    Err(_) => RemoteVersion {
                        sha: expected.unwrap_or_default(),
                        content: None,
                    },
                };
                if let Some(tracked) = self.notes.get_mut(path) {
                    tracked.mark_conflicted(remote);
                }
                log::info!("push of '{}' conflicted; awaiting resolution", path);
            }
            Err(err) => {
                if let Some(tracked) = self.notes.get_mut(path) {
                    tracked.state = NoteState::Dirty;
                }
                self.record_failure(&format!("failed to write '{}'", path), &err);
            }
        }
        self.persist();
    }

    /// Settle a conflicted note.
    ///
    /// `KeepLocal` force-writes the local version keyed on the conflicting
    /// remote hash; `KeepRemote` discards the local edit and adopts the
    /// captured remote version (or drops the note when the remote side was
    /// deleted).
    pub async fn resolve_conflict(
        &mut self,
        id: &str,
        resolution: ConflictResolution,
    ) -> Option<Note> {
        let path = self.path_of(id)?;
        let (state, remote, content, old_id) = {
            let tracked = self.notes.get(&path)?;
            (
                tracked.state,
                tracked.conflict.clone(),
                tracked.note.to_markdown(),
                tracked.note.id.clone(),
            )
        };
        if state != NoteState::Conflicted {
            return self.note_at(&path).cloned();
        }

        match resolution {
            ConflictResolution::KeepLocal => {
                let expected = remote.as_ref().map(|r| r.sha.clone());
                match self.store.write_file(&path, &content, expected.as_deref()).await {
                    Ok(sha) => {
                        let new_id = sha.clone();
                        if let Some(tracked) = self.notes.get_mut(&path) {
                            tracked.mark_clean(sha);
                        }
                        self.retarget_current(&old_id, &new_id);
                    }
                    Err(SyncError::Conflict(_)) => {
                        // the remote moved again; refresh the pair and stay conflicted
                        if let Ok(body) = self.store.read_file(&path).await
                            && let Some(tracked) = self.notes.get_mut(&path)
                        {
                            tracked.conflict = Some(RemoteVersion {
                                sha: body.sha,
                                content: Some(body.content),
                            });
                        }
                        log::info!("resolution of '{}' lost another race; still conflicted", path);
                    }
                    Err(err) => {
                        self.record_failure(&format!("failed to resolve '{}'", path), &err);
                    }
                }
            }
            ConflictResolution::KeepRemote => {
                let version = match remote {
                    Some(RemoteVersion {
                        sha,
                        content: Some(raw),
                    }) => Some((sha, raw)),
                    _ => match self.store.read_file(&path).await {
                        Ok(body) => Some((body.sha, body.content)),
                        Err(SyncError::NotFound(_)) => None,
                        Err(err) => {
                            self.record_failure(&format!("failed to resolve '{}'", path), &err);
                            self.persist();
                            return self.note_at(&path).cloned();
                        }
                    },
                };
                match version {
                    Some((sha, raw)) => {
                        if let Some(tracked) = self.notes.get_mut(&path) {
                            tracked.note = Note::from_remote(&path, &sha, &raw);
                            tracked.mark_clean(sha.clone());
                        }
                        self.retarget_current(&old_id, &sha);
                    }
                    None => {
                        // remote side is gone; discarding local means deleting
                        self.notes.shift_remove(&path);
                        if self.current_note_id.as_deref() == Some(old_id.as_str()) {
                            self.current_note_id = None;
                        }
                    }
                }
            }
        }
        self.persist();
        self.note_at(&path).cloned()
    }

    /// Remember which note is open; persisted across restarts.
    pub fn set_current_note(&mut self, id: Option<&str>) {
        self.current_note_id = match id {
            Some(id) if self.note(id).is_some() => Some(id.to_string()),
            _ => None,
        };
        self.persist();
    }

    fn note_at(&self, path: &str) -> Option<&Note> {
        self.notes.get(path).map(|tracked| &tracked.note)
    }

    fn unique_note_path(&self, folder: Option<&str>) -> String {
        let mut epoch_ms = Utc::now().timestamp_millis();
        loop {
            let path = note_path(folder, epoch_ms);
            if !self.notes.contains_key(&path) {
                return path;
            }
            // same-millisecond creation; nudge forward
            epoch_ms += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::remote::InMemoryStore;
    use futures_lite::future::block_on;

    type TestEngine = SyncEngine<Arc<InMemoryStore>, Arc<InMemoryCache>>;

    fn engine() -> (TestEngine, Arc<InMemoryStore>, Arc<InMemoryCache>) {
        let store = Arc::new(InMemoryStore::new());
        let cache = Arc::new(InMemoryCache::new());
        let monitor = Arc::new(ConnectivityMonitor::new());
        let engine = SyncEngine::new(Arc::clone(&store), Arc::clone(&cache), monitor);
        (engine, store, cache)
    }

    #[test]
    fn test_create_note_online_becomes_clean() {
        let (mut engine, store, _) = engine();

        let note = block_on(engine.create_note("Ideas", "# Ideas\nfirst", None)).unwrap();
        assert_eq!(note.title, "Ideas");
        assert_eq!(note.content, "first");
        assert!(note.synced);
        assert!(note.path.starts_with("note_"));
        assert!(note.path.ends_with(".md"));
        assert_eq!(note.id, store.sha_of(&note.path).unwrap());
        assert_eq!(engine.sync_status(), SyncStatus::Synced);
    }

    #[test]
    fn test_create_note_offline_stays_visible_and_dirty() {
        let (mut engine, store, _) = engine();
        engine.monitor().set_online(false);

        let note = block_on(engine.create_note("Draft", "offline body", None)).unwrap();
        assert!(!note.synced);
        assert_eq!(engine.notes().len(), 1);
        assert_eq!(engine.sync_status(), SyncStatus::Offline);
        assert!(store.is_empty());
    }

    #[test]
    fn test_sync_pushes_offline_work() {
        let (mut engine, store, _) = engine();
        engine.monitor().set_online(false);
        block_on(engine.create_note("Draft", "body", None)).unwrap();

        engine.monitor().set_online(true);
        block_on(engine.sync_notes());

        assert_eq!(store.len(), 1);
        assert_eq!(engine.sync_status(), SyncStatus::Synced);
        assert!(engine.notes()[0].synced);
    }

    #[test]
    fn test_network_failure_mid_operation_goes_offline() {
        let (mut engine, store, _) = engine();
        store.set_offline(true);

        // the engine still believes it is online; the failed write flips it
        let note = block_on(engine.create_note("T", "body", None)).unwrap();
        assert!(!note.synced);
        assert!(!engine.monitor().is_online());
        assert_eq!(engine.sync_status(), SyncStatus::Offline);
    }

    #[test]
    fn test_fetch_all_round_trip() {
        let (mut engine, store, _) = engine();
        block_on(engine.create_note("T", "C", None)).unwrap();

        // a fresh session against the same repository
        let monitor = Arc::new(ConnectivityMonitor::new());
        let mut other = SyncEngine::new(store, Arc::new(InMemoryCache::new()), monitor);
        block_on(other.fetch_all());

        let notes = other.notes();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "T");
        assert_eq!(notes[0].content, "C");
        assert!(notes[0].synced);
    }

    #[test]
    fn test_fetch_twice_is_idempotent() {
        let (mut engine, store, _) = engine();
        store.seed("note_1.md", "# A\nbody");
        store.seed("work/note_2.md", "# B\nbody");
        store.seed("work/.gitkeep", "");

        block_on(engine.fetch_all());
        let first: Vec<(String, String)> = engine
            .notes()
            .iter()
            .map(|n| (n.path.clone(), n.id.clone()))
            .collect();
        let folders_first: Vec<String> =
            engine.folders().iter().map(|f| f.name.clone()).collect();

        block_on(engine.fetch_all());
        let second: Vec<(String, String)> = engine
            .notes()
            .iter()
            .map(|n| (n.path.clone(), n.id.clone()))
            .collect();
        let folders_second: Vec<String> =
            engine.folders().iter().map(|f| f.name.clone()).collect();

        assert_eq!(first, second);
        assert_eq!(folders_first, folders_second);
        assert_eq!(engine.sync_status(), SyncStatus::Synced);
    }

    #[test]
    fn test_conflict_detected_on_sync() {
        let (mut engine, store, _) = engine();
        let note = block_on(engine.create_note("T", "v1", None)).unwrap();

        // edit locally; the push lands and moves the remote forward
        let edited = block_on(engine.update_note(&note.id, "# T\nlocal v2", None)).unwrap();
        assert!(edited.synced);

        // another writer moves the remote again, then a local edit races it
        store.seed(&edited.path, "# T\nremote v3");
        block_on(engine.update_note(&edited.id, "# T\nlocal v4", None));

        assert_eq!(engine.sync_status(), SyncStatus::Conflicted);
        let conflicts = engine.conflicts();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].local.content, "local v4");
        assert_eq!(
            conflicts[0].remote.content.as_deref(),
            Some("# T\nremote v3")
        );
        // the local version remains the visible one
        assert_eq!(engine.notes()[0].content, "local v4");
    }

    #[test]
    fn test_conflict_detected_on_fetch() {
        let (mut engine, store, _) = engine();
        let note = block_on(engine.create_note("T", "v1", None)).unwrap();

        // go offline, edit locally, remote changes independently
        engine.monitor().set_online(false);
        block_on(engine.update_note(&note.id, "# T\nlocal edit", None)).unwrap();
        store.seed(&engine.notes()[0].path.clone(), "# T\nremote edit");

        engine.monitor().set_online(true);
        block_on(engine.fetch_all());

        assert_eq!(engine.sync_status(), SyncStatus::Conflicted);
        assert_eq!(engine.notes()[0].content, "local edit");
    }

    #[test]
    fn test_resolve_keep_local_overwrites_remote() {
        let (mut engine, store, _) = engine();
        let note = block_on(engine.create_note("T", "v1", None)).unwrap();
        let path = note.path.clone();
        engine.monitor().set_online(false);
        block_on(engine.update_note(&note.id, "# T\nmine", None)).unwrap();
        store.seed(&path, "# T\ntheirs");
        engine.monitor().set_online(true);
        block_on(engine.sync_notes());
        assert_eq!(engine.sync_status(), SyncStatus::Conflicted);

        let id = engine.notes()[0].id.clone();
        let resolved =
            block_on(engine.resolve_conflict(&id, ConflictResolution::KeepLocal)).unwrap();
        assert!(resolved.synced);
        assert_eq!(resolved.content, "mine");
        assert_eq!(engine.sync_status(), SyncStatus::Synced);

        let remote = block_on(store.read_file(&path)).unwrap();
        assert_eq!(remote.content, "# T\nmine");
    }

    #[test]
    fn test_resolve_keep_remote_discards_local() {
        let (mut engine, store, _) = engine();
        let note = block_on(engine.create_note("T", "v1", None)).unwrap();
        let path = note.path.clone();
        engine.monitor().set_online(false);
        block_on(engine.update_note(&note.id, "# T\nmine", None)).unwrap();
        store.seed(&path, "# T\ntheirs");
        engine.monitor().set_online(true);
        block_on(engine.sync_notes());

        let id = engine.notes()[0].id.clone();
        let resolved =
            block_on(engine.resolve_conflict(&id, ConflictResolution::KeepRemote)).unwrap();
        assert!(resolved.synced);
        assert_eq!(resolved.content, "theirs");
        assert_eq!(engine.sync_status(), SyncStatus::Synced);
    }

    #[test]
    fn test_remote_deletion_drops_clean_note_only() {
        let (mut engine, store, _) = engine();
        store.seed("note_1.md", "# A\nbody");
        block_on(engine.fetch_all());
        engine.monitor().set_online(false);
        let draft = block_on(engine.create_note("Draft", "pending", None)).unwrap();
        engine.monitor().set_online(true);

        // the remote file disappears
        store.seed("note_1.md", "");
        let sha = store.sha_of("note_1.md").unwrap();
        block_on(store.delete_file("note_1.md", &sha)).unwrap();

        block_on(engine.fetch_all());

        let paths: Vec<&str> = engine.notes().iter().map(|n| n.path.as_str()).collect();
        assert_eq!(paths, vec![draft.path.as_str()]);
    }

    #[test]
    fn test_move_note_changes_path_and_remote() {
        let (mut engine, store, _) = engine();
        let note = block_on(engine.create_note("T", "body", None)).unwrap();
        let old_path = note.path.clone();

        let moved = block_on(engine.update_note(&note.id, "# T\nbody", Some("work"))).unwrap();
        assert_eq!(moved.folder.as_deref(), Some("work"));
        assert!(moved.path.starts_with("work/"));
        assert!(moved.path.ends_with(old_path.as_str()));
        assert!(moved.synced);

        assert!(!store.contains(&old_path));
        assert!(store.contains(&moved.path));
    }

    #[test]
    fn test_offline_move_settles_on_sync() {
        let (mut engine, store, _) = engine();
        let note = block_on(engine.create_note("T", "body", None)).unwrap();
        let old_path = note.path.clone();

        engine.monitor().set_online(false);
        let moved = block_on(engine.update_note(&note.id, "# T\nbody", Some("work"))).unwrap();
        assert!(!moved.synced);
        assert!(store.contains(&old_path)); // nothing touched remotely yet

        engine.monitor().set_online(true);
        block_on(engine.sync_notes());

        assert!(!store.contains(&old_path));
        assert!(store.contains(&moved.path));
        assert_eq!(engine.sync_status(), SyncStatus::Synced);
    }

    #[test]
    fn test_delete_note_is_tombstoned_offline() {
        let (mut engine, store, _) = engine();
        let note = block_on(engine.create_note("T", "body", None)).unwrap();
        let path = note.path.clone();

        engine.monitor().set_online(false);
        block_on(engine.delete_note(&note.id));
        assert!(engine.notes().is_empty());
        assert!(store.contains(&path));
        assert_eq!(engine.sync_status(), SyncStatus::Offline);

        engine.monitor().set_online(true);
        block_on(engine.sync_notes());
        assert!(!store.contains(&path));
        assert_eq!(engine.sync_status(), SyncStatus::Synced);
    }

    #[test]
    fn test_delete_folder_leaves_no_members_even_on_remote_failure() {
        let (mut engine, store, _) = engine();
        block_on(engine.create_folder("work")).unwrap();
        let a = block_on(engine.create_note("A", "body", Some("work"))).unwrap();
        block_on(engine.create_note("B", "body", Some("work"))).unwrap();

        // another writer moves one member forward; its deletion will conflict
        store.seed(&a.path, "# A\nchanged elsewhere");

        block_on(engine.delete_folder("work"));

        assert!(engine.folders().is_empty());
        assert!(
            engine.notes().iter().all(|n| n.folder.as_deref() != Some("work")),
            "no member may survive locally"
        );
        assert!(engine.notes().is_empty());
        // the conflicted remote copy survives remotely; local intent stands
        assert!(store.contains(&a.path));
    }

    #[test]
    fn test_create_folder_writes_marker() {
        let (mut engine, store, _) = engine();
        let folder = block_on(engine.create_folder("work")).unwrap();
        assert!(folder.synced);
        assert!(store.contains("work/.gitkeep"));

        // invalid names are a no-op
        assert!(block_on(engine.create_folder("a/b")).is_none());
    }

    #[test]
    fn test_cache_restores_optimistic_edits() {
        let (mut engine, store, cache) = engine();
        engine.monitor().set_online(false);
        block_on(engine.create_note("Draft", "offline body", None)).unwrap();
        engine.monitor().set_online(true);
        drop(engine);

        // a restart hydrates from the cache and the pending push survives
        let monitor = Arc::new(ConnectivityMonitor::new());
        let mut engine = SyncEngine::new(Arc::clone(&store), cache, monitor);
        assert_eq!(engine.notes().len(), 1);
        assert_eq!(engine.sync_status(), SyncStatus::Pending);

        block_on(engine.sync_notes());
        assert_eq!(store.len(), 1);
        assert_eq!(engine.sync_status(), SyncStatus::Synced);
    }

    #[test]
    fn test_current_note_follows_id_changes() {
        let (mut engine, _, _) = engine();
        engine.monitor().set_online(false);
        let note = block_on(engine.create_note("T", "body", None)).unwrap();
        engine.set_current_note(Some(&note.id));
        engine.monitor().set_online(true);

        block_on(engine.sync_notes());

        let current = engine.current_note().expect("current note should survive sync");
        assert_ne!(current.id, note.id); // id moved to the remote hash
        assert_eq!(current.title, "T");
    }

    #[test]
    fn test_operations_without_match_are_noops() {
        let (mut engine, _, _) = engine();
        assert!(block_on(engine.update_note("missing", "x", None)).is_none());
        block_on(engine.delete_note("missing"));
        block_on(engine.delete_folder("missing"));
        assert!(
            block_on(engine.resolve_conflict("missing", ConflictResolution::KeepLocal)).is_none()
        );
    }
}
