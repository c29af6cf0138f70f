//! Public sync API façade.
//!
//! [`GitNotes`] is the surface the presentation layer talks to. It owns the
//! session, the connectivity monitor and — once a repository is selected —
//! the reconciliation engine wired to a GitHub store and a per-repository
//! cache. Operations invoked before a repository is selected are no-ops
//! returning `None`; every expected failure is absorbed into the readable
//! status fields.

use std::sync::Arc;

use crate::auth::{RepoSelection, Session};
use crate::cache::JsonFileCache;
use crate::connectivity::ConnectivityMonitor;
use crate::note::{Folder, Note};
use crate::remote::GitHubStore;
use crate::sync::{ConflictResolution, NoteConflict, SyncEngine, SyncStatus};

/// The notes application core: session + repository + engine.
pub struct GitNotes {
    session: Session,
    monitor: Arc<ConnectivityMonitor>,
    repo: Option<RepoSelection>,
    engine: Option<SyncEngine<GitHubStore, JsonFileCache>>,
    loading: bool,
}

impl GitNotes {
    /// Create the façade with a fresh connectivity monitor.
    pub fn new(session: Session) -> Self {
        Self::with_monitor(session, Arc::new(ConnectivityMonitor::new()))
    }

    /// Create the façade observing an externally driven monitor (the host
    /// environment reports online/offline transitions into it).
    pub fn with_monitor(session: Session, monitor: Arc<ConnectivityMonitor>) -> Self {
        monitor.subscribe(Arc::new(|online| {
            log::info!(
                "connectivity changed: {}",
                if online { "online" } else { "offline" }
            );
        }));
        Self {
            session,
            monitor,
            repo: None,
            engine: None,
            loading: false,
        }
    }

    /// Select the repository to sync against. Changing the selection swaps
    /// the engine and its cache scope; the previous note set is gone until
    /// the next fetch.
    pub fn select_repository(&mut self, repo: RepoSelection) {
        if self.repo.as_ref() == Some(&repo) {
            return;
        }
        let store = GitHubStore::new(&self.session, repo.clone());
        let cache = JsonFileCache::for_repo(&repo);
        self.engine = Some(SyncEngine::new(store, cache, Arc::clone(&self.monitor)));
        self.repo = Some(repo);
    }

    /// Refresh the session (e.g. after a token renewal). The engine keeps
    /// its state; only the store credentials are replaced.
    pub fn update_session(&mut self, session: Session) {
        self.session = session;
        if let (Some(repo), Some(engine)) = (self.repo.clone(), self.engine.as_mut()) {
            engine.replace_store(GitHubStore::new(&self.session, repo));
        }
    }

    /// Fetch the remote listing and merge it into the local set.
    pub async fn fetch_notes(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        self.loading = true;
        engine.fetch_all().await;
        self.loading = false;
    }

    /// Create a note; immediately visible, pushed when online.
    pub async fn create_note(
        &mut self,
        title: &str,
        content: &str,
        folder: Option<&str>,
    ) -> Option<Note> {
        self.engine.as_mut()?.create_note(title, content, folder).await
    }

    /// Update a note's content and folder (`None` = repository root).
    pub async fn update_note(
        &mut self,
        id: &str,
        content: &str,
        folder: Option<&str>,
    ) -> Option<Note> {
        self.engine.as_mut()?.update_note(id, content, folder).await
    }

    /// Delete a note locally and best-effort remotely.
    pub async fn delete_note(&mut self, id: &str) {
        if let Some(engine) = self.engine.as_mut() {
            engine.delete_note(id).await;
        }
    }

    /// Create a folder and its remote marker.
    pub async fn create_folder(&mut self, name: &str) -> Option<Folder> {
        self.engine.as_mut()?.create_folder(name).await
    }

    /// Delete a folder with all of its notes.
    pub async fn delete_folder(&mut self, id: &str) {
        if let Some(engine) = self.engine.as_mut() {
            engine.delete_folder(id).await;
        }
    }

    /// Push everything pending to the remote store.
    pub async fn sync_notes(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.sync_notes().await;
        }
    }

    /// Settle a conflicted note.
    pub async fn resolve_conflict(
        &mut self,
        id: &str,
        resolution: ConflictResolution,
    ) -> Option<Note> {
        self.engine.as_mut()?.resolve_conflict(id, resolution).await
    }

    /// Remember which note is open.
    pub fn set_current_note(&mut self, id: Option<&str>) {
        if let Some(engine) = self.engine.as_mut() {
            engine.set_current_note(id);
        }
    }

    // ========================================================================
    // Read accessors
    // ========================================================================

    /// The selected repository, if any.
    pub fn repo(&self) -> Option<&RepoSelection> {
        self.repo.as_ref()
    }

    /// All notes (empty before a repository is selected).
    pub fn notes(&self) -> Vec<&Note> {
        self.engine
            .as_ref()
            .map(|engine| engine.notes())
            .unwrap_or_default()
    }

    /// All folders.
    pub fn folders(&self) -> Vec<&Folder> {
        self.engine
            .as_ref()
            .map(|engine| engine.folders())
            .unwrap_or_default()
    }

    /// Look up a note by id.
    pub fn note(&self, id: &str) -> Option<&Note> {
        self.engine.as_ref()?.note(id)
    }

    /// The currently open note.
    pub fn current_note(&self) -> Option<&Note> {
        self.engine.as_ref()?.current_note()
    }

    /// Every unresolved conflicting pair.
    pub fn conflicts(&self) -> Vec<NoteConflict> {
        self.engine
            .as_ref()
            .map(|engine| engine.conflicts())
            .unwrap_or_default()
    }

    /// Derived process-wide status.
    pub fn sync_status(&self) -> SyncStatus {
        match &self.engine {
            Some(engine) => engine.sync_status(),
            None if !self.monitor.is_online() => SyncStatus::Offline,
            None => SyncStatus::Synced,
        }
    }

    /// Whether a fetch is in flight.
    pub fn loading(&self) -> bool {
        self.loading
    }

    /// Message of the most recent failed operation.
    pub fn last_error(&self) -> Option<&str> {
        self.engine.as_ref()?.last_error()
    }

    /// Current connectivity flag.
    pub fn is_online(&self) -> bool {
        self.monitor.is_online()
    }

    /// Report a connectivity transition from the host environment.
    pub fn set_online(&self, online: bool) {
        self.monitor.set_online(online);
    }

    /// The shared connectivity monitor.
    pub fn monitor(&self) -> Arc<ConnectivityMonitor> {
        Arc::clone(&self.monitor)
    }
}
