//! Durable per-device cache of the last-known note/folder set.
//!
//! The cache exists purely so a reload never loses an optimistic local edit;
//! it is scoped per device and repository and is not a sync transport.
//! Loading tolerates missing or corrupt data by treating it as empty.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::auth::RepoSelection;
use crate::note::{Folder, Note};
use crate::remote::RemoteFile;
use crate::sync::NoteState;

/// A note together with its persisted reconciliation bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRecord {
    /// The note itself
    pub note: Note,
    /// Reconciliation state at save time
    pub state: NoteState,
    /// Hash of the last fetched/written remote version, when any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_sha: Option<String>,
    /// Old remote copy still awaiting deletion after a folder move
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_move: Option<RemoteFile>,
}

/// The single serialized record a device keeps between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CachedState {
    /// All tracked notes
    pub notes: Vec<NoteRecord>,
    /// All tracked folders
    pub folders: Vec<Folder>,
    /// Id of the currently open note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_note_id: Option<String>,
    /// Remote deletions queued while offline
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending_deletes: Vec<RemoteFile>,
}

/// Durable key-value store for the engine's state.
pub trait LocalCache: Send + Sync {
    /// Load the last persisted state. Missing or corrupt data is treated as
    /// an empty state, never an error.
    fn load(&self) -> CachedState;

    /// Persist the given state, replacing whatever was stored before.
    fn save(&self, state: &CachedState) -> io::Result<()>;
}

impl<T: LocalCache + ?Sized> LocalCache for Arc<T> {
    fn load(&self) -> CachedState {
        (**self).load()
    }

    fn save(&self, state: &CachedState) -> io::Result<()> {
        (**self).save(state)
    }
}

/// File-backed cache: one JSON document per device and repository.
pub struct JsonFileCache {
    path: PathBuf,
}

impl JsonFileCache {
    /// Cache backed by an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache scoped to a repository, under the platform data directory
    /// (e.g. `~/.local/share/gitnotes/alice__notes__main.json`).
    pub fn for_repo(repo: &RepoSelection) -> Self {
        let dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gitnotes");
        let file = format!("{}__{}__{}.json", repo.owner, repo.name, repo.branch);
        Self::new(dir.join(file))
    }

    /// Where this cache persists its state.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LocalCache for JsonFileCache {
    fn load(&self) -> CachedState {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return CachedState::default(),
        };
        match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(err) => {
                log::warn!(
                    "discarding corrupt cache at '{}': {}",
                    self.path.display(),
                    err
                );
                CachedState::default()
            }
        }
    }

    fn save(&self, state: &CachedState) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(state).map_err(io::Error::other)?;
        std::fs::write(&self.path, json)
    }
}

/// In-process cache for tests.
pub struct InMemoryCache {
    slot: Mutex<Option<CachedState>>,
}

impl InMemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Whether anything has been saved yet.
    pub fn is_populated(&self) -> bool {
        self.slot.lock().unwrap().is_some()
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalCache for InMemoryCache {
    fn load(&self) -> CachedState {
        self.slot.lock().unwrap().clone().unwrap_or_default()
    }

    fn save(&self, state: &CachedState) -> io::Result<()> {
        *self.slot.lock().unwrap() = Some(state.clone());
        Ok(())
    }
}
