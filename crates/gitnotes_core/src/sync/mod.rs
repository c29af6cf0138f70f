//! Reconciliation engine for local-first note synchronization.
//!
//! Keeps three views consistent: the durable local cache, the in-memory
//! note/folder set observed by the presentation layer, and the remote store.
//!
//! # Architecture
//!
//! ```text
//! Presentation layer (CLI / UI)
//!         ↑↓
//!    Public API façade (app::GitNotes)
//!         ↑↓
//!    SyncEngine  ←→  LocalCache (durable mirror)
//!         ↑↓
//!    RemoteContentStore (GitHub contents API)
//! ```
//!
//! # Key components
//!
//! - [`SyncEngine`] - orchestrates every operation and mirrors each mutation
//!   to the cache
//! - [`merge_fetched`] - the pure three-way merge behind `fetch_all`
//! - [`NoteConflict`] / [`ConflictResolution`] - conflicts surfaced to the
//!   caller and the two ways to settle them
//!
//! Local edits are never discarded automatically: a fetched remote note only
//! replaces a local one while the local note is clean, and any divergence
//! while dirty becomes a visible conflicted state requiring explicit
//! resolution.

pub mod conflict;
pub mod engine;
mod merge;

pub use conflict::{ConflictResolution, NoteConflict};
pub use engine::SyncEngine;
pub use merge::{FetchedNote, MergeOutcome, merge_fetched};

use serde::{Deserialize, Serialize};

use crate::note::Note;
use crate::remote::RemoteFile;

/// Reconciliation state of a single note relative to the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteState {
    /// Content identical to the last fetched remote version
    Clean,
    /// Local edit pending a remote write
    Dirty,
    /// A remote write is in flight
    Writing,
    /// A concurrent remote change was detected while a local edit was pending
    Conflicted,
}

/// Process-wide sync status, always derived from connectivity, outstanding
/// unsynced notes and detected conflicts; never set arbitrarily.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Everything known to match the remote store
    Synced,
    /// Unsynced local changes are waiting for a push
    Pending,
    /// At least one note needs explicit conflict resolution
    Conflicted,
    /// The device is offline; local edits queue up
    Offline,
}

/// The remote side of a detected conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteVersion {
    /// Content hash of the diverged remote version
    pub sha: String,
    /// Its raw serialized content, when it could be read
    pub content: Option<String>,
}

/// A note plus its in-memory reconciliation bookkeeping.
#[derive(Debug, Clone)]
pub struct TrackedNote {
    /// The note as the presentation layer sees it
    pub note: Note,
    /// Current reconciliation state
    pub state: NoteState,
    /// Hash of the last fetched/written remote version; `None` until the
    /// first successful write (a pure create)
    pub remote_sha: Option<String>,
    /// Old remote copy still awaiting deletion after a folder move
    pub pending_move: Option<RemoteFile>,
    /// Remote side of the conflicting pair while conflicted
    pub conflict: Option<RemoteVersion>,
}

impl TrackedNote {
    /// Track a freshly created local note.
    pub fn local(note: Note) -> Self {
        Self {
            note,
            state: NoteState::Dirty,
            remote_sha: None,
            pending_move: None,
            conflict: None,
        }
    }

    /// Track a note fetched from the remote store.
    pub fn clean(note: Note, sha: String) -> Self {
        Self {
            note,
            state: NoteState::Clean,
            remote_sha: Some(sha),
            pending_move: None,
            conflict: None,
        }
    }

    /// Record a successful remote write: the returned hash becomes the
    /// note's id and compare-and-swap base.
    pub fn mark_clean(&mut self, sha: String) {
        self.note.id = sha.clone();
        self.note.synced = true;
        self.remote_sha = Some(sha);
        self.state = NoteState::Clean;
        self.conflict = None;
    }

    /// Record a local edit. A conflicted note stays conflicted; the
    /// divergence is still unresolved.
    pub fn mark_dirty(&mut self) {
        self.note.synced = false;
        if self.state != NoteState::Conflicted {
            self.state = NoteState::Dirty;
        }
    }

    /// Record a detected divergence, keeping the local version visible.
    pub fn mark_conflicted(&mut self, remote: RemoteVersion) {
        self.note.synced = false;
        self.state = NoteState::Conflicted;
        self.conflict = Some(remote);
    }
}
