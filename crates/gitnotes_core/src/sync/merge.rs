//! Pure merge of fetched remote state into the tracked note set.
//!
//! `fetch_all` reduces to this function so the merge rules are testable
//! without any network. It is a three-way merge keyed by path: the base is
//! each note's last-known remote hash, the two sides are the local note and
//! the fetched remote file.

use indexmap::IndexMap;

use super::{NoteState, RemoteVersion, TrackedNote};
use crate::note::Note;

/// A remote note file after fetch: path, hash, raw serialized markdown.
#[derive(Debug, Clone)]
pub struct FetchedNote {
    /// Path relative to the repository root
    pub path: String,
    /// Content hash at fetch time
    pub sha: String,
    /// Raw file content (`# title` heading included)
    pub raw: String,
}

/// What a merge changed, for logging and status derivation.
#[derive(Debug, Default)]
pub struct MergeOutcome {
    /// Paths newly added from remote
    pub added: Vec<String>,
    /// Paths dropped because they were deleted remotely
    pub removed: Vec<String>,
    /// Paths that transitioned to `Conflicted` during this merge
    pub conflicts: Vec<String>,
}

/// Merge a full remote listing into the local set.
///
/// Rules, per path:
/// - remote-only: added as clean (remote is authoritative when nothing local
///   is pending);
/// - local clean: replaced by the fetched version when the hash moved;
/// - local dirty (or already conflicted): retained and kept visible. When
///   the remote hash still equals the note's base the edit is simply
///   pending; when the remote moved but its content equals the local edit
///   the note becomes clean at the new hash; otherwise the note is flagged
///   conflicted with the fetched version attached;
/// - local-only: dropped when clean (deleted remotely), retained while
///   unsynced (not yet pushed).
pub fn merge_fetched(
    notes: &mut IndexMap<String, TrackedNote>,
    fetched: Vec<FetchedNote>,
) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();
    let mut seen = std::collections::HashSet::with_capacity(fetched.len());

    for file in fetched {
        seen.insert(file.path.clone());
        match notes.get_mut(&file.path) {
            None => {
                let note = Note::from_remote(&file.path, &file.sha, &file.raw);
                outcome.added.push(file.path.clone());
                notes.insert(file.path.clone(), TrackedNote::clean(note, file.sha));
            }
            Some(tracked) => {
                let unchanged = tracked.remote_sha.as_deref() == Some(file.sha.as_str());
                match tracked.state {
                    NoteState::Clean => {
                        if !unchanged {
                            tracked.note = Note::from_remote(&file.path, &file.sha, &file.raw);
                            tracked.remote_sha = Some(file.sha);
                        }
                    }
                    NoteState::Dirty | NoteState::Writing | NoteState::Conflicted => {
                        if unchanged {
                            // remote did not move; the local edit is merely pending
                            continue;
                        }
                        let remote_note = Note::from_remote(&file.path, &file.sha, &file.raw);
                        if remote_note.title == tracked.note.title
                            && remote_note.content == tracked.note.content
                        {
                            // both sides ended up with the same content
                            tracked.mark_clean(file.sha);
                        } else {
                            tracked.mark_conflicted(RemoteVersion {
                                sha: file.sha.clone(),
                                content: Some(file.raw),
                            });
                            outcome.conflicts.push(file.path.clone());
                        }
                    }
                }
            }
        }
    }

    // Local notes absent remotely: a clean one was deleted on the remote
    // side, an unsynced one just hasn't been pushed yet.
    let removed: Vec<String> = notes
        .iter()
        .filter(|(path, tracked)| {
            !seen.contains(path.as_str()) && tracked.state == NoteState::Clean
        })
        .map(|(path, _)| path.clone())
        .collect();
    for path in &removed {
        notes.shift_remove(path);
    }
    outcome.removed = removed;

    outcome
}
