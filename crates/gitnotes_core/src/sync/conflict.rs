//! Conflict surfacing and resolution.
//!
//! When a locally edited note and its remote counterpart diverge, the engine
//! keeps the local version visible, exposes the pair as a [`NoteConflict`],
//! and waits for an explicit [`ConflictResolution`]. Content is never merged
//! automatically.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::RemoteVersion;
use crate::note::Note;

/// A conflicting local/remote pair surfaced to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct NoteConflict {
    /// Remote path both versions share
    pub path: String,
    /// The local, still-visible version
    pub local: Note,
    /// The diverged remote version
    pub remote: RemoteVersion,
}

/// How to settle a conflicted note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    /// Keep the local version: force-write it over the remote head.
    KeepLocal,
    /// Discard the local edit and adopt the remote version.
    KeepRemote,
}

impl FromStr for ConflictResolution {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "keep_local" | "keep-local" | "mine" => Ok(ConflictResolution::KeepLocal),
            "remote" | "keep_remote" | "keep-remote" | "theirs" => {
                Ok(ConflictResolution::KeepRemote)
            }
            _ => Err(()),
        }
    }
}

impl ConflictResolution {
    /// Check if this resolution keeps the local version
    pub fn keeps_local(&self) -> bool {
        matches!(self, ConflictResolution::KeepLocal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_from_str() {
        assert!(matches!(
            ConflictResolution::from_str("local"),
            Ok(ConflictResolution::KeepLocal)
        ));
        assert!(matches!(
            ConflictResolution::from_str("MINE"),
            Ok(ConflictResolution::KeepLocal)
        ));
        assert!(matches!(
            ConflictResolution::from_str("keep-remote"),
            Ok(ConflictResolution::KeepRemote)
        ));
        assert!(matches!(
            ConflictResolution::from_str("theirs"),
            Ok(ConflictResolution::KeepRemote)
        ));
        assert!(ConflictResolution::from_str("merge").is_err());
    }

    #[test]
    fn test_keeps_local() {
        assert!(ConflictResolution::KeepLocal.keeps_local());
        assert!(!ConflictResolution::KeepRemote.keeps_local());
    }
}
