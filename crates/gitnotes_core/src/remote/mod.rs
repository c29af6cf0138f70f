//! Remote content store abstraction.
//!
//! The remote side of the sync engine is a flat, content-addressed file tree
//! (a GitHub repository accessed through its contents API). This module
//! defines the object-safe [`RemoteContentStore`] trait the reconciliation
//! engine depends on, plus the path classification rules that map the flat
//! tree onto notes and folder markers.
//!
//! All mutations are compare-and-swap keyed on the last-known content hash:
//! the remote store is the source of truth and other writers (other devices,
//! direct repository edits) may race, so a blind overwrite would silently
//! destroy concurrent edits.

mod github;
mod memory;

pub use github::GitHubStore;
pub use memory::InMemoryStore;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::note::NOTE_FILE_PREFIX;

/// A boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Canonical folder marker file name. Folders have no native representation
/// in the remote store; a zero-byte marker at `<folder>/.gitkeep`
/// materializes them.
pub const FOLDER_MARKER: &str = ".gitkeep";

/// Legacy marker name, recognized on read and delete but never created.
pub const LEGACY_FOLDER_MARKER: &str = "README.md";

/// A file in the remote tree: path plus the content hash it was listed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Path relative to the repository root
    pub path: String,
    /// Content hash at listing time (the compare-and-swap token)
    pub sha: String,
}

/// A file's decoded text plus the content hash it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteContent {
    /// Decoded file content
    pub content: String,
    /// Content hash at read time
    pub sha: String,
}

/// Store interface for a repository-backed flat file tree.
///
/// Implemented by [`GitHubStore`] for the real contents API and by
/// [`InMemoryStore`] for tests. All call sites depend on this trait, never
/// on a concrete client.
pub trait RemoteContentStore: Send + Sync {
    /// Unique identifier for this store instance
    /// (e.g. `github:owner/name@main`).
    fn provider_id(&self) -> String;

    /// Recursively list all note files below the repository root.
    ///
    /// A file qualifies as a note when its name ends in `.md`
    /// (case-insensitive) or starts with the reserved `note_` prefix.
    /// Folder markers and the root README are never listed.
    fn list_note_files(&self) -> BoxFuture<'_, Result<Vec<RemoteFile>>>;

    /// List top-level directory names. Folders exist via markers or via
    /// member files; either way they surface as directories here.
    fn list_folders(&self) -> BoxFuture<'_, Result<Vec<String>>>;

    /// Fetch and decode a single file.
    fn read_file<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<RemoteContent>>;

    /// Create (`expected_sha` absent) or conditionally update a file.
    /// Fails with `Conflict` when the remote hash has diverged from
    /// `expected_sha`. Returns the new content hash.
    fn write_file<'a>(
        &'a self,
        path: &'a str,
        content: &'a str,
        expected_sha: Option<&'a str>,
    ) -> BoxFuture<'a, Result<String>>;

    /// Conditionally delete a file. Fails with `Conflict` when the remote
    /// hash has diverged from `expected_sha`.
    fn delete_file<'a>(&'a self, path: &'a str, expected_sha: &'a str)
    -> BoxFuture<'a, Result<()>>;

    /// Materialize a folder by writing its marker file.
    /// Returns the marker's content hash.
    fn create_folder_marker<'a>(&'a self, folder: &'a str) -> BoxFuture<'a, Result<String>>;

    /// Remove a folder's marker file(s), tolerating an already-absent marker.
    fn delete_folder_marker<'a>(&'a self, folder: &'a str) -> BoxFuture<'a, Result<()>>;
}

impl<T: RemoteContentStore + ?Sized> RemoteContentStore for Arc<T> {
    fn provider_id(&self) -> String {
        (**self).provider_id()
    }

    fn list_note_files(&self) -> BoxFuture<'_, Result<Vec<RemoteFile>>> {
        (**self).list_note_files()
    }

    fn list_folders(&self) -> BoxFuture<'_, Result<Vec<String>>> {
        (**self).list_folders()
    }

    fn read_file<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<RemoteContent>> {
        (**self).read_file(path)
    }

    fn write_file<'a>(
        &'a self,
        path: &'a str,
        content: &'a str,
        expected_sha: Option<&'a str>,
    ) -> BoxFuture<'a, Result<String>> {
        (**self).write_file(path, content, expected_sha)
    }

    fn delete_file<'a>(
        &'a self,
        path: &'a str,
        expected_sha: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        (**self).delete_file(path, expected_sha)
    }

    fn create_folder_marker<'a>(&'a self, folder: &'a str) -> BoxFuture<'a, Result<String>> {
        (**self).create_folder_marker(folder)
    }

    fn delete_folder_marker<'a>(&'a self, folder: &'a str) -> BoxFuture<'a, Result<()>> {
        (**self).delete_folder_marker(folder)
    }
}

/// True when `name` is a folder marker (or the root README, which is
/// excluded from listings for the same reason).
pub(crate) fn is_folder_marker(name: &str) -> bool {
    name == FOLDER_MARKER || name.eq_ignore_ascii_case(LEGACY_FOLDER_MARKER)
}

/// True when a file with this name should be listed as a note.
pub(crate) fn is_note_file(name: &str) -> bool {
    if is_folder_marker(name) {
        return false;
    }
    name.to_ascii_lowercase().ends_with(".md") || name.starts_with(NOTE_FILE_PREFIX)
}

/// Compute a content hash for stored bytes.
///
/// Used by the in-memory store to mint compare-and-swap tokens with the
/// same shape as real content hashes.
pub fn compute_content_hash(content: &[u8]) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_file_classification() {
        assert!(is_note_file("note_1700000000000.md"));
        assert!(is_note_file("ideas.md"));
        assert!(is_note_file("IDEAS.MD"));
        assert!(is_note_file("note_extensionless"));
        assert!(!is_note_file("photo.png"));
        assert!(!is_note_file(".gitkeep"));
        assert!(!is_note_file("README.md"));
        assert!(!is_note_file("readme.md"));
    }

    #[test]
    fn test_folder_marker_classification() {
        assert!(is_folder_marker(".gitkeep"));
        assert!(is_folder_marker("README.md"));
        assert!(is_folder_marker("Readme.Md"));
        assert!(!is_folder_marker("note_1.md"));
    }

    #[test]
    fn test_compute_content_hash() {
        let hash1 = compute_content_hash(b"hello world");
        let hash2 = compute_content_hash(b"hello world");
        let hash3 = compute_content_hash(b"different content");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
    }
}
