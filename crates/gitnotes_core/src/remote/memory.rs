//! In-memory remote store for tests and offline development.
//!
//! Implements the same compare-and-swap semantics as the real contents API,
//! plus an `offline` switch for simulating lost connectivity.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{
    BoxFuture, FOLDER_MARKER, LEGACY_FOLDER_MARKER, RemoteContent, RemoteContentStore, RemoteFile,
    compute_content_hash, is_note_file,
};
use crate::error::{Result, SyncError};

struct StoredFile {
    content: String,
    sha: String,
}

/// An in-process [`RemoteContentStore`] backed by a hash map.
pub struct InMemoryStore {
    files: Mutex<HashMap<String, StoredFile>>,
    offline: AtomicBool,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            offline: AtomicBool::new(false),
        }
    }

    /// Simulate losing (or regaining) the network. While offline every
    /// operation fails with `NetworkUnavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Seed a file directly, bypassing compare-and-swap. Returns its hash.
    /// Stands in for another device or a direct repository edit.
    pub fn seed(&self, path: &str, content: &str) -> String {
        let sha = compute_content_hash(content.as_bytes());
        let mut files = self.files.lock().unwrap();
        files.insert(
            path.to_string(),
            StoredFile {
                content: content.to_string(),
                sha: sha.clone(),
            },
        );
        sha
    }

    /// Current hash of a stored file.
    pub fn sha_of(&self, path: &str) -> Option<String> {
        let files = self.files.lock().unwrap();
        files.get(path).map(|f| f.sha.clone())
    }

    /// Whether a file exists.
    pub fn contains(&self, path: &str) -> bool {
        let files = self.files.lock().unwrap();
        files.contains_key(path)
    }

    /// Number of stored files.
    pub fn len(&self) -> usize {
        let files = self.files.lock().unwrap();
        files.len()
    }

    /// True when the store holds no files.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(SyncError::NetworkUnavailable)
        } else {
            Ok(())
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteContentStore for InMemoryStore {
    fn provider_id(&self) -> String {
        "memory:test".to_string()
    }

    fn list_note_files(&self) -> BoxFuture<'_, Result<Vec<RemoteFile>>> {
        Box::pin(async move {
            self.check_online()?;
            let files = self.files.lock().unwrap();
            let mut listed: Vec<RemoteFile> = files
                .iter()
                .filter(|(path, _)| {
                    let name = path.rsplit('/').next().unwrap_or(path);
                    is_note_file(name)
                })
                .map(|(path, file)| RemoteFile {
                    path: path.clone(),
                    sha: file.sha.clone(),
                })
                .collect();
            listed.sort_by(|a, b| a.path.cmp(&b.path));
            Ok(listed)
        })
    }

    fn list_folders(&self) -> BoxFuture<'_, Result<Vec<String>>> {
        Box::pin(async move {
            self.check_online()?;
            let files = self.files.lock().unwrap();
            let mut folders: Vec<String> = files
                .keys()
                .filter_map(|path| path.split_once('/').map(|(dir, _)| dir.to_string()))
                .collect();
            folders.sort();
            folders.dedup();
            Ok(folders)
        })
    }

    fn read_file<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<RemoteContent>> {
        Box::pin(async move {
            self.check_online()?;
            let files = self.files.lock().unwrap();
            match files.get(path) {
                Some(file) => Ok(RemoteContent {
                    content: file.content.clone(),
                    sha: file.sha.clone(),
                }),
                None => Err(SyncError::NotFound(path.to_string())),
            }
        })
    }

    fn write_file<'a>(
        &'a self,
        path: &'a str,
        content: &'a str,
        expected_sha: Option<&'a str>,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            self.check_online()?;
            let mut files = self.files.lock().unwrap();
            match (expected_sha, files.get(path)) {
                // pure create against an existing file
                (None, Some(_)) => return Err(SyncError::Conflict(path.to_string())),
                // conditional update whose base diverged (or vanished)
                (Some(expected), Some(existing)) if existing.sha != expected => {
                    return Err(SyncError::Conflict(path.to_string()));
                }
                (Some(_), None) => return Err(SyncError::Conflict(path.to_string())),
                _ => {}
            }
            let sha = compute_content_hash(content.as_bytes());
            files.insert(
                path.to_string(),
                StoredFile {
                    content: content.to_string(),
                    sha: sha.clone(),
                },
            );
            Ok(sha)
        })
    }

    fn delete_file<'a>(
        &'a self,
        path: &'a str,
        expected_sha: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.check_online()?;
            let mut files = self.files.lock().unwrap();
            match files.get(path) {
                None => Err(SyncError::NotFound(path.to_string())),
                Some(existing) if existing.sha != expected_sha => {
                    Err(SyncError::Conflict(path.to_string()))
                }
                Some(_) => {
                    files.remove(path);
                    Ok(())
                }
            }
        })
    }

    fn create_folder_marker<'a>(&'a self, folder: &'a str) -> BoxFuture<'a, Result<String>> {
        let path = format!("{}/{}", folder, FOLDER_MARKER);
        Box::pin(async move { self.write_file(&path, "", None).await })
    }

    fn delete_folder_marker<'a>(&'a self, folder: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.check_online()?;
            let mut files = self.files.lock().unwrap();
            files.remove(&format!("{}/{}", folder, FOLDER_MARKER));
            files.remove(&format!("{}/{}", folder, LEGACY_FOLDER_MARKER));
            Ok(())
        })
    }
}
