//! Note and folder domain model.
//!
//! Notes are stored remotely as plain markdown files whose first line is a
//! `# <title>` heading. The heading is synthesized at serialization time and
//! stripped again on read; `content` never contains it. A note's `path` is
//! its location in the remote tree (`note_<epoch-ms>.md`, optionally under a
//! single folder segment) and is unique within a repository snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of generated note file names (`note_<epoch-ms>.md`).
pub const NOTE_FILE_PREFIX: &str = "note_";

/// A single markdown note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Remote content hash once synced; a locally generated id before the
    /// first successful write. Changes on every remote write.
    pub id: String,
    /// Derived from the first heading line of the serialized file, or from
    /// the file name when the file has no heading.
    pub title: String,
    /// Markdown body, excluding the synthesized `# title` line.
    pub content: String,
    /// Slash-separated remote path. The first segment names the owning
    /// folder when the path has more than one segment.
    pub path: String,
    /// Owning folder, consistent with `path`'s directory segment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    /// Timestamp of the last local mutation.
    pub last_modified: DateTime<Utc>,
    /// True only while the local state is known identical to the last
    /// fetched or written remote state.
    pub synced: bool,
}

impl Note {
    /// Create a tentative local note at `path`, not yet written remotely.
    ///
    /// An empty `title` is derived from the content's first heading (or the
    /// file name as a last resort). A leading heading line matching the
    /// title is stripped from `content`; it is re-added at serialization.
    pub fn new_local(title: &str, content: &str, folder: Option<&str>, path: &str) -> Self {
        let title = if title.trim().is_empty() {
            heading_of(content).unwrap_or_else(|| file_stem(path).to_string())
        } else {
            title.trim().to_string()
        };
        let content = strip_title_heading(content, &title);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            content,
            path: path.to_string(),
            folder: folder.map(str::to_string),
            last_modified: Utc::now(),
            synced: false,
        }
    }

    /// Build a note from a fetched remote file.
    pub fn from_remote(path: &str, sha: &str, raw: &str) -> Self {
        let (title, content) = split_title(raw, path);
        Self {
            id: sha.to_string(),
            title,
            content,
            path: path.to_string(),
            folder: folder_of(path),
            last_modified: Utc::now(),
            synced: true,
        }
    }

    /// Serialize for the remote store: `# <title>\n<body>`.
    pub fn to_markdown(&self) -> String {
        format!("# {}\n{}", self.title, self.content)
    }

    /// File name component of `path`.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Apply a content edit: re-derives the title and bumps the timestamp.
    pub fn set_content(&mut self, content: &str) {
        let (title, content) = split_title(content, &self.path);
        self.title = title;
        self.content = content;
        self.last_modified = Utc::now();
        self.synced = false;
    }

    /// Move the note into `folder` (or the repository root when `None`),
    /// recomputing `path` from its file name.
    pub fn set_folder(&mut self, folder: Option<&str>) {
        let name = self.file_name().to_string();
        self.path = match folder {
            Some(f) => format!("{}/{}", f, name),
            None => name,
        };
        self.folder = folder.map(str::to_string);
        self.last_modified = Utc::now();
        self.synced = false;
    }
}

/// A folder of notes.
///
/// The remote store has no native directories; a folder exists by virtue of
/// a marker file (or member files). Member notes are derived from each
/// note's `folder` field, never stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    /// Folder identity. Names are unique within a snapshot, so the name
    /// doubles as the stable id across fetches.
    pub id: String,
    /// Folder name. Never contains `/`.
    pub name: String,
    /// Remote path; equal to `name` for top-level folders.
    pub path: String,
    /// True once the folder's marker file is known to exist remotely.
    #[serde(default)]
    pub synced: bool,
}

impl Folder {
    /// Create a folder that exists only locally so far.
    pub fn new(name: &str) -> Self {
        Self {
            id: name.to_string(),
            name: name.to_string(),
            path: name.to_string(),
            synced: false,
        }
    }

    /// Create a folder observed in the remote tree.
    pub fn remote(name: &str) -> Self {
        Self {
            synced: true,
            ..Self::new(name)
        }
    }

    /// The notes belonging to this folder.
    pub fn notes<'a>(&self, notes: impl IntoIterator<Item = &'a Note>) -> Vec<&'a Note> {
        notes
            .into_iter()
            .filter(|n| n.folder.as_deref() == Some(self.name.as_str()))
            .collect()
    }

    /// Folder names must be non-empty and free of path separators.
    pub fn is_valid_name(name: &str) -> bool {
        !name.is_empty() && !name.contains('/')
    }
}

/// Compute the generated file path for a note created at `epoch_ms`.
pub fn note_path(folder: Option<&str>, epoch_ms: i64) -> String {
    let name = format!("{}{}.md", NOTE_FILE_PREFIX, epoch_ms);
    match folder {
        Some(f) => format!("{}/{}", f, name),
        None => name,
    }
}

/// The owning folder of a remote path: its first segment, when the path has
/// more than one segment.
pub fn folder_of(path: &str) -> Option<String> {
    path.rsplit_once('/').map(|(dir, _)| {
        // only the first segment names the folder, even for deeper paths
        dir.split('/').next().unwrap_or(dir).to_string()
    })
}

/// File name without its `.md` extension.
fn file_stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.strip_suffix(".md")
        .or_else(|| name.strip_suffix(".MD"))
        .unwrap_or(name)
}

/// The title carried by a leading `# ` heading, if any.
fn heading_of(raw: &str) -> Option<String> {
    let first = raw.lines().next()?;
    let title = first.strip_prefix("# ")?.trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

/// Split a serialized note file into `(title, body)`.
///
/// The first line is consumed as the title when it is a `# ` heading;
/// otherwise the title falls back to the file name and the whole input is
/// the body.
pub fn split_title(raw: &str, path: &str) -> (String, String) {
    match heading_of(raw) {
        Some(title) => {
            let body = match raw.split_once('\n') {
                Some((_, rest)) => rest.to_string(),
                None => String::new(),
            };
            (title, body)
        }
        None => (file_stem(path).to_string(), raw.to_string()),
    }
}

/// Drop a leading `# <title>` line when it repeats the given title, so the
/// heading is not stored twice.
fn strip_title_heading(content: &str, title: &str) -> String {
    match content.split_once('\n') {
        Some((first, rest)) if first.trim() == format!("# {}", title) => rest.to_string(),
        None if content.trim() == format!("# {}", title) => String::new(),
        _ => content.to_string(),
    }
}
