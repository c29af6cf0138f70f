//! GitHub repository contents adapter.
//!
//! Talks to the GitHub contents API (`/repos/{owner}/{repo}/contents/...`).
//! Every mutation carries the last-known blob `sha` as a compare-and-swap
//! token; GitHub answers 409/422 when the remote head diverged, which maps
//! to [`SyncError::Conflict`].

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;

use super::{
    BoxFuture, FOLDER_MARKER, LEGACY_FOLDER_MARKER, RemoteContent, RemoteContentStore, RemoteFile,
    is_note_file,
};
use crate::auth::{RepoSelection, Session};
use crate::error::{Result, SyncError};

const API_ROOT: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("gitnotes/", env!("CARGO_PKG_VERSION"));

/// [`RemoteContentStore`] implementation over the GitHub contents API.
pub struct GitHubStore {
    client: reqwest::Client,
    token: String,
    repo: RepoSelection,
}

#[derive(Debug, Deserialize)]
struct ContentsEntry {
    name: String,
    path: String,
    sha: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct FileResponse {
    content: Option<String>,
    sha: String,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    content: WrittenBlob,
}

#[derive(Debug, Deserialize)]
struct WrittenBlob {
    sha: String,
}

impl GitHubStore {
    /// Create a store for one repository, borrowing the session's token.
    pub fn new(session: &Session, repo: RepoSelection) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: session.access_token.clone(),
            repo,
        }
    }

    /// The repository this store targets.
    pub fn repo(&self) -> &RepoSelection {
        &self.repo
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            API_ROOT, self.repo.owner, self.repo.name, path
        )
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
    }

    async fn error_for(&self, path: &str, response: reqwest::Response) -> SyncError {
        let status = response.status().as_u16();
        match status {
            401 | 403 => SyncError::Unauthorized,
            404 => SyncError::NotFound(path.to_string()),
            409 | 422 => SyncError::Conflict(path.to_string()),
            _ => SyncError::Remote {
                status,
                message: response.text().await.unwrap_or_default(),
            },
        }
    }

    async fn list_dir(&self, dir: &str) -> Result<Vec<ContentsEntry>> {
        let response = self
            .request(reqwest::Method::GET, &self.contents_url(dir))
            .query(&[("ref", self.repo.branch.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            // an empty repository answers 404 for its root listing
            if dir.is_empty() && response.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(Vec::new());
            }
            return Err(self.error_for(dir, response).await);
        }
        Ok(response.json().await?)
    }

    fn walk(&self, dir: String) -> BoxFuture<'_, Result<Vec<RemoteFile>>> {
        Box::pin(async move {
            let mut files = Vec::new();
            for entry in self.list_dir(&dir).await? {
                match entry.kind.as_str() {
                    "dir" => files.extend(self.walk(entry.path).await?),
                    "file" if is_note_file(&entry.name) => files.push(RemoteFile {
                        path: entry.path,
                        sha: entry.sha,
                    }),
                    _ => {}
                }
            }
            Ok(files)
        })
    }

    async fn get_file(&self, path: &str) -> Result<RemoteContent> {
        let response = self
            .request(reqwest::Method::GET, &self.contents_url(path))
            .query(&[("ref", self.repo.branch.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.error_for(path, response).await);
        }
        let file: FileResponse = response.json().await?;

        // GitHub wraps base64 payloads across lines
        let encoded: String = file
            .content
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let bytes = BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| SyncError::InvalidContent {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        let content = String::from_utf8(bytes).map_err(|_| SyncError::InvalidContent {
            path: path.to_string(),
            reason: "not valid UTF-8".to_string(),
        })?;

        Ok(RemoteContent {
            content,
            sha: file.sha,
        })
    }

    async fn put_file(
        &self,
        path: &str,
        content: &str,
        expected_sha: Option<&str>,
    ) -> Result<String> {
        let message = match expected_sha {
            Some(_) => format!("Update {}", path),
            None => format!("Create {}", path),
        };
        let mut body = serde_json::json!({
            "message": message,
            "content": BASE64.encode(content.as_bytes()),
            "branch": self.repo.branch,
        });
        if let Some(sha) = expected_sha {
            body["sha"] = serde_json::Value::String(sha.to_string());
        }

        let response = self
            .request(reqwest::Method::PUT, &self.contents_url(path))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.error_for(path, response).await);
        }
        let written: WriteResponse = response.json().await?;
        Ok(written.content.sha)
    }

    async fn remove_file(&self, path: &str, expected_sha: &str) -> Result<()> {
        let body = serde_json::json!({
            "message": format!("Delete {}", path),
            "sha": expected_sha,
            "branch": self.repo.branch,
        });

        let response = self
            .request(reqwest::Method::DELETE, &self.contents_url(path))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.error_for(path, response).await);
        }
        Ok(())
    }
}

impl RemoteContentStore for GitHubStore {
    fn provider_id(&self) -> String {
        format!("github:{}", self.repo)
    }

    fn list_note_files(&self) -> BoxFuture<'_, Result<Vec<RemoteFile>>> {
        self.walk(String::new())
    }

    fn list_folders(&self) -> BoxFuture<'_, Result<Vec<String>>> {
        Box::pin(async move {
            let mut folders: Vec<String> = self
                .list_dir("")
                .await?
                .into_iter()
                .filter(|entry| entry.kind == "dir")
                .map(|entry| entry.name)
                .collect();
            folders.sort();
            Ok(folders)
        })
    }

    fn read_file<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<RemoteContent>> {
        Box::pin(self.get_file(path))
    }

    fn write_file<'a>(
        &'a self,
        path: &'a str,
        content: &'a str,
        expected_sha: Option<&'a str>,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.put_file(path, content, expected_sha))
    }

    fn delete_file<'a>(
        &'a self,
        path: &'a str,
        expected_sha: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.remove_file(path, expected_sha))
    }

    fn create_folder_marker<'a>(&'a self, folder: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let path = format!("{}/{}", folder, FOLDER_MARKER);
            self.put_file(&path, "", None).await
        })
    }

    fn delete_folder_marker<'a>(&'a self, folder: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            // either marker form may be present; remove whichever exists
            for marker in [FOLDER_MARKER, LEGACY_FOLDER_MARKER] {
                let path = format!("{}/{}", folder, marker);
                match self.get_file(&path).await {
                    Ok(existing) => self.remove_file(&path, &existing.sha).await?,
                    Err(SyncError::NotFound(_)) => {}
                    Err(err) => return Err(err),
                }
            }
            Ok(())
        })
    }
}
