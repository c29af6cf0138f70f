//! Identity provider collaborator and session types.
//!
//! The sync engine only ever consumes a valid bearer token wrapped in a
//! [`Session`]; the OAuth code exchange itself belongs to the surrounding
//! application, which calls [`GitHubAuth`] and hands the resulting session
//! in (and refreshes it through the public API's `update_session`). No
//! module-level auth state exists; the session is always passed explicitly.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// The GitHub repository a session syncs against.
///
/// Treated as an immutable key for the lifetime of an engine; changing it
/// swaps the engine and its cache scope and forces a fresh fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSelection {
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub name: String,
    /// Branch the notes live on
    pub branch: String,
}

impl RepoSelection {
    /// Default branch used when none is given.
    pub const DEFAULT_BRANCH: &'static str = "main";

    /// Select a repository on its default branch.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            branch: Self::DEFAULT_BRANCH.to_string(),
        }
    }

    /// Override the branch.
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// Parse an `owner/name` slug.
    pub fn parse(slug: &str) -> Option<Self> {
        let (owner, name) = slug.split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self::new(owner, name))
    }
}

impl fmt::Display for RepoSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.owner, self.name, self.branch)
    }
}

/// The authenticated GitHub user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Numeric GitHub user id
    pub id: u64,
    /// Login name
    pub login: String,
    /// Display name, when set
    #[serde(default)]
    pub name: Option<String>,
    /// Avatar image URL
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// A bearer session: the access token plus, optionally, who it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// OAuth access token presented to the remote store
    pub access_token: String,
    /// Authenticated user, when already resolved
    #[serde(default)]
    pub user: Option<UserProfile>,
}

impl Session {
    /// Wrap a raw access token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            user: None,
        }
    }
}

/// OAuth code-exchange client for the GitHub identity provider.
pub struct GitHubAuth {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl GitHubAuth {
    /// Create a client for one OAuth application.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Exchange an authorization code for a session.
    pub async fn exchange_code(&self, code: &str) -> Result<Session> {
        let response = self
            .client
            .post("https://github.com/login/oauth/access_token")
            .header("Accept", "application/json")
            .json(&serde_json::json!({
                "client_id": self.client_id,
                "client_secret": self.client_secret,
                "code": code,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SyncError::Unauthorized);
        }

        let token: TokenResponse = response.json().await?;
        match token.access_token {
            Some(access_token) => Ok(Session::new(access_token)),
            None => {
                log::warn!(
                    "code exchange rejected: {}",
                    token
                        .error_description
                        .or(token.error)
                        .unwrap_or_else(|| "no error detail".to_string())
                );
                Err(SyncError::Unauthorized)
            }
        }
    }

    /// Resolve the user a session belongs to and attach it.
    pub async fn fetch_authenticated_user(&self, session: &mut Session) -> Result<UserProfile> {
        let response = self
            .client
            .get("https://api.github.com/user")
            .bearer_auth(&session.access_token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", concat!("gitnotes/", env!("CARGO_PKG_VERSION")))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(SyncError::Unauthorized);
        }
        if !status.is_success() {
            return Err(SyncError::Remote {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let user: UserProfile = response.json().await?;
        session.user = Some(user.clone());
        Ok(user)
    }
}
