use thiserror::Error;

/// Unified error type for remote store and sync operations.
///
/// Every failure mode a remote operation can produce maps onto one of these
/// variants. The reconciliation engine catches them at operation boundaries
/// and folds them into per-note state; callers of the public API never see a
/// raised error for an expected failure.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The access token was rejected by the remote store.
    /// Requires re-authentication; never retried.
    #[error("access token rejected by the remote store")]
    Unauthorized,

    /// The path no longer exists remotely. Treated as a remote deletion.
    #[error("remote file not found: '{0}'")]
    NotFound(String),

    /// The remote content hash diverged from the expected one. The affected
    /// note routes to the conflicted state; the write is never retried blindly.
    #[error("remote content changed since last read: '{0}'")]
    Conflict(String),

    /// The remote store could not be reached.
    #[error("network unavailable")]
    NetworkUnavailable,

    /// The remote store answered with an unexpected status.
    #[error("remote store error ({status}): {message}")]
    Remote {
        /// HTTP status code
        status: u16,
        /// Response body, if any
        message: String,
    },

    /// A remote payload could not be decoded (base64 or UTF-8).
    #[error("invalid content for '{path}': {reason}")]
    InvalidContent {
        /// Remote path of the offending file
        path: String,
        /// What failed to decode
        reason: String,
    },

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (local cache or config file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config parse error.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Config serialize error.
    #[error("config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Could not determine a platform config directory.
    #[error("could not determine config directory")]
    NoConfigDir,

    /// Anything else; logged and surfaced as a generic error string.
    #[error("{0}")]
    Unknown(String),
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            SyncError::NetworkUnavailable
        } else {
            SyncError::Unknown(err.to_string())
        }
    }
}

impl SyncError {
    /// True when the failure means the device is (or just went) offline.
    pub fn is_offline(&self) -> bool {
        matches!(self, SyncError::NetworkUnavailable)
    }

    /// True when the failure is a compare-and-swap mismatch.
    pub fn is_conflict(&self) -> bool {
        matches!(self, SyncError::Conflict(_))
    }
}

/// Result type alias for gitnotes operations
pub type Result<T> = std::result::Result<T, SyncError>;
