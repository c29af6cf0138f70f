//! Configuration types for GitNotes.
//!
//! Stores the access token and repository selection between runs,
//! persisted as TOML (typically at `~/.config/gitnotes/config.toml`).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::auth::RepoSelection;
use crate::error::{Result, SyncError};

/// User-configurable settings persisted between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// OAuth access token for the remote store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Owner of the selected notes repository
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_owner: Option<String>,

    /// Name of the selected notes repository
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_name: Option<String>,

    /// Branch the notes live on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl Config {
    /// The selected repository, when both owner and name are configured.
    pub fn repo(&self) -> Option<RepoSelection> {
        let owner = self.repo_owner.as_deref()?;
        let name = self.repo_name.as_deref()?;
        let repo = RepoSelection::new(owner, name);
        Some(match &self.branch {
            Some(branch) => repo.with_branch(branch),
            None => repo,
        })
    }

    /// Record a repository selection.
    pub fn set_repo(&mut self, repo: &RepoSelection) {
        self.repo_owner = Some(repo.owner.clone());
        self.repo_name = Some(repo.name.clone());
        self.branch = Some(repo.branch.clone());
    }

    /// Get the config file path (~/.config/gitnotes/config.toml)
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("gitnotes").join("config.toml"))
    }

    /// Load config from the default location, or return default if the file
    /// doesn't exist.
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::config_path()
            && path.exists()
        {
            let contents = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&contents)?;
            return Ok(config);
        }
        Ok(Config::default())
    }

    /// Save config to the default location.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path().ok_or(SyncError::NoConfigDir)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_requires_owner_and_name() {
        let mut config = Config::default();
        assert!(config.repo().is_none());

        config.repo_owner = Some("alice".to_string());
        assert!(config.repo().is_none());

        config.repo_name = Some("notes".to_string());
        let repo = config.repo().unwrap();
        assert_eq!(repo.branch, RepoSelection::DEFAULT_BRANCH);

        config.branch = Some("trunk".to_string());
        assert_eq!(config.repo().unwrap().branch, "trunk");
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = Config::default();
        config.access_token = Some("tok".to_string());
        config.set_repo(&RepoSelection::new("alice", "notes"));

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.access_token.as_deref(), Some("tok"));
        assert_eq!(parsed.repo().unwrap().to_string(), "alice/notes@main");
    }
}
