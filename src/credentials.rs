//! Saved service credentials.
//!
//! A token is persisted once per machine and loaded by authenticators on
//! every run. The default location is
//! `<config dir>/hal-dispatch/credentials.json`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DispatchError, DispatchResult};

/// A saved API token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// API token.
    pub token: String,
    /// Service endpoint, if not the provider default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// When the token was saved.
    pub saved_at: DateTime<Utc>,
}

impl Credentials {
    /// Credentials for `token`, stamped now.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            url: None,
            saved_at: Utc::now(),
        }
    }

    /// Set a non-default endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// File-backed credential storage.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store at an explicit path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/hal-dispatch/credentials.json`, if the platform has a
    /// config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("hal-dispatch").join("credentials.json"))
    }

    /// Store at [`default_path`](Self::default_path).
    pub fn at_default_location() -> DispatchResult<Self> {
        Self::default_path().map(Self::new).ok_or_else(|| {
            DispatchError::Configuration("no user config directory on this platform".into())
        })
    }

    /// Location of the credential file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist `credentials`.
    ///
    /// Refuses to replace an existing file unless `overwrite` is set.
    pub fn save(&self, credentials: &Credentials, overwrite: bool) -> DispatchResult<()> {
        if self.path.exists() && !overwrite {
            return Err(DispatchError::Configuration(format!(
                "credentials already saved at {}; pass overwrite to replace them",
                self.path.display()
            )));
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(credentials)?)?;
        debug!(path = %self.path.display(), "credentials saved");
        Ok(())
    }

    /// Load saved credentials; `None` if nothing was saved.
    pub fn load(&self) -> DispatchResult<Option<Credentials>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&self.path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Remove saved credentials. Returns whether a file was removed.
    pub fn delete(&self) -> DispatchResult<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path)?;
        Ok(true)
    }
}
