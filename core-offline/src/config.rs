//! Cache configuration

use crate::error::{OfflineError, Result};
use core_runtime::config::{CoreConfig, DatabaseLocation, DEFAULT_DATABASE_NAME};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the offline cache manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Database file stem; the store opens `<database_name>.db`
    pub database_name: String,

    /// Directory of the database file, `None` for an in-memory database
    pub database_dir: Option<PathBuf>,

    /// Export target, `None` defers to the platform download directory
    pub export_dir: Option<PathBuf>,

    /// Per-request fetch timeout (default: unbounded)
    pub download_timeout: Option<Duration>,

    /// Namespace segment of issued object URLs
    pub object_url_namespace: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            database_name: DEFAULT_DATABASE_NAME.to_string(),
            database_dir: None,
            export_dir: None,
            download_timeout: None,
            object_url_namespace: "offline".to_string(),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database_name(mut self, name: impl Into<String>) -> Self {
        self.database_name = name.into();
        self
    }

    pub fn with_database_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.database_dir = Some(dir.into());
        self
    }

    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = Some(dir.into());
        self
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = Some(timeout);
        self
    }

    pub fn with_object_url_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.object_url_namespace = namespace.into();
        self
    }

    /// Full path of the database file, `None` when in memory.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.db", self.database_name)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_name.trim().is_empty() {
            return Err(OfflineError::InvalidConfig(
                "database_name cannot be empty".to_string(),
            ));
        }

        if self
            .database_name
            .contains(|c: char| matches!(c, '/' | '\\' | ':'))
        {
            return Err(OfflineError::InvalidConfig(format!(
                "database_name '{}' must be a plain file stem",
                self.database_name
            )));
        }

        if self.object_url_namespace.is_empty() || self.object_url_namespace.contains('/') {
            return Err(OfflineError::InvalidConfig(
                "object_url_namespace must be a non-empty single segment".to_string(),
            ));
        }

        if self.download_timeout == Some(Duration::ZERO) {
            return Err(OfflineError::InvalidConfig(
                "download_timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

impl From<&CoreConfig> for CacheConfig {
    fn from(core: &CoreConfig) -> Self {
        let database_dir = match &core.database {
            DatabaseLocation::Directory(dir) => Some(dir.clone()),
            DatabaseLocation::InMemory => None,
        };

        Self {
            database_name: core.database_name.clone(),
            database_dir,
            export_dir: core.export_dir.clone(),
            download_timeout: core.download_timeout,
            ..Self::default()
        }
    }
}
