//! # Core Configuration Module
//!
//! Builder-style configuration for the offline cache.
//!
//! ## Overview
//!
//! [`CoreConfig`] gathers the settings and bridge implementations the cache
//! needs before it can start. The builder fails fast: a missing capability or
//! an invalid path is reported from [`CoreConfigBuilder::build`] rather than
//! surfacing later as a storage or network failure.
//!
//! ## Bridges
//!
//! - `HttpClient` - fetches audio and cover bytes (desktop default: reqwest)
//! - `FileSystemAccess` - export target directories and file writes (desktop default: tokio fs)
//! - `Clock` - download timestamps (default: system clock)
//!
//! When the `desktop-shims` feature is disabled, `HttpClient` and
//! `FileSystemAccess` must be injected explicitly.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .database_dir("/var/lib/music")
//!     .export_dir("/home/me/Music/Exports")
//!     .build()?;
//! ```
//!
//! Hosts that configure through the environment can start from
//! [`CoreConfigBuilder::from_env`], which reads `OFFLINE_CACHE_DIR` and
//! `OFFLINE_EXPORT_DIR`.

use crate::error::{Error, Result};
use bridge_traits::{Clock, FileSystemAccess, HttpClient, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable naming the database directory.
pub const ENV_CACHE_DIR: &str = "OFFLINE_CACHE_DIR";
/// Environment variable naming the export directory.
pub const ENV_EXPORT_DIR: &str = "OFFLINE_EXPORT_DIR";

/// Default database file stem; the store appends `.db`.
pub const DEFAULT_DATABASE_NAME: &str = "music_offline";

/// Where the offline database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// `<dir>/<database_name>.db`
    Directory(PathBuf),
    /// Process-local database that vanishes on close
    InMemory,
}

/// Core configuration for the offline cache.
#[derive(Clone)]
pub struct CoreConfig {
    pub database: DatabaseLocation,

    /// Database file stem
    pub database_name: String,

    /// Export target; `None` defers to the platform download directory
    pub export_dir: Option<PathBuf>,

    /// Per-request fetch timeout; `None` leaves fetches unbounded
    pub download_timeout: Option<Duration>,

    pub http_client: Arc<dyn HttpClient>,

    pub file_system: Arc<dyn FileSystemAccess>,

    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database", &self.database)
            .field("database_name", &self.database_name)
            .field("export_dir", &self.export_dir)
            .field("download_timeout", &self.download_timeout)
            .field("http_client", &"HttpClient { ... }")
            .field("file_system", &"FileSystemAccess { ... }")
            .field("clock", &"Clock { ... }")
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Database directory and export directory are not empty paths
    /// - Database name is a plain file stem
    /// - Download timeout, when set, is non-zero
    pub fn validate(&self) -> Result<()> {
        if let DatabaseLocation::Directory(dir) = &self.database {
            if dir.as_os_str().is_empty() {
                return Err(Error::Config(
                    "Database directory cannot be empty".to_string(),
                ));
            }
        }

        if self.database_name.trim().is_empty() {
            return Err(Error::Config("Database name cannot be empty".to_string()));
        }

        if self
            .database_name
            .contains(|c: char| matches!(c, '/' | '\\' | ':'))
        {
            return Err(Error::Config(format!(
                "Database name '{}' must not contain path separators",
                self.database_name
            )));
        }

        if let Some(dir) = &self.export_dir {
            if dir.as_os_str().is_empty() {
                return Err(Error::Config("Export directory cannot be empty".to_string()));
            }
        }

        if self.download_timeout == Some(Duration::ZERO) {
            return Err(Error::Config(
                "Download timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required to fetch audio and cover bytes. \
                 Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                 Mobile: inject the platform networking stack."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    use bridge_desktop::TokioFileSystem;

    let fs: Arc<dyn FileSystemAccess> = Arc::new(TokioFileSystem::new());
    Ok(fs)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Err(Error::CapabilityMissing {
        capability: "FileSystemAccess".to_string(),
        message: "FileSystemAccess implementation is required to export cached audio. \
                 Desktop: enable the 'desktop-shims' feature to use TokioFileSystem. \
                 Mobile: inject sandboxed app storage."
            .to_string(),
    })
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_dir: Option<PathBuf>,
    in_memory: bool,
    database_name: Option<String>,
    export_dir: Option<PathBuf>,
    download_timeout: Option<Duration>,
    http_client: Option<Arc<dyn HttpClient>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    clock: Option<Arc<dyn Clock>>,
}

impl CoreConfigBuilder {
    /// Start a builder pre-populated from `OFFLINE_CACHE_DIR` and
    /// `OFFLINE_EXPORT_DIR`. Unset or empty variables are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut builder = Self::default();
        if let Some(dir) = non_empty(ENV_CACHE_DIR) {
            builder = builder.database_dir(dir);
        }
        if let Some(dir) = non_empty(ENV_EXPORT_DIR) {
            builder = builder.export_dir(dir);
        }
        builder
    }

    /// Directory holding `<database_name>.db`.
    pub fn database_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_dir = Some(path.into());
        self
    }

    /// Keep the database in memory instead of on disk. Takes precedence over
    /// [`database_dir`](Self::database_dir).
    pub fn in_memory_database(mut self, in_memory: bool) -> Self {
        self.in_memory = in_memory;
        self
    }

    /// Database file stem.
    ///
    /// Default: `music_offline`
    pub fn database_name(mut self, name: impl Into<String>) -> Self {
        self.database_name = Some(name.into());
        self
    }

    pub fn export_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.export_dir = Some(path.into());
        self
    }

    pub fn download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = Some(timeout);
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the file system access implementation.
    ///
    /// If not provided, the desktop default (tokio fs-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] when no database location was given or a value is invalid
    /// - [`Error::CapabilityMissing`] when a bridge is absent and no desktop default exists
    pub fn build(self) -> Result<CoreConfig> {
        let database = if self.in_memory {
            DatabaseLocation::InMemory
        } else {
            let dir = self.database_dir.ok_or_else(|| {
                Error::Config(format!(
                    "Database directory is required. Use .database_dir(), set {}, \
                     or opt into .in_memory_database(true).",
                    ENV_CACHE_DIR
                ))
            })?;
            DatabaseLocation::Directory(dir)
        };

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system()?,
        };

        let config = CoreConfig {
            database,
            database_name: self
                .database_name
                .unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_string()),
            export_dir: self.export_dir,
            download_timeout: self.download_timeout,
            http_client,
            file_system,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        };

        config.validate()?;

        Ok(config)
    }
}
