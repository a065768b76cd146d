//! # Offline Cache Module
//!
//! Keeps downloaded tracks playable without a network connection.
//!
//! ## Overview
//!
//! This module handles:
//! - Downloading audio (and an optional cover image) into a SQLite database
//! - Availability checks and lookups that degrade to "not cached" on failure
//! - In-process object URLs for cached blobs
//! - Exporting cached or remote audio to the filesystem
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_offline::{ContentId, OfflineCacheManager};
//! use core_runtime::CoreConfig;
//!
//! let core = CoreConfig::builder().database_dir("/var/lib/player").build()?;
//! let manager = OfflineCacheManager::from_core_config(&core)?;
//!
//! let id = ContentId::new("song-1")?;
//! let file = manager
//!     .download_for_offline(&id, stream_url, "Song", Some("Artist"), None)
//!     .await?;
//! assert!(manager.is_available_offline(&id).await);
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod manager;
pub mod models;
pub mod object_url;
pub mod store;

pub use config::CacheConfig;
pub use error::{OfflineError, Result};
pub use manager::OfflineCacheManager;
pub use models::{CacheStats, CachedAudioRecord, CachedCoverRecord, ContentId, DownloadedFile};
pub use object_url::{ObjectUrl, ObjectUrlRegistry};
pub use store::{OfflineStore, SqliteOfflineStore, SCHEMA_VERSION};
