//! Workspace facade crate.
//!
//! Host applications depend on `music-offline-workspace` to pull in the
//! offline cache (`core-offline`) together with the runtime wiring
//! (`core-runtime`) without naming each workspace crate individually.

pub use core_offline as offline;
pub use core_runtime as runtime;

pub use core_offline::{
    CacheConfig, CachedAudioRecord, ContentId, DownloadedFile, ObjectUrl, OfflineCacheManager,
    OfflineError,
};
