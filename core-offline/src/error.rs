//! # Offline Cache Error Types

use thiserror::Error;

/// Errors surfaced by the offline cache.
///
/// Query operations (`is_available_offline`, `get_offline_content`,
/// `get_all_offline_content`) never return these; they degrade to
/// `false`/`None`/empty instead.
#[derive(Error, Debug)]
pub enum OfflineError {
    // ========================================================================
    // Storage lifecycle
    // ========================================================================
    /// The embedded database could not be opened or upgraded.
    #[error("Offline storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A maintenance operation (delete, clear, stats) failed inside the store.
    #[error("Offline storage error: {0}")]
    Storage(String),

    /// The audio/cover write transaction failed and was rolled back.
    #[error("Failed to persist offline record: {0}")]
    Persist(String),

    // ========================================================================
    // Network and export
    // ========================================================================
    /// The audio fetch failed, either in transport or with a non-2xx status.
    #[error("Download failed for {url}: {reason}")]
    Download { url: String, reason: String },

    /// Resolving or writing an exported file failed.
    #[error("Export failed: {0}")]
    Export(String),

    // ========================================================================
    // Input validation
    // ========================================================================
    #[error("Invalid content id: {0:?}")]
    InvalidContentId(String),

    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),
}

impl OfflineError {
    /// Storage failures that mean offline caching is disabled for now, as
    /// opposed to a single bad request.
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, OfflineError::StorageUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, OfflineError>;
