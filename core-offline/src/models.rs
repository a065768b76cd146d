//! Domain types for cached content.

use crate::error::{OfflineError, Result};
use crate::object_url::ObjectUrl;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a catalog item; primary key of both record stores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentId(String);

impl ContentId {
    /// Wrap an identifier, rejecting empty or whitespace-only values.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(OfflineError::InvalidContentId(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ContentId {
    type Error = OfflineError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ContentId {
    type Error = OfflineError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ContentId> for String {
    fn from(id: ContentId) -> Self {
        id.0
    }
}

/// A downloaded track as persisted in the audio store.
///
/// `cover_image_blob` is filled from the cover store on reads and written to
/// it on `put_record`; the audio table itself does not hold it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAudioRecord {
    pub content_id: ContentId,
    pub title: String,
    pub artist_name: Option<String>,
    pub audio_blob: Bytes,
    pub cover_image_blob: Option<Bytes>,
    /// Unix seconds, UTC
    pub downloaded_at: i64,
}

impl CachedAudioRecord {
    pub fn has_cover(&self) -> bool {
        self.cover_image_blob.is_some()
    }

    pub fn audio_size(&self) -> usize {
        self.audio_blob.len()
    }
}

/// A cover image row, stored separately so it can be read without the audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedCoverRecord {
    pub content_id: ContentId,
    pub blob: Bytes,
}

/// Playable handles for a cached item.
///
/// The caller owns both URLs and should revoke them through
/// `OfflineCacheManager::revoke_object_url` once they are no longer in use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub audio_url: ObjectUrl,
    pub cover_image_url: Option<ObjectUrl>,
}

/// Aggregate numbers over the offline store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub entries_with_cover: usize,
    pub total_audio_bytes: u64,
    pub total_cover_bytes: u64,
    /// Unix seconds when the numbers were collected
    pub calculated_at: i64,
}
