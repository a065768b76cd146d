//! # Offline Record Store
//!
//! Persistence seam of the cache. The manager only talks to
//! [`OfflineStore`]; [`SqliteOfflineStore`] is the production backend.

mod schema;
mod sqlite;

pub use schema::SCHEMA_VERSION;
pub use sqlite::SqliteOfflineStore;

use crate::error::Result;
use crate::models::{CacheStats, CachedAudioRecord, CachedCoverRecord, ContentId};
use async_trait::async_trait;

/// Two keyed record stores (audio and cover) behind one lifecycle.
///
/// Every method other than `ensure_open` and `close` opens the store lazily,
/// so callers never need to sequence an explicit open first.
#[async_trait]
pub trait OfflineStore: Send + Sync {
    /// Open the backing database and bring its schema up to date.
    ///
    /// Idempotent. Fails with `OfflineError::StorageUnavailable`.
    async fn ensure_open(&self) -> Result<()>;

    /// Upsert the audio row and the cover row in one transaction.
    ///
    /// With `record.cover_image_blob == None` any cover row left over from an
    /// earlier download of the same id is removed. Fails with
    /// `OfflineError::Persist` and leaves both stores untouched.
    async fn put_record(&self, record: &CachedAudioRecord) -> Result<()>;

    /// Whether an audio row exists for `id`, without loading its blob.
    async fn contains(&self, id: &ContentId) -> Result<bool>;

    /// Audio row for `id` (with `cover_image_blob` left empty) and its cover
    /// row, read as two lookups on one snapshot.
    ///
    /// `None` when there is no audio row, whatever the cover store holds. A
    /// concurrent `put_record` is seen either entirely or not at all.
    async fn get_content(
        &self,
        id: &ContentId,
    ) -> Result<Option<(CachedAudioRecord, Option<CachedCoverRecord>)>>;

    /// Every audio row with its cover attached when one exists.
    async fn get_all(&self) -> Result<Vec<CachedAudioRecord>>;

    /// Remove both rows for `id`. Returns whether an audio row existed.
    async fn delete(&self, id: &ContentId) -> Result<bool>;

    /// Remove everything. Returns the number of audio rows removed.
    async fn clear(&self) -> Result<usize>;

    async fn stats(&self) -> Result<CacheStats>;

    /// Release the database handle. A later call reopens it.
    async fn close(&self);
}
