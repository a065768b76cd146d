//! SQLite-backed [`OfflineStore`].

use super::schema;
use super::OfflineStore;
use crate::error::{OfflineError, Result};
use crate::models::{CacheStats, CachedAudioRecord, CachedCoverRecord, ContentId};
use async_trait::async_trait;
use bytes::Bytes;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::Row;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument};

const AUDIO_COLUMNS: &str = "content_id, title, artist_name, audio_blob, downloaded_at";

/// Offline store persisted in a single SQLite file (or kept in memory).
///
/// The pool is opened lazily on first use and can be closed and reopened.
/// Opening is serialized, so concurrent first callers share one open.
pub struct SqliteOfflineStore {
    path: Option<PathBuf>,
    pool: Mutex<Option<SqlitePool>>,
    opens: AtomicU32,
}

impl SqliteOfflineStore {
    /// Store backed by the file at `path`. Nothing is touched until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            pool: Mutex::new(None),
            opens: AtomicU32::new(0),
        }
    }

    /// Store whose contents live only as long as the open pool.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            pool: Mutex::new(None),
            opens: AtomicU32::new(0),
        }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    pub async fn is_open(&self) -> bool {
        self.pool.lock().await.is_some()
    }

    /// Value of `PRAGMA user_version` on the open database.
    pub async fn schema_version(&self) -> Result<i64> {
        let pool = self.pool().await?;
        schema::current_version(&pool)
            .await
            .map_err(|e| OfflineError::Storage(format!("Failed to read schema version: {}", e)))
    }

    async fn pool(&self) -> Result<SqlitePool> {
        let mut guard = self.pool.lock().await;
        if let Some(pool) = guard.as_ref() {
            return Ok(pool.clone());
        }

        let pool = self.open().await?;
        *guard = Some(pool.clone());
        Ok(pool)
    }

    async fn open(&self) -> Result<SqlitePool> {
        let options = match &self.path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| unavailable("Failed to create database directory", e))?;
                }
                SqliteConnectOptions::new()
                    .filename(path)
                    .journal_mode(SqliteJournalMode::Wal)
            }
            // Each in-memory connection is its own database, hence the single
            // connection that is never recycled below.
            None => SqliteConnectOptions::new()
                .in_memory(true)
                .journal_mode(SqliteJournalMode::Memory),
        }
        .synchronous(SqliteSynchronous::Normal)
        .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new().acquire_timeout(Duration::from_secs(30));
        pool_options = if self.path.is_some() {
            pool_options.max_connections(4)
        } else {
            pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| unavailable("Failed to open offline database", e))?;

        let upgrade = match schema::upgrade(&pool).await {
            Ok(upgrade) => upgrade,
            Err(e) => {
                pool.close().await;
                return Err(unavailable("Failed to upgrade offline schema", e));
            }
        };

        let open_count = self.opens.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            path = ?self.path,
            open_count,
            schema_version = upgrade.to,
            upgraded = upgrade.applied(),
            "Opened offline database"
        );

        Ok(pool)
    }

    fn row_to_audio(row: &SqliteRow) -> std::result::Result<CachedAudioRecord, sqlx::Error> {
        let content_id: String = row.try_get("content_id")?;
        let content_id = ContentId::new(content_id).map_err(|e| sqlx::Error::ColumnDecode {
            index: "content_id".to_string(),
            source: Box::new(e),
        })?;
        let audio_blob: Vec<u8> = row.try_get("audio_blob")?;

        Ok(CachedAudioRecord {
            content_id,
            title: row.try_get("title")?,
            artist_name: row.try_get("artist_name")?,
            audio_blob: Bytes::from(audio_blob),
            cover_image_blob: None,
            downloaded_at: row.try_get("downloaded_at")?,
        })
    }

    fn storage_error(operation: &str, e: sqlx::Error) -> OfflineError {
        error!(error = %e, operation, "Offline store query failed");
        OfflineError::Storage(format!("{} failed: {}", operation, e))
    }
}

fn unavailable(context: &str, e: impl std::fmt::Display) -> OfflineError {
    error!(error = %e, "{}", context);
    OfflineError::StorageUnavailable(format!("{}: {}", context, e))
}

#[async_trait]
impl OfflineStore for SqliteOfflineStore {
    #[instrument(skip(self))]
    async fn ensure_open(&self) -> Result<()> {
        self.pool().await.map(|_| ())
    }

    #[instrument(skip(self, record), fields(content_id = %record.content_id))]
    async fn put_record(&self, record: &CachedAudioRecord) -> Result<()> {
        let pool = self.pool().await?;

        let persist = |stage: &str, e: sqlx::Error| {
            error!(error = %e, stage, "Offline record write failed");
            OfflineError::Persist(format!("{}: {}", stage, e))
        };

        let mut tx = pool.begin().await.map_err(|e| persist("begin", e))?;

        sqlx::query(
            r#"
            INSERT INTO audio_files (content_id, title, artist_name, audio_blob, downloaded_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(content_id) DO UPDATE SET
                title = excluded.title,
                artist_name = excluded.artist_name,
                audio_blob = excluded.audio_blob,
                downloaded_at = excluded.downloaded_at
            "#,
        )
        .bind(record.content_id.as_str())
        .bind(&record.title)
        .bind(record.artist_name.as_deref())
        .bind(&record.audio_blob[..])
        .bind(record.downloaded_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| persist("audio", e))?;

        match &record.cover_image_blob {
            Some(cover) => {
                sqlx::query(
                    r#"
                    INSERT INTO cover_images (content_id, blob)
                    VALUES (?, ?)
                    ON CONFLICT(content_id) DO UPDATE SET blob = excluded.blob
                    "#,
                )
                .bind(record.content_id.as_str())
                .bind(&cover[..])
                .execute(&mut *tx)
                .await
                .map_err(|e| persist("cover", e))?;
            }
            None => {
                sqlx::query("DELETE FROM cover_images WHERE content_id = ?")
                    .bind(record.content_id.as_str())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| persist("stale cover", e))?;
            }
        }

        tx.commit().await.map_err(|e| persist("commit", e))?;

        debug!(
            audio_bytes = record.audio_blob.len(),
            has_cover = record.has_cover(),
            "Stored offline record"
        );
        Ok(())
    }

    #[instrument(skip(self))]
    async fn contains(&self, id: &ContentId) -> Result<bool> {
        let pool = self.pool().await?;

        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM audio_files WHERE content_id = ?")
                .bind(id.as_str())
                .fetch_optional(&pool)
                .await
                .map_err(|e| Self::storage_error("contains", e))?;

        Ok(found.is_some())
    }

    #[instrument(skip(self))]
    async fn get_content(
        &self,
        id: &ContentId,
    ) -> Result<Option<(CachedAudioRecord, Option<CachedCoverRecord>)>> {
        let pool = self.pool().await?;
        let fail = |e| Self::storage_error("get_content", e);

        // Both reads share the snapshot taken by the first SELECT.
        let mut tx = pool.begin().await.map_err(fail)?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM audio_files WHERE content_id = ?",
            AUDIO_COLUMNS
        ))
        .bind(id.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(fail)?;

        let audio = match row.as_ref().map(Self::row_to_audio).transpose().map_err(fail)? {
            Some(audio) => audio,
            None => {
                tx.commit().await.map_err(fail)?;
                return Ok(None);
            }
        };

        let cover: Option<Vec<u8>> =
            sqlx::query_scalar("SELECT blob FROM cover_images WHERE content_id = ?")
                .bind(id.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(fail)?;

        tx.commit().await.map_err(fail)?;

        let cover = cover.map(|blob| CachedCoverRecord {
            content_id: id.clone(),
            blob: Bytes::from(blob),
        });
        Ok(Some((audio, cover)))
    }

    #[instrument(skip(self))]
    async fn get_all(&self) -> Result<Vec<CachedAudioRecord>> {
        let pool = self.pool().await?;

        let rows = sqlx::query(
            r#"
            SELECT a.content_id, a.title, a.artist_name, a.audio_blob, a.downloaded_at,
                   c.blob AS cover_blob
            FROM audio_files a
            LEFT JOIN cover_images c ON c.content_id = a.content_id
            ORDER BY a.downloaded_at DESC, a.content_id
            "#,
        )
        .fetch_all(&pool)
        .await
        .map_err(|e| Self::storage_error("get_all", e))?;

        rows.iter()
            .map(|row| -> std::result::Result<CachedAudioRecord, sqlx::Error> {
                let mut record = Self::row_to_audio(row)?;
                let cover: Option<Vec<u8>> = row.try_get("cover_blob")?;
                record.cover_image_blob = cover.map(Bytes::from);
                Ok(record)
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Self::storage_error("get_all", e))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &ContentId) -> Result<bool> {
        let pool = self.pool().await?;
        let fail = |e| Self::storage_error("delete", e);

        let mut tx = pool.begin().await.map_err(fail)?;
        let removed = sqlx::query("DELETE FROM audio_files WHERE content_id = ?")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(fail)?
            .rows_affected();
        sqlx::query("DELETE FROM cover_images WHERE content_id = ?")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(fail)?;
        tx.commit().await.map_err(fail)?;

        Ok(removed > 0)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<usize> {
        let pool = self.pool().await?;
        let fail = |e| Self::storage_error("clear", e);

        let mut tx = pool.begin().await.map_err(fail)?;
        let removed = sqlx::query("DELETE FROM audio_files")
            .execute(&mut *tx)
            .await
            .map_err(fail)?
            .rows_affected();
        sqlx::query("DELETE FROM cover_images")
            .execute(&mut *tx)
            .await
            .map_err(fail)?;
        tx.commit().await.map_err(fail)?;

        info!(removed, "Cleared offline store");
        Ok(removed as usize)
    }

    #[instrument(skip(self))]
    async fn stats(&self) -> Result<CacheStats> {
        let pool = self.pool().await?;

        let (total_entries, total_audio_bytes): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(LENGTH(audio_blob)), 0) FROM audio_files",
        )
        .fetch_one(&pool)
        .await
        .map_err(|e| Self::storage_error("stats", e))?;

        let (entries_with_cover, total_cover_bytes): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(LENGTH(c.blob)), 0)
            FROM cover_images c
            JOIN audio_files a ON a.content_id = c.content_id
            "#,
        )
        .fetch_one(&pool)
        .await
        .map_err(|e| Self::storage_error("stats", e))?;

        Ok(CacheStats {
            total_entries: total_entries as usize,
            entries_with_cover: entries_with_cover as usize,
            total_audio_bytes: total_audio_bytes as u64,
            total_cover_bytes: total_cover_bytes as u64,
            ..CacheStats::default()
        })
    }

    async fn close(&self) {
        if let Some(pool) = self.pool.lock().await.take() {
            pool.close().await;
            info!(path = ?self.path, "Closed offline database");
        } else {
            debug!("Offline store already closed");
        }
    }
}
