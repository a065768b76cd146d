//! # Offline Cache Manager
//!
//! Orchestrates the offline cache: fetches audio and cover bytes, persists
//! them through an [`OfflineStore`], and hands out object URLs for playback.
//!
//! Queries never fail. When the store cannot be opened or read they degrade
//! to "not cached" so playback falls back to streaming. Downloads, exports
//! and maintenance operations propagate their errors.

use crate::config::CacheConfig;
use crate::error::{OfflineError, Result};
use crate::export::export_file_name;
use crate::models::{CacheStats, CachedAudioRecord, ContentId, DownloadedFile};
use crate::object_url::{ObjectUrl, ObjectUrlRegistry};
use crate::store::{OfflineStore, SqliteOfflineStore};
use bridge_traits::http::HttpClient;
use bridge_traits::storage::FileSystemAccess;
use bridge_traits::time::{Clock, SystemClock};
use bytes::Bytes;
use core_runtime::config::CoreConfig;
use core_runtime::logging::{redact_url, strip_path};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Offline cache manager shared by the player and the library views.
pub struct OfflineCacheManager {
    config: CacheConfig,
    store: Arc<dyn OfflineStore>,
    http_client: Arc<dyn HttpClient>,
    fs: Arc<dyn FileSystemAccess>,
    clock: Arc<dyn Clock>,
    object_urls: Arc<ObjectUrlRegistry>,
}

impl OfflineCacheManager {
    /// Create a manager over an explicit store and bridges.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use core_offline::{CacheConfig, OfflineCacheManager, SqliteOfflineStore};
    /// use std::sync::Arc;
    ///
    /// let manager = OfflineCacheManager::new(
    ///     CacheConfig::default(),
    ///     Arc::new(SqliteOfflineStore::in_memory()),
    ///     http_client,
    ///     filesystem,
    /// )?;
    /// ```
    pub fn new(
        config: CacheConfig,
        store: Arc<dyn OfflineStore>,
        http_client: Arc<dyn HttpClient>,
        fs: Arc<dyn FileSystemAccess>,
    ) -> Result<Self> {
        config.validate()?;

        let object_urls = Arc::new(ObjectUrlRegistry::new(&config.object_url_namespace));

        Ok(Self {
            config,
            store,
            http_client,
            fs,
            clock: Arc::new(SystemClock),
            object_urls,
        })
    }

    /// Replace the clock used for `downloaded_at` and stats timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build a manager with a [`SqliteOfflineStore`] from the runtime config.
    pub fn from_core_config(core: &CoreConfig) -> Result<Self> {
        let config = CacheConfig::from(core);

        let store: Arc<dyn OfflineStore> = match config.database_path() {
            Some(path) => Arc::new(SqliteOfflineStore::new(path)),
            None => Arc::new(SqliteOfflineStore::in_memory()),
        };

        Ok(Self::new(
            config,
            store,
            Arc::clone(&core.http_client),
            Arc::clone(&core.file_system),
        )?
        .with_clock(Arc::clone(&core.clock)))
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Number of object URLs issued and not yet revoked.
    pub fn live_object_urls(&self) -> usize {
        self.object_urls.len()
    }

    // ========================================================================
    // Download pipeline
    // ========================================================================

    /// Download a track (and optionally its cover) and cache it.
    ///
    /// A failed cover fetch is logged and the track is cached without one.
    /// Nothing is written unless the audio fetch succeeds, and the audio and
    /// cover rows are committed together. The returned URLs point at the
    /// freshly downloaded bytes.
    #[instrument(
        skip(self, id, stream_url, title, artist_name, cover_image_url),
        fields(content_id = %id)
    )]
    pub async fn download_for_offline(
        &self,
        id: &ContentId,
        stream_url: &str,
        title: &str,
        artist_name: Option<&str>,
        cover_image_url: Option<&str>,
    ) -> Result<DownloadedFile> {
        self.store.ensure_open().await?;

        let audio = self.fetch_bytes(stream_url).await?;

        let cover = match cover_image_url {
            Some(url) => self.fetch_cover(url).await,
            None => None,
        };

        let record = CachedAudioRecord {
            content_id: id.clone(),
            title: title.to_string(),
            artist_name: artist_name.map(str::to_string),
            audio_blob: audio,
            cover_image_blob: cover,
            downloaded_at: self.clock.unix_timestamp(),
        };

        self.store.put_record(&record).await?;

        info!(
            audio_bytes = record.audio_size(),
            has_cover = record.has_cover(),
            "Cached track for offline playback"
        );

        Ok(self.issue_urls(record.audio_blob, record.cover_image_blob))
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Bytes> {
        let download_error = |reason: String| OfflineError::Download {
            url: redact_url(url),
            reason,
        };

        let response = self
            .http_client
            .get(url, self.config.download_timeout)
            .await
            .map_err(|e| download_error(e.to_string()))?;

        if !response.is_success() {
            return Err(download_error(format!("HTTP {}", response.status)));
        }

        debug!(url = %redact_url(url), bytes = response.body.len(), "Fetched");
        Ok(response.body)
    }

    async fn fetch_cover(&self, url: &str) -> Option<Bytes> {
        match self.fetch_bytes(url).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(error = %e, "Cover image fetch failed, caching without cover");
                None
            }
        }
    }

    fn issue_urls(&self, audio: Bytes, cover: Option<Bytes>) -> DownloadedFile {
        DownloadedFile {
            audio_url: self.object_urls.register(audio),
            cover_image_url: cover.map(|blob| self.object_urls.register(blob)),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Whether `id` has a cached audio record. Storage failures read as `false`.
    #[instrument(skip(self, id), fields(content_id = %id))]
    pub async fn is_available_offline(&self, id: &ContentId) -> bool {
        match self.store.contains(id).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "Offline availability check failed");
                false
            }
        }
    }

    /// Object URLs for a cached track, `None` when it is not cached.
    ///
    /// Audio and cover come from one store snapshot, so a re-download racing
    /// this call yields either the old pair or the new one. A missing cover
    /// only drops `cover_image_url`.
    #[instrument(skip(self, id), fields(content_id = %id))]
    pub async fn get_offline_content(&self, id: &ContentId) -> Option<DownloadedFile> {
        let (audio, cover) = match self.store.get_content(id).await {
            Ok(Some(content)) => content,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Offline content lookup failed");
                return None;
            }
        };

        Some(self.issue_urls(audio.audio_blob, cover.map(|c| c.blob)))
    }

    /// Every cached record. Storage failures yield an empty list.
    #[instrument(skip(self))]
    pub async fn get_all_offline_content(&self) -> Vec<CachedAudioRecord> {
        match self.store.get_all().await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Listing offline content failed");
                Vec::new()
            }
        }
    }

    // ========================================================================
    // Filesystem export
    // ========================================================================

    /// Write the bytes behind `audio_url` to the export directory.
    ///
    /// `audio_url` is either an object URL issued by this manager or a remote
    /// URL to fetch. Returns the path written.
    #[instrument(skip(self, id, filename, audio_url), fields(content_id = %id))]
    pub async fn download_to_file_system(
        &self,
        id: &ContentId,
        filename: &str,
        audio_url: &str,
    ) -> Result<PathBuf> {
        let data = self.resolve_export_bytes(audio_url).await?;

        let dir = match &self.config.export_dir {
            Some(dir) => dir.clone(),
            None => self.fs.get_download_directory().await.map_err(|e| {
                OfflineError::Export(format!("No download directory available: {}", e))
            })?,
        };

        self.fs.create_dir_all(&dir).await.map_err(|e| {
            OfflineError::Export(format!("Failed to create export directory: {}", e))
        })?;

        let path = dir.join(export_file_name(filename, id));
        let size = data.len();

        self.fs
            .write_file(&path, data)
            .await
            .map_err(|e| OfflineError::Export(format!("Failed to write export file: {}", e)))?;

        let display_path = path.to_string_lossy();
        info!(
            file = strip_path(&display_path),
            bytes = size,
            "Exported offline audio"
        );

        Ok(path)
    }

    async fn resolve_export_bytes(&self, audio_url: &str) -> Result<Bytes> {
        if ObjectUrl::is_blob_url(audio_url) {
            return self.object_urls.resolve(audio_url).ok_or_else(|| {
                OfflineError::Export(format!("Unknown or revoked object URL: {}", audio_url))
            });
        }

        self.fetch_bytes(audio_url)
            .await
            .map_err(|e| OfflineError::Export(e.to_string()))
    }

    /// Fire-and-forget variant of [`download_to_file_system`](Self::download_to_file_system).
    ///
    /// Failures are logged at `error`; the handle still carries the result.
    pub fn spawn_download_to_file_system(
        self: &Arc<Self>,
        id: ContentId,
        filename: String,
        audio_url: String,
    ) -> JoinHandle<Result<PathBuf>> {
        let manager = Arc::clone(self);

        tokio::spawn(async move {
            let result = manager
                .download_to_file_system(&id, &filename, &audio_url)
                .await;

            if let Err(e) = &result {
                error!(content_id = %id, error = %e, "Background export failed");
            }

            result
        })
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Remove the audio and cover rows for `id`. Returns whether it was cached.
    #[instrument(skip(self, id), fields(content_id = %id))]
    pub async fn remove_offline_content(&self, id: &ContentId) -> Result<bool> {
        let removed = self.store.delete(id).await?;
        if removed {
            info!("Removed offline content");
        }
        Ok(removed)
    }

    /// Remove every cached record. Issued object URLs stay valid.
    #[instrument(skip(self))]
    pub async fn clear_offline_content(&self) -> Result<usize> {
        let removed = self.store.clear().await?;
        info!(removed, "Cleared offline cache");
        Ok(removed)
    }

    pub async fn get_cache_stats(&self) -> Result<CacheStats> {
        let mut stats = self.store.stats().await?;
        stats.calculated_at = self.clock.unix_timestamp();
        Ok(stats)
    }

    /// Release the bytes behind an object URL. Returns `false` if already revoked.
    pub fn revoke_object_url(&self, url: &ObjectUrl) -> bool {
        self.object_urls.revoke(url)
    }

    /// Bytes behind a live object URL.
    pub fn resolve_object_url(&self, url: &str) -> Option<Bytes> {
        self.object_urls.resolve(url)
    }

    /// Close the underlying store. The next operation reopens it.
    pub async fn close(&self) {
        self.store.close().await;
    }
}
