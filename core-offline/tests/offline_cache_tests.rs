//! Tests for the offline cache manager
//!
//! The manager runs against a real SQLite store (in memory or in a temp dir),
//! a canned HTTP client and the desktop filesystem adapter.

use async_trait::async_trait;
use bridge_desktop::TokioFileSystem;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::time::Clock;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use core_offline::{
    CacheConfig, CacheStats, CachedAudioRecord, CachedCoverRecord, ContentId, OfflineCacheManager,
    OfflineError, OfflineStore, Result, SqliteOfflineStore,
};
use core_runtime::CoreConfig;
use mockall::mock;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const AUDIO_URL: &str = "https://cdn.example.com/audio/song-1.mp3?sig=abc";
const COVER_URL: &str = "https://cdn.example.com/covers/song-1.jpg";
const DOWNLOADED_AT: i64 = 1_700_000_000;

// ============================================================================
// Test doubles
// ============================================================================

enum Canned {
    Status(u16, Bytes),
    Transport(String),
}

#[derive(Default)]
struct StubHttpClient {
    routes: Mutex<HashMap<String, Canned>>,
    requests: AtomicUsize,
}

impl StubHttpClient {
    fn respond(&self, url: &str, status: u16, body: impl Into<Bytes>) {
        self.routes
            .lock()
            .insert(url.to_string(), Canned::Status(status, body.into()));
    }

    fn fail(&self, url: &str, message: &str) {
        self.routes
            .lock()
            .insert(url.to_string(), Canned::Transport(message.to_string()));
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpClient for StubHttpClient {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        match self.routes.lock().get(&request.url) {
            Some(Canned::Status(status, body)) => Ok(HttpResponse::new(*status, body.clone())),
            Some(Canned::Transport(message)) => Err(BridgeError::OperationFailed(message.clone())),
            None => Ok(HttpResponse::new(404, Bytes::new())),
        }
    }
}

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

mock! {
    Store {}

    #[async_trait]
    impl OfflineStore for Store {
        async fn ensure_open(&self) -> Result<()>;
        async fn put_record(&self, record: &CachedAudioRecord) -> Result<()>;
        async fn contains(&self, id: &ContentId) -> Result<bool>;
        async fn get_content(
            &self,
            id: &ContentId,
        ) -> Result<Option<(CachedAudioRecord, Option<CachedCoverRecord>)>>;
        async fn get_all(&self) -> Result<Vec<CachedAudioRecord>>;
        async fn delete(&self, id: &ContentId) -> Result<bool>;
        async fn clear(&self) -> Result<usize>;
        async fn stats(&self) -> Result<CacheStats>;
        async fn close(&self);
    }
}

// ============================================================================
// Fixtures
// ============================================================================

struct Harness {
    manager: Arc<OfflineCacheManager>,
    http: Arc<StubHttpClient>,
    export_dir: TempDir,
}

fn id(value: &str) -> ContentId {
    ContentId::new(value).unwrap()
}

fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(Utc.timestamp_opt(DOWNLOADED_AT, 0).unwrap()))
}

fn filesystem(download_dir: &Path) -> Arc<TokioFileSystem> {
    Arc::new(TokioFileSystem::with_download_dir(download_dir))
}

fn harness_with_store(store: Arc<dyn OfflineStore>) -> Harness {
    let export_dir = TempDir::new().unwrap();
    let http = Arc::new(StubHttpClient::default());

    let config = CacheConfig::new().with_export_dir(export_dir.path());
    let manager = OfflineCacheManager::new(
        config,
        store,
        http.clone(),
        filesystem(export_dir.path()),
    )
    .unwrap()
    .with_clock(clock());

    Harness {
        manager: Arc::new(manager),
        http,
        export_dir,
    }
}

fn harness() -> Harness {
    harness_with_store(Arc::new(SqliteOfflineStore::in_memory()))
}

// ============================================================================
// Download pipeline
// ============================================================================

#[tokio::test]
async fn test_download_song_with_cover() {
    let h = harness();
    h.http.respond(AUDIO_URL, 200, vec![7u8; 1000]);
    h.http.respond(COVER_URL, 200, vec![9u8; 200]);
    let song = id("song-1");

    let file = h
        .manager
        .download_for_offline(&song, AUDIO_URL, "Song One", Some("Artist"), Some(COVER_URL))
        .await
        .unwrap();

    let audio = h.manager.resolve_object_url(file.audio_url.as_str()).unwrap();
    assert_eq!(audio.len(), 1000);
    let cover_url = file.cover_image_url.expect("cover URL");
    assert_eq!(h.manager.resolve_object_url(cover_url.as_str()).unwrap().len(), 200);

    assert!(h.manager.is_available_offline(&song).await);

    let all = h.manager.get_all_offline_content().await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].content_id, song);
    assert_eq!(all[0].title, "Song One");
    assert_eq!(all[0].artist_name.as_deref(), Some("Artist"));
    assert_eq!(all[0].downloaded_at, DOWNLOADED_AT);
    assert_eq!(all[0].cover_image_blob.as_ref().map(Bytes::len), Some(200));
}

#[tokio::test]
async fn test_server_error_leaves_nothing_cached() {
    let h = harness();
    h.http.respond(AUDIO_URL, 500, "boom");
    h.http.respond(COVER_URL, 200, vec![9u8; 200]);
    let song = id("song-2");

    let err = h
        .manager
        .download_for_offline(&song, AUDIO_URL, "Song Two", None, Some(COVER_URL))
        .await
        .unwrap_err();

    match err {
        OfflineError::Download { url, reason } => {
            assert!(!url.contains("sig=abc"));
            assert!(reason.contains("500"));
        }
        other => panic!("expected Download error, got {:?}", other),
    }
    // The cover is never requested once the audio fetch fails.
    assert_eq!(h.http.requests(), 1);
    assert!(!h.manager.is_available_offline(&song).await);
    assert!(h.manager.get_offline_content(&song).await.is_none());
    assert_eq!(h.manager.live_object_urls(), 0);
}

#[tokio::test]
async fn test_not_found_and_transport_errors() {
    let h = harness();
    let song = id("song-3");

    let err = h
        .manager
        .download_for_offline(&song, "https://cdn.example.com/missing.mp3", "Missing", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OfflineError::Download { .. }));

    h.http.fail(AUDIO_URL, "connection reset");
    let err = h
        .manager
        .download_for_offline(&song, AUDIO_URL, "Missing", None, None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("connection reset"));

    assert!(h.manager.get_all_offline_content().await.is_empty());
}

#[tokio::test]
async fn test_cover_failure_is_not_fatal() {
    let h = harness();
    h.http.respond(AUDIO_URL, 200, "audio");
    h.http.fail(COVER_URL, "timed out");
    let song = id("song-1");

    let file = h
        .manager
        .download_for_offline(&song, AUDIO_URL, "Song One", None, Some(COVER_URL))
        .await
        .unwrap();

    assert!(file.cover_image_url.is_none());
    let stored = h.manager.get_offline_content(&song).await.unwrap();
    assert!(stored.cover_image_url.is_none());
}

#[tokio::test]
async fn test_redownload_replaces_bytes_and_stale_cover() {
    let h = harness();
    let song = id("song-1");

    h.http.respond(AUDIO_URL, 200, "old audio");
    h.http.respond(COVER_URL, 200, "old cover");
    h.manager
        .download_for_offline(&song, AUDIO_URL, "Old", None, Some(COVER_URL))
        .await
        .unwrap();

    h.http.respond(AUDIO_URL, 200, "new audio");
    h.manager
        .download_for_offline(&song, AUDIO_URL, "New", None, None)
        .await
        .unwrap();

    let file = h.manager.get_offline_content(&song).await.unwrap();
    assert_eq!(
        h.manager.resolve_object_url(file.audio_url.as_str()).unwrap(),
        Bytes::from_static(b"new audio")
    );
    assert!(file.cover_image_url.is_none());

    let all = h.manager.get_all_offline_content().await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].title, "New");
}

#[tokio::test]
async fn test_persist_failure_registers_no_urls() {
    let mut store = MockStore::new();
    store.expect_ensure_open().returning(|| Ok(()));
    store
        .expect_put_record()
        .times(1)
        .returning(|_| Err(OfflineError::Persist("disk full".to_string())));
    let h = harness_with_store(Arc::new(store));
    h.http.respond(AUDIO_URL, 200, "audio");

    let err = h
        .manager
        .download_for_offline(&id("song-1"), AUDIO_URL, "Song", None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, OfflineError::Persist(_)));
    assert_eq!(h.manager.live_object_urls(), 0);
}

// ============================================================================
// Queries
// ============================================================================

#[tokio::test]
async fn test_unknown_id_is_not_available() {
    let h = harness();
    let song = id("never-downloaded");

    assert!(!h.manager.is_available_offline(&song).await);
    assert!(h.manager.get_offline_content(&song).await.is_none());
}

#[tokio::test]
async fn test_queries_degrade_when_store_cannot_open() {
    let blocker = TempDir::new().unwrap();
    let file = blocker.path().join("not-a-dir");
    std::fs::write(&file, b"x").unwrap();
    let h = harness_with_store(Arc::new(SqliteOfflineStore::new(file.join("offline.db"))));
    h.http.respond(AUDIO_URL, 200, "audio");
    let song = id("song-1");

    let err = h
        .manager
        .download_for_offline(&song, AUDIO_URL, "Song", None, None)
        .await
        .unwrap_err();
    assert!(err.is_storage_unavailable());
    assert_eq!(h.http.requests(), 0);

    assert!(!h.manager.is_available_offline(&song).await);
    assert!(h.manager.get_offline_content(&song).await.is_none());
    assert!(h.manager.get_all_offline_content().await.is_empty());
    assert!(h.manager.get_cache_stats().await.is_err());
}

#[tokio::test]
async fn test_content_lookup_error_reads_as_not_cached() {
    let mut store = MockStore::new();
    store
        .expect_get_content()
        .returning(|_| Err(OfflineError::Storage("database is locked".to_string())));
    let h = harness_with_store(Arc::new(store));

    assert!(h.manager.get_offline_content(&id("song-1")).await.is_none());
    assert_eq!(h.manager.live_object_urls(), 0);
}

/// Cache take `n` of a track: audio `v<n>`, and cover `<n>` on odd takes only.
async fn redownload(
    manager: &OfflineCacheManager,
    http: &StubHttpClient,
    song: &ContentId,
    n: u32,
) {
    http.respond(AUDIO_URL, 200, format!("v{}", n));
    http.respond(COVER_URL, 200, n.to_string());
    let cover = (n % 2 == 1).then_some(COVER_URL);

    let file = manager
        .download_for_offline(song, AUDIO_URL, "Song", None, cover)
        .await
        .unwrap();
    manager.revoke_object_url(&file.audio_url);
    if let Some(url) = &file.cover_image_url {
        manager.revoke_object_url(url);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_content_never_pairs_audio_with_another_downloads_cover() {
    let db_dir = TempDir::new().unwrap();
    let h = harness_with_store(Arc::new(SqliteOfflineStore::new(
        db_dir.path().join("music_offline.db"),
    )));
    let song = id("song-1");

    redownload(&h.manager, &h.http, &song, 0).await;
    let writer = tokio::spawn({
        let (manager, http, song) = (h.manager.clone(), h.http.clone(), song.clone());
        async move {
            for n in 1..=200 {
                redownload(&manager, &http, &song, n).await;
            }
        }
    });

    let mut reads = 0;
    while !writer.is_finished() || reads == 0 {
        let file = h.manager.get_offline_content(&song).await.unwrap();
        let audio = h.manager.resolve_object_url(file.audio_url.as_str()).unwrap();
        let take = std::str::from_utf8(&audio[1..]).unwrap().to_string();
        let cover = file
            .cover_image_url
            .as_ref()
            .and_then(|url| h.manager.resolve_object_url(url.as_str()));

        let odd = take.parse::<u32>().unwrap() % 2 == 1;
        assert_eq!(
            cover,
            odd.then(|| Bytes::from(take.clone())),
            "audio v{} paired with the wrong cover",
            take
        );

        h.manager.revoke_object_url(&file.audio_url);
        if let Some(url) = &file.cover_image_url {
            h.manager.revoke_object_url(url);
        }
        reads += 1;
    }

    writer.await.unwrap();
}

#[tokio::test]
async fn test_revoked_url_no_longer_resolves() {
    let h = harness();
    h.http.respond(AUDIO_URL, 200, "audio");
    let file = h
        .manager
        .download_for_offline(&id("song-1"), AUDIO_URL, "Song", None, None)
        .await
        .unwrap();

    assert!(h.manager.revoke_object_url(&file.audio_url));
    assert!(!h.manager.revoke_object_url(&file.audio_url));
    assert!(h.manager.resolve_object_url(file.audio_url.as_str()).is_none());
    assert_eq!(h.manager.live_object_urls(), 0);
}

// ============================================================================
// Export
// ============================================================================

#[tokio::test]
async fn test_export_object_url_writes_exact_bytes() {
    let h = harness();
    let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    h.http.respond(AUDIO_URL, 200, payload.clone());
    let song = id("song-1");
    let file = h
        .manager
        .download_for_offline(&song, AUDIO_URL, "Song", None, None)
        .await
        .unwrap();

    let path = h
        .manager
        .download_to_file_system(&song, "Song One.mp3", file.audio_url.as_str())
        .await
        .unwrap();

    assert_eq!(path, h.export_dir.path().join("Song One.mp3"));
    assert_eq!(std::fs::read(&path).unwrap(), payload);
}

#[tokio::test]
async fn test_export_remote_url_and_sanitized_name() {
    let h = harness();
    h.http.respond(AUDIO_URL, 200, "remote audio");
    let song = id("song-1");

    let path = h
        .manager
        .download_to_file_system(&song, "../escape.mp3", AUDIO_URL)
        .await
        .unwrap();

    assert_eq!(path.parent(), Some(h.export_dir.path()));
    assert_eq!(std::fs::read(&path).unwrap(), b"remote audio");
}

#[tokio::test]
async fn test_export_failures_are_export_errors() {
    let h = harness();
    let song = id("song-1");

    let err = h
        .manager
        .download_to_file_system(&song, "a.mp3", "blob:offline/does-not-exist")
        .await
        .unwrap_err();
    assert!(matches!(err, OfflineError::Export(_)));

    let err = h
        .manager
        .download_to_file_system(&song, "a.mp3", "https://cdn.example.com/404.mp3")
        .await
        .unwrap_err();
    assert!(matches!(err, OfflineError::Export(_)));

    assert!(!h.export_dir.path().join("a.mp3").exists());
}

#[tokio::test]
async fn test_spawned_export_reports_result() {
    let h = harness();
    h.http.respond(AUDIO_URL, 200, "audio");
    let song = id("song-1");

    let ok = h
        .manager
        .spawn_download_to_file_system(song.clone(), "song.mp3".to_string(), AUDIO_URL.to_string())
        .await
        .unwrap();
    assert!(ok.unwrap().exists());

    let failed = h
        .manager
        .spawn_download_to_file_system(song, "x.mp3".to_string(), "blob:offline/gone".to_string())
        .await
        .unwrap();
    assert!(matches!(failed, Err(OfflineError::Export(_))));
}

// ============================================================================
// Maintenance and lifecycle
// ============================================================================

#[tokio::test]
async fn test_remove_clear_and_stats() {
    let h = harness();
    h.http.respond(AUDIO_URL, 200, vec![1u8; 300]);
    h.http.respond(COVER_URL, 200, vec![2u8; 50]);

    for name in ["a", "b", "c"] {
        h.manager
            .download_for_offline(&id(name), AUDIO_URL, name, None, Some(COVER_URL))
            .await
            .unwrap();
    }

    let stats = h.manager.get_cache_stats().await.unwrap();
    assert_eq!(stats.total_entries, 3);
    assert_eq!(stats.entries_with_cover, 3);
    assert_eq!(stats.total_audio_bytes, 900);
    assert_eq!(stats.total_cover_bytes, 150);
    assert_eq!(stats.calculated_at, DOWNLOADED_AT);

    assert!(h.manager.remove_offline_content(&id("a")).await.unwrap());
    assert!(!h.manager.remove_offline_content(&id("a")).await.unwrap());
    assert!(!h.manager.is_available_offline(&id("a")).await);

    assert_eq!(h.manager.clear_offline_content().await.unwrap(), 2);
    assert!(h.manager.get_all_offline_content().await.is_empty());
}

#[tokio::test]
async fn test_file_database_survives_close() {
    let db_dir = TempDir::new().unwrap();
    let store = Arc::new(SqliteOfflineStore::new(db_dir.path().join("music_offline.db")));
    let h = harness_with_store(store.clone());
    h.http.respond(AUDIO_URL, 200, "audio");
    let song = id("song-1");

    h.manager
        .download_for_offline(&song, AUDIO_URL, "Song", None, None)
        .await
        .unwrap();
    h.manager.close().await;
    assert!(!store.is_open().await);

    assert!(h.manager.is_available_offline(&song).await);
    assert!(store.is_open().await);
}

#[tokio::test]
async fn test_from_core_config_in_memory() {
    let dirs = TempDir::new().unwrap();
    let http = Arc::new(StubHttpClient::default());
    http.respond(AUDIO_URL, 200, "audio");

    let core = CoreConfig::builder()
        .in_memory_database(true)
        .export_dir(dirs.path())
        .http_client(http.clone())
        .file_system(filesystem(dirs.path()))
        .clock(clock())
        .build()
        .unwrap();

    let manager = OfflineCacheManager::from_core_config(&core).unwrap();
    assert!(manager.config().database_path().is_none());
    assert_eq!(manager.config().export_dir.as_deref(), Some(dirs.path()));

    let song = id("song-1");
    manager
        .download_for_offline(&song, AUDIO_URL, "Song", None, None)
        .await
        .unwrap();

    let all = manager.get_all_offline_content().await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].downloaded_at, DOWNLOADED_AT);
}

#[test]
fn test_invalid_config_rejected() {
    let dirs = TempDir::new().unwrap();
    let result = OfflineCacheManager::new(
        CacheConfig::new().with_database_name(""),
        Arc::new(SqliteOfflineStore::in_memory()),
        Arc::new(StubHttpClient::default()),
        filesystem(dirs.path()),
    );

    assert!(matches!(result, Err(OfflineError::InvalidConfig(_))));
}
