//! Storage and File System Abstractions
//!
//! Platform-agnostic file access. The offline cache keeps its blobs inside
//! the embedded database, so the filesystem is only needed to locate the
//! download directory and to write exported audio files.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// File system access trait
///
/// Abstracts file I/O operations to support different platforms:
/// - Desktop: Direct filesystem access
/// - iOS/Android: Sandboxed app directories
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn save(fs: &dyn FileSystemAccess, data: bytes::Bytes) -> Result<()> {
///     let dir = fs.get_download_directory().await?;
///     fs.write_file(&dir.join("song.mp3"), data).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Get the directory user-initiated saves should land in
    async fn get_download_directory(&self) -> Result<PathBuf>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Write data to a file, creating parent directories and the file as needed
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;
}
