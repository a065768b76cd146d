//! File System Access Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::FileSystemAccess,
};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Tokio-based file system implementation
///
/// Exports go to the user's Downloads folder unless another directory is
/// given.
pub struct TokioFileSystem {
    download_dir: PathBuf,
}

impl TokioFileSystem {
    /// Create a new file system accessor with default directories
    pub fn new() -> Self {
        let download_dir = dirs::download_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
            .unwrap_or_else(|| PathBuf::from("Downloads"));

        Self { download_dir }
    }

    /// Create a new file system accessor exporting into `download_dir`
    pub fn with_download_dir(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
        }
    }

    async fn ensure_dir(path: &Path) -> Result<()> {
        if !fs::try_exists(path).await.map_err(BridgeError::Io)? {
            fs::create_dir_all(path).await.map_err(BridgeError::Io)?;
            debug!(path = ?path, "Created directory");
        }
        Ok(())
    }
}

impl Default for TokioFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileSystemAccess for TokioFileSystem {
    async fn get_download_directory(&self) -> Result<PathBuf> {
        Self::ensure_dir(&self.download_dir).await?;
        Ok(self.download_dir.clone())
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).await?;
        debug!(path = ?path, "Created directory");
        Ok(())
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()> {
        if let Some(parent) = path.parent() {
            Self::ensure_dir(parent).await?;
        }

        fs::write(path, data.as_ref()).await?;
        debug!(path = ?path, size = data.len(), "Wrote file");
        Ok(())
    }
}
