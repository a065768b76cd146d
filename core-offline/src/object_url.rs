//! # Object URLs
//!
//! In-process handles for cached blobs. A handle looks like
//! `blob:<namespace>/<uuid>` and resolves to the bytes it was registered
//! with until it is revoked.

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;
use uuid::Uuid;

pub const BLOB_SCHEME: &str = "blob:";

/// Opaque handle to bytes held by an [`ObjectUrlRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `url` uses the blob scheme, regardless of which registry issued it.
    pub fn is_blob_url(url: &str) -> bool {
        url.starts_with(BLOB_SCHEME)
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Registry of live object URLs.
///
/// Entries hold `Bytes`, so registering a blob that is also kept elsewhere
/// shares the allocation instead of copying it.
pub struct ObjectUrlRegistry {
    prefix: String,
    entries: RwLock<HashMap<String, Bytes>>,
}

impl ObjectUrlRegistry {
    pub fn new(namespace: &str) -> Self {
        Self {
            prefix: format!("{}{}/", BLOB_SCHEME, namespace),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, data: Bytes) -> ObjectUrl {
        let url = format!("{}{}", self.prefix, Uuid::new_v4());
        debug!(size = data.len(), "Registered object URL");
        self.entries.write().insert(url.clone(), data);
        ObjectUrl(url)
    }

    pub fn resolve(&self, url: &str) -> Option<Bytes> {
        self.entries.read().get(url).cloned()
    }

    /// Release the bytes behind `url`. Returns `false` if it was already gone.
    pub fn revoke(&self, url: &ObjectUrl) -> bool {
        self.entries.write().remove(url.as_str()).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
