//! Transient in-memory audio handles
//!
//! The browser-like platform never writes audio to disk. Recordings and
//! replies live here under `blob:` URIs until they are revoked.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// URI scheme prefix for registered blobs
pub const BLOB_SCHEME: &str = "blob:";

/// Shared registry of `blob:` URIs
#[derive(Debug, Clone, Default)]
pub struct BlobStore {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl BlobStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bytes and return their URI
    pub fn create(&self, data: Vec<u8>) -> String {
        let uri = format!("{BLOB_SCHEME}talkback/{}", uuid::Uuid::new_v4());
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(uri.clone(), data);
        }
        uri
    }

    /// Dereference a URI
    #[must_use]
    pub fn get(&self, uri: &str) -> Option<Vec<u8>> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(uri).cloned())
    }

    /// Drop a URI; returns whether it was registered
    pub fn revoke(&self, uri: &str) -> bool {
        self.entries
            .lock()
            .map(|mut entries| entries.remove(uri).is_some())
            .unwrap_or(false)
    }

    /// Number of live handles
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Whether no handles are live
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_get_revoke() {
        let store = BlobStore::new();
        let uri = store.create(vec![1, 2, 3]);

        assert!(uri.starts_with(BLOB_SCHEME));
        assert_eq!(store.get(&uri), Some(vec![1, 2, 3]));
        assert_eq!(store.len(), 1);

        assert!(store.revoke(&uri));
        assert!(!store.revoke(&uri));
        assert!(store.get(&uri).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_clones_share_entries() {
        let store = BlobStore::new();
        let other = store.clone();
        let uri = store.create(b"abc".to_vec());

        assert_eq!(other.get(&uri), Some(b"abc".to_vec()));
    }

    #[test]
    fn test_uris_are_unique() {
        let store = BlobStore::new();
        let a = store.create(vec![]);
        let b = store.create(vec![]);
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }
}
