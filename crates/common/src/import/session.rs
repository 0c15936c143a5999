//! Time-bounded upload session cache
//!
//! Holds raw upload bytes between the preview and commit steps of an
//! import, keyed by a generated session id. Entries expire after a TTL and
//! are purged on access, so the cache cannot grow without bound the way a
//! plain in-process map would.

use dashmap::DashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// One uploaded file awaiting commit
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    stored_at: Instant,
}

/// Concurrent store of pending uploads with expiry
pub struct UploadSessionStore {
    entries: DashMap<Uuid, StoredUpload>,
    ttl: Duration,
}

impl UploadSessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Store an upload and hand back its session id
    pub fn insert(&self, file_name: String, bytes: Vec<u8>) -> Uuid {
        self.purge_expired();

        let id = Uuid::new_v4();
        self.entries.insert(
            id,
            StoredUpload {
                file_name,
                bytes,
                stored_at: Instant::now(),
            },
        );
        id
    }

    /// Remove and return an upload. Expired entries are gone even if they
    /// had not been purged yet.
    pub fn take(&self, id: &Uuid) -> Option<StoredUpload> {
        let (_, upload) = self.entries.remove(id)?;
        if upload.stored_at.elapsed() > self.ttl {
            None
        } else {
            Some(upload)
        }
    }

    /// Drop every expired entry
    pub fn purge_expired(&self) {
        self.entries
            .retain(|_, upload| upload.stored_at.elapsed() <= self.ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_take_roundtrip() {
        let store = UploadSessionStore::new(Duration::from_secs(60));
        let id = store.insert("papers.csv".to_string(), b"data".to_vec());

        let upload = store.take(&id).unwrap();
        assert_eq!(upload.file_name, "papers.csv");
        assert_eq!(upload.bytes, b"data");

        // take consumes
        assert!(store.take(&id).is_none());
    }

    #[test]
    fn test_unknown_id_is_none() {
        let store = UploadSessionStore::new(Duration::from_secs(60));
        assert!(store.take(&Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_expired_entry_is_gone() {
        let store = UploadSessionStore::new(Duration::ZERO);
        let id = store.insert("papers.csv".to_string(), b"data".to_vec());
        assert!(store.take(&id).is_none());
    }

    #[test]
    fn test_purge_drops_expired_entries() {
        let store = UploadSessionStore::new(Duration::ZERO);
        store.insert("a.csv".to_string(), vec![1]);
        store.insert("b.csv".to_string(), vec![2]);

        store.purge_expired();
        assert!(store.is_empty());
    }
}
