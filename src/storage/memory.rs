use crate::storage::traits::{StorageBackend, StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-process storage for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: RwLock<HashMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `put` fail until switched back off
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Stores raw bytes, bypassing failure injection
    pub async fn insert_raw(&self, key: &str, bytes: &[u8]) {
        self.data
            .write()
            .await
            .insert(key.to_string(), bytes.to_vec());
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.data
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteRejected(key.to_string()));
        }
        self.data
            .write()
            .await
            .insert(key.to_string(), bytes.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.data.read().await.contains_key(key))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip() {
        let storage = MemoryStorage::new();
        storage.put("k", b"v").await.unwrap();
        assert_eq!(storage.get("k").await.unwrap(), b"v");
        assert!(storage.exists("k").await.unwrap());
        assert_eq!(storage.write_count(), 1);
    }

    #[tokio::test]
    async fn test_missing() {
        let storage = MemoryStorage::new();
        assert!(matches!(
            storage.get("k").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let storage = MemoryStorage::new();
        storage.put("k", b"old").await.unwrap();

        storage.set_fail_writes(true);
        assert!(storage.put("k", b"new").await.is_err());
        assert_eq!(storage.get("k").await.unwrap(), b"old");

        storage.set_fail_writes(false);
        storage.put("k", b"new").await.unwrap();
        assert_eq!(storage.get("k").await.unwrap(), b"new");
    }
}
