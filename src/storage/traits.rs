//! Storage traits and error types
//!
//! A storage backend is a flat key/value blob store. Checkpoints are its
//! only client; the frontier never touches storage directly.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Invalid storage location: {0}")]
    InvalidLocation(String),

    #[error("Object store error: {0}")]
    ObjectStore(String),

    #[error("Injected write failure for key: {0}")]
    WriteRejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Blob storage for checkpoint records
///
/// Implementations must make `put` atomic with respect to `get`: a reader
/// sees either the previous complete value or the new complete value, never
/// a partial write.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Reads the value stored under `key`
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] when no value exists.
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Replaces the value stored under `key`
    async fn put(&self, key: &str, bytes: &[u8]) -> StorageResult<()>;

    /// Checks whether a value exists under `key`
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Short human-readable description for logs
    fn describe(&self) -> String;
}
