//! Storage module for Yoink
//!
//! Blob storage behind a single [`StorageBackend`] trait, with a local
//! filesystem implementation, an S3 implementation and an in-memory one.
//! A checkpoint location string picks the backend:
//!
//! - `s3://bucket/path/to/key` selects [`S3Storage`]
//! - `file:///abs/path` or any plain path selects [`LocalStorage`]

mod local;
mod memory;
mod s3;
mod traits;

pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use s3::S3Storage;
pub use traits::{StorageBackend, StorageError, StorageResult};

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A parsed storage location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    Local { root: PathBuf, key: String },
    S3 { bucket: String, key: String },
}

impl StorageLocation {
    /// Parses a location string
    ///
    /// A local path is split into its parent directory (the backend root)
    /// and its file name (the key).
    pub fn parse(location: &str) -> StorageResult<Self> {
        let location = location.trim();
        if location.is_empty() {
            return Err(StorageError::InvalidLocation(
                "location cannot be empty".to_string(),
            ));
        }

        match location.split_once("://") {
            Some(("s3", rest)) => {
                let (bucket, key) = rest.split_once('/').ok_or_else(|| {
                    StorageError::InvalidLocation(format!("'{}' has no object key", location))
                })?;
                let key = key.trim_start_matches('/');
                if bucket.is_empty() || key.is_empty() {
                    return Err(StorageError::InvalidLocation(format!(
                        "'{}' needs both a bucket and a key",
                        location
                    )));
                }
                Ok(StorageLocation::S3 {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                })
            }
            Some(("file", path)) => Self::local(Path::new(path)),
            Some((scheme, _)) => Err(StorageError::InvalidLocation(format!(
                "unsupported storage scheme '{}'",
                scheme
            ))),
            None => Self::local(Path::new(location)),
        }
    }

    fn local(path: &Path) -> StorageResult<Self> {
        let key = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                StorageError::InvalidLocation(format!("'{}' has no file name", path.display()))
            })?
            .to_string();

        let root = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Ok(StorageLocation::Local { root, key })
    }

    pub fn key(&self) -> &str {
        match self {
            StorageLocation::Local { key, .. } | StorageLocation::S3 { key, .. } => key,
        }
    }

    /// Builds the backend for this location
    pub async fn open(&self) -> Arc<dyn StorageBackend> {
        match self {
            StorageLocation::Local { root, .. } => Arc::new(LocalStorage::new(root.clone())),
            StorageLocation::S3 { bucket, .. } => Arc::new(S3Storage::from_env(bucket.clone()).await),
        }
    }
}

/// Parses a location string and opens its backend, returning it with the key
pub async fn open_location(location: &str) -> StorageResult<(Arc<dyn StorageBackend>, String)> {
    let parsed = StorageLocation::parse(location)?;
    let backend = parsed.open().await;
    Ok((backend, parsed.key().to_string()))
}
