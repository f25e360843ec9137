use crate::storage::traits::{StorageBackend, StorageError, StorageResult};
use async_trait::async_trait;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;

/// Filesystem storage rooted at a directory
///
/// Writes go to a temporary file in the target directory and are renamed
/// into place, so a crash mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a key to a path under the root, rejecting keys that escape it
    fn full_path(&self, key: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

        if key.is_empty() || escapes {
            return Err(StorageError::InvalidLocation(format!(
                "key '{}' must be a relative path inside {}",
                key,
                self.root.display()
            )));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.full_path(key)?;

        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> StorageResult<()> {
        let path = self.full_path(key)?;
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());

        fs::create_dir_all(&parent).await?;

        let data = bytes.to_vec();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut temp_file = NamedTempFile::new_in(&parent)?;
            temp_file.write_all(&data)?;
            temp_file.as_file().sync_all()?;
            temp_file.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| StorageError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;

        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.full_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    fn describe(&self) -> String {
        format!("local:{}", self.root.display())
    }
}
