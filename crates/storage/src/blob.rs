//! Artifact storage addressed by logical path.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::atomic::write_atomic;
use crate::error::StorageError;

/// Byte storage keyed by a relative logical path such as `job_1.glb`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` at `path`, replacing any previous content.
    ///
    /// Either the whole write becomes visible or none of it does.
    async fn save(&self, path: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Read everything stored at `path`.
    ///
    /// Fails with [`StorageError::NotFound`] if nothing is stored there.
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;
}

/// Filesystem-backed blob store rooted at a base directory.
pub struct LocalBlobStore {
    base_path: PathBuf,
}

impl LocalBlobStore {
    /// Create the store, creating `base_path` if it does not exist.
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a logical path under the base directory.
    ///
    /// Only plain relative components are allowed.
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let logical = Path::new(path);
        let mut components = logical.components().peekable();
        if components.peek().is_none() {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        if !components.all(|c| matches!(c, Component::Normal(_))) {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.base_path.join(logical))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn save(&self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        let full_path = self.resolve(path)?;
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        write_atomic(&full_path, data).await?;
        tracing::debug!(path, bytes = data.len(), "Blob saved");
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let full_path = self.resolve(path)?;
        match fs::read(&full_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
