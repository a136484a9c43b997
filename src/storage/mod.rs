//! Blob storage for original and generated PDF bytes
//!
//! The engine only needs a store/retrieve byte-blob contract; this keeps it
//! on the local filesystem under a configured root.

use std::path::{Component, Path, PathBuf};

use crate::error::{AppError, Result};

/// Filesystem-backed blob store
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store bytes under a key, creating parent directories as needed
    pub async fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(key, size = bytes.len(), "stored blob");
        Ok(())
    }

    /// Retrieve bytes by key
    pub async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::NotFound(format!("blob not found: {}", key)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Map a key to a path under the root, rejecting traversal attempts
    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() {
            return Err(AppError::BadRequest("empty blob key".to_string()));
        }
        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(AppError::BadRequest(format!("invalid blob key: {}", key)));
        }
        Ok(self.root.join(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());

        store.put("templates/t1.pdf", b"%PDF-").await.unwrap();
        let bytes = store.get("templates/t1.pdf").await.unwrap();
        assert_eq!(bytes, b"%PDF-");
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());

        let err = store.get("nope.pdf").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());

        for key in ["../escape.pdf", "/etc/passwd", ""] {
            let err = store.get(key).await.unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)), "key: {key}");
        }
    }
}
