//! File-backed state store.
//!
//! One pretty-printed JSON file per key under a data directory. Writes go to a
//! temporary sibling and are renamed into place. Not safe for concurrent
//! writers from separate processes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::application::ports::{StateStorePort, StoreError};

/// JSON-file implementation of `StateStorePort`.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    root: PathBuf,
}

impl FileStateStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| StoreError::Io {
                key: root.display().to_string(),
                message: e.to_string(),
            })?;
        Ok(Self { root })
    }

    /// Data directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path for a key. `:` and `/` are not portable in file names.
    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.root.join(format!("{name}.json"))
    }
}

fn io_error(key: &str, err: &std::io::Error) -> StoreError {
    StoreError::Io {
        key: key.to_string(),
        message: err.to_string(),
    }
}

#[async_trait]
impl StateStorePort for FileStateStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(key, &e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Serialization {
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let bytes = serde_json::to_vec_pretty(&value).map_err(|e| StoreError::Serialization {
            key: key.to_string(),
            message: e.to_string(),
        })?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| io_error(key, &e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error(key, &e))?;

        tracing::trace!(key, path = %path.display(), "Persisted document");
        Ok(())
    }
}
