//! State Store Port (Driven Port)
//!
//! Key/value persistence for JSON documents. No transactions; callers rely on
//! the tick single-flight guard for consistency.

use async_trait::async_trait;
use serde_json::Value;

/// State store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Backend read/write failed.
    #[error("Store I/O error for key '{key}': {message}")]
    Io {
        /// Key being accessed.
        key: String,
        /// Error details.
        message: String,
    },

    /// Stored document could not be (de)serialized.
    #[error("Store serialization error for key '{key}': {message}")]
    Serialization {
        /// Key being accessed.
        key: String,
        /// Error details.
        message: String,
    },
}

/// Port for key/value state persistence.
#[async_trait]
pub trait StateStorePort: Send + Sync {
    /// Read a document; `None` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Write a document, replacing any existing value.
    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError>;
}
