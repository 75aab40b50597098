//! In-memory state store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::application::ports::{StateStorePort, StoreError};

/// In-memory implementation of `StateStorePort`.
///
/// Suitable for testing and single-process development. State is lost on exit.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    documents: RwLock<BTreeMap<String, Value>>,
}

impl InMemoryStateStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Stored keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.documents.read().keys().cloned().collect()
    }

    /// Seed a document (for test setup).
    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.documents.write().insert(key.into(), value);
    }
}

#[async_trait]
impl StateStorePort for InMemoryStateStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.documents.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.documents.write().insert(key.to_string(), value);
        Ok(())
    }
}
