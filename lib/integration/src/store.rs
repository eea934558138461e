//! Keyed profile storage.
//!
//! Writes are upserts: storing under an existing key replaces the record.

use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

/// Durable storage for reviewed candidate records.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Inserts or replaces the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    async fn upsert(&self, key: &str, record: JsonValue) -> Result<(), StoreError>;
}

/// Process-local store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProfileStore {
    records: Arc<RwLock<HashMap<String, JsonValue>>>,
}

impl InMemoryProfileStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<JsonValue> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn upsert(&self, key: &str, record: JsonValue) -> Result<(), StoreError> {
        info!(key, "upsert");
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn upsert_overwrites_instead_of_duplicating() {
        let store = InMemoryProfileStore::new();
        store
            .upsert("candidate:c1", json!({"approved": false}))
            .await
            .expect("first write");
        store
            .upsert("candidate:c1", json!({"approved": true}))
            .await
            .expect("second write");

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("candidate:c1"), Some(json!({"approved": true})));
    }

    #[test]
    fn clones_share_records() {
        let store = InMemoryProfileStore::new();
        let clone = store.clone();
        assert!(clone.is_empty());
        store
            .records
            .write()
            .expect("lock")
            .insert("k".to_string(), json!(1));
        assert_eq!(clone.get("k"), Some(json!(1)));
    }
}
