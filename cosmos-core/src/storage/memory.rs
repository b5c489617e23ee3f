//! In-memory key-value store

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{KeyValueStore, Versioned};
use crate::Result;

/// Process-local store used by tests and the `memory` backend
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Versioned>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Versioned>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<u64> {
        let mut entries = self.entries.write().await;
        let version = entries.get(key).map_or(1, |v| v.version + 1);
        entries.insert(
            key.to_string(),
            Versioned {
                value: value.to_string(),
                version,
            },
        );
        Ok(version)
    }

    async fn compare_and_set(&self, key: &str, expected: Option<u64>, value: &str) -> Result<bool> {
        let mut entries = self.entries.write().await;
        let current = entries.get(key).map(|v| v.version);
        if current != expected {
            return Ok(false);
        }

        entries.insert(
            key.to_string(),
            Versioned {
                value: value.to_string(),
                version: current.map_or(1, |v| v + 1),
            },
        );
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
