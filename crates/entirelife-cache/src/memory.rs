//! In-memory implementation of IKeyValueStore
//!
//! Nothing survives the process; used by tests and by embedders that keep
//! their own persistence.

use dashmap::DashMap;
use serde_json::Value;

use entirelife_core::ports::IKeyValueStore;

/// `DashMap`-backed key/value store
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    data: DashMap<String, Value>,
}

impl MemoryKeyValueStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if no key is stored
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait::async_trait]
impl IKeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        Ok(self.data.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: Value) -> anyhow::Result<()> {
        self.data.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.data.remove(key);
        Ok(())
    }

    async fn keys(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.data.iter().map(|e| e.key().clone()).collect())
    }
}
