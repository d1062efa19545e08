//! Key/value store port (driven/secondary port)
//!
//! This module defines the interface for the durable local storage every
//! ledger, the tombstone list and the backend credential live in.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   (SQLite, memory) and don't need domain-level classification.
//! - Values are arbitrary JSON documents; typing is done one layer up in
//!   [`LocalStore`](crate::usecases::LocalStore).
//! - Every operation is atomic for a single key. No cross-key transactions
//!   are assumed.

use serde_json::Value;

/// Port trait for a durable string-keyed JSON store
#[async_trait::async_trait]
pub trait IKeyValueStore: Send + Sync {
    /// Reads the value stored under `key`
    ///
    /// # Returns
    /// `None` if the key has never been set or was removed.
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>>;

    /// Stores `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: Value) -> anyhow::Result<()>;

    /// Removes `key`; removing a missing key is not an error
    async fn remove(&self, key: &str) -> anyhow::Result<()>;

    /// Lists every key currently stored, in no particular order
    async fn keys(&self) -> anyhow::Result<Vec<String>>;
}
