//! Entire.Life Cache - Local key/value persistence
//!
//! Durable storage for:
//! - One JSON document per ledger
//! - The global tombstone list
//! - The remote backend credential
//!
//! ## Architecture
//!
//! This crate implements the `IKeyValueStore` port from `entirelife-core`.
//! It is a driven (secondary) adapter in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteKeyValueStore`] - SQLite-backed `IKeyValueStore`
//! - [`MemoryKeyValueStore`] - Process-local `IKeyValueStore` for tests and dry runs
//! - [`CacheError`] - Error types for cache operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use entirelife_cache::{DatabasePool, SqliteKeyValueStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/home/user/.local/share/entirelife/entirelife.db")).await?;
//! let store = SqliteKeyValueStore::new(pool.pool().clone());
//! // Use store as IKeyValueStore...
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod pool;
pub mod repository;

pub use memory::MemoryKeyValueStore;
pub use pool::DatabasePool;
pub use repository::SqliteKeyValueStore;

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value is not valid JSON
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::QueryFailed(e.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::SerializationError(e.to_string())
    }
}
