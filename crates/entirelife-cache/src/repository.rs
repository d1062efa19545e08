//! SQLite implementation of IKeyValueStore
//!
//! Every key maps to one row of the `kv` table. Values are stored as JSON
//! text alongside an RFC 3339 `updated_at` stamp that is only used for
//! debugging a database by hand.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use entirelife_core::ports::IKeyValueStore;
use serde_json::Value;

use crate::CacheError;

/// SQLite-based implementation of the key/value port
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    /// Creates a new store instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn read(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let row = sqlx::query("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("value")?;
                let value = serde_json::from_str(&raw).map_err(|e| {
                    CacheError::SerializationError(format!("Value of {key:?} is not JSON: {e}"))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn write(&self, key: &str, value: &Value) -> Result<(), CacheError> {
        let raw = serde_json::to_string(value)?;
        let updated_at = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(&raw)
        .bind(&updated_at)
        .execute(&self.pool)
        .await?;

        tracing::trace!(key, bytes = raw.len(), "Stored value");
        Ok(())
    }
}

#[async_trait::async_trait]
impl IKeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        Ok(self.read(key).await?)
    }

    async fn set(&self, key: &str, value: Value) -> anyhow::Result<()> {
        Ok(self.write(key, &value).await?)
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        let result = sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(CacheError::from)?;

        tracing::trace!(key, removed = result.rows_affected(), "Removed key");
        Ok(())
    }

    async fn keys(&self) -> anyhow::Result<Vec<String>> {
        let rows = sqlx::query("SELECT key FROM kv ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(CacheError::from)?;

        let keys = rows
            .iter()
            .map(|row| row.try_get::<String, _>("key"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(CacheError::from)?;
        Ok(keys)
    }
}
