//! SQLite pool for the local store
//!
//! The whole store is the single `kv` table. Its schema version is kept in
//! `PRAGMA user_version`; a database stamped with a newer version than this
//! build knows is refused rather than written to.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::CacheError;

/// Schema version written to `user_version`
pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA_SQL: &str = include_str!("migrations/20261001_initial.sql");

/// SQLite pool holding the `kv` table
///
/// The CLI and a running `sync --watch` open the same file, so file databases
/// use WAL and wait up to five seconds on a locked writer.
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens (creating if needed) the database at `db_path`
    ///
    /// # Errors
    ///
    /// `ConnectionFailed` if the file cannot be opened, `MigrationFailed` if
    /// the schema cannot be created or is newer than [`SCHEMA_VERSION`].
    pub async fn new(db_path: &Path) -> Result<Self, CacheError> {
        let open_failed = |e: &dyn std::fmt::Display| {
            CacheError::ConnectionFailed(format!("{}: {e}", db_path.display()))
        };

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| open_failed(&e))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| open_failed(&e))?;

        let pool = Self::prepare(pool).await?;
        tracing::info!(path = %db_path.display(), "Local store opened");
        Ok(pool)
    }

    /// Opens a private in-memory database
    ///
    /// Limited to one connection; each SQLite in-memory connection is its
    /// own database.
    pub async fn in_memory() -> Result<Self, CacheError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| CacheError::ConnectionFailed(format!("in-memory database: {e}")))?;

        Self::prepare(pool).await
    }

    /// Returns the underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes every connection, checkpointing the WAL
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Returns the schema version stored in the database
    pub async fn schema_version(&self) -> Result<i64, CacheError> {
        Ok(sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn prepare(pool: SqlitePool) -> Result<Self, CacheError> {
        let db = Self { pool };

        match db.schema_version().await? {
            SCHEMA_VERSION => {}
            0 => {
                sqlx::raw_sql(SCHEMA_SQL)
                    .execute(&db.pool)
                    .await
                    .map_err(|e| CacheError::MigrationFailed(format!("creating kv table: {e}")))?;
                sqlx::raw_sql(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))
                    .execute(&db.pool)
                    .await?;
                tracing::debug!(version = SCHEMA_VERSION, "Created local store schema");
            }
            newer => {
                return Err(CacheError::MigrationFailed(format!(
                    "schema version {newer} was written by a newer Entire.Life \
                     (this build knows version {SCHEMA_VERSION})"
                )));
            }
        }

        Ok(db)
    }
}
