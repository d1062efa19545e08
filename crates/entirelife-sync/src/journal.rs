//! Journal - host facade over the local store
//!
//! Every user mutation goes through [`Journal`] so that the background
//! workers hear about it: after a successful change a `sync` signal is
//! broadcast, and deletions are handed to the [`TombstoneJanitor`].

use std::sync::Arc;

use chrono::NaiveDate;
use entirelife_core::domain::{Entry, EntryContent, LedgerName, StoreError, Timestamp, Tombstone};
use entirelife_core::ports::SyncSignal;
use entirelife_core::usecases::LocalStore;
use tracing::debug;

use crate::retention::TombstoneJanitor;
use crate::worker::WorkerRegistry;

/// User-facing ledger and entry operations
pub struct Journal {
    store: Arc<LocalStore>,
    registry: Arc<WorkerRegistry>,
    janitor: Arc<TombstoneJanitor>,
}

impl Journal {
    pub fn new(
        store: Arc<LocalStore>,
        registry: Arc<WorkerRegistry>,
        janitor: Arc<TombstoneJanitor>,
    ) -> Self {
        Self {
            store,
            registry,
            janitor,
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Ledger names, sorted
    pub async fn ledgers(&self) -> Result<Vec<String>, StoreError> {
        self.store.list_ledger_names().await
    }

    /// Entries of a ledger sorted by date, then creation
    pub async fn entries(&self, ledger: &str) -> Result<Vec<Entry>, StoreError> {
        let mut entries = self
            .store
            .get_ledger(ledger)
            .await?
            .ok_or_else(|| StoreError::LedgerNotFound(ledger.to_string()))?;
        entries.sort_by_key(|e| (e.date, e.created));
        Ok(entries)
    }

    // ========================================================================
    // Ledger mutations
    // ========================================================================

    pub async fn add_ledger(
        &self,
        name: &str,
        date_of_birth: NaiveDate,
    ) -> Result<LedgerName, StoreError> {
        let name = self.store.add_ledger(name, date_of_birth).await?;
        self.request_sync();
        Ok(name)
    }

    /// Creates a ledger with no entries
    ///
    /// No sync is requested: there is nothing to push yet.
    pub async fn add_empty_ledger(&self, name: &str) -> Result<LedgerName, StoreError> {
        self.store.add_empty_ledger(name).await
    }

    pub async fn rename_ledger(&self, old: &str, new: &str) -> Result<LedgerName, StoreError> {
        let name = self.store.rename_ledger(old, new).await?;
        self.request_sync();
        Ok(name)
    }

    /// Removes a ledger locally; its spreadsheet is left untouched
    pub async fn remove_ledger(&self, name: &str) -> Result<(), StoreError> {
        self.store.remove_ledger(name).await?;
        self.request_sync();
        Ok(())
    }

    // ========================================================================
    // Entry mutations
    // ========================================================================

    pub async fn add_entry(&self, ledger: &str, content: EntryContent) -> Result<Entry, StoreError> {
        let entry = self.store.add_entry(ledger, content).await?;
        self.request_sync();
        Ok(entry)
    }

    pub async fn update_entry(
        &self,
        ledger: &str,
        created: Timestamp,
        content: EntryContent,
    ) -> Result<Entry, StoreError> {
        let entry = self.store.update_entry(ledger, created, content).await?;
        self.request_sync();
        Ok(entry)
    }

    /// Deletes an entry and schedules the purge of its tombstone
    pub async fn delete_entry(
        &self,
        ledger: &str,
        created: Timestamp,
    ) -> Result<Tombstone, StoreError> {
        let tombstone = self.store.delete_entry(ledger, created).await?;
        self.janitor.schedule(tombstone.deleted_at);
        self.request_sync();
        Ok(tombstone)
    }

    fn request_sync(&self) {
        let delivered = self.registry.broadcast(SyncSignal::Sync);
        debug!(workers = delivered, "Requested sync after local change");
    }
}
