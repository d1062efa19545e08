//! Local store use case
//!
//! Typed access to the key/value store: one key per ledger holding its
//! entries, one key holding the global tombstone list and one key holding
//! the backend credential. All ledger and entry mutations live here so that
//! the validation rules are enforced in one place, whether the change comes
//! from the user or from a pull.

use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use crate::{
    domain::{
        newtypes::is_reserved_key, Entry, EntryContent, LedgerName, StoreError, Timestamp,
        Tombstone, ACCESS_TOKEN_KEY, RECENTLY_DELETED_KEY,
    },
    ports::{AccessToken, IClock, IKeyValueStore},
};

type StoreResult<T> = Result<T, StoreError>;

/// Typed ledger, tombstone and credential storage
///
/// Read-modify-write sequences are serialized through an internal lock so
/// that a user edit and a pull running in the same process cannot interleave
/// on the same key.
pub struct LocalStore {
    kv: Arc<dyn IKeyValueStore>,
    clock: Arc<dyn IClock>,
    write_lock: Mutex<()>,
}

impl LocalStore {
    /// Creates a new LocalStore over a key/value adapter
    ///
    /// # Arguments
    ///
    /// * `kv` - Durable key/value storage
    /// * `clock` - Source of `created`/`updated`/`deleted_at` timestamps
    pub fn new(kv: Arc<dyn IKeyValueStore>, clock: Arc<dyn IClock>) -> Self {
        Self {
            kv,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    /// Current time according to the store's clock
    pub fn now(&self) -> Timestamp {
        self.clock.now_millis()
    }

    // ========================================================================
    // Raw key access
    // ========================================================================

    /// Reads the entries of a ledger
    ///
    /// # Returns
    ///
    /// `None` if no ledger with this name exists
    pub async fn get_ledger(&self, name: &str) -> StoreResult<Option<Vec<Entry>>> {
        let Some(value) = self
            .kv
            .get(name)
            .await
            .with_context(|| format!("Failed to read ledger {name:?}"))?
        else {
            return Ok(None);
        };

        let entries = serde_json::from_value(value)
            .with_context(|| format!("Ledger {name:?} is not a list of entries"))?;
        Ok(Some(entries))
    }

    /// Overwrites the entries of a ledger
    pub async fn set_ledger(&self, name: &str, entries: &[Entry]) -> StoreResult<()> {
        let value = serde_json::to_value(entries).context("Failed to encode entries")?;
        self.kv
            .set(name, value)
            .await
            .with_context(|| format!("Failed to write ledger {name:?}"))?;
        Ok(())
    }

    /// Removes any key
    pub async fn remove_key(&self, key: &str) -> StoreResult<()> {
        self.kv
            .remove(key)
            .await
            .with_context(|| format!("Failed to remove key {key:?}"))?;
        Ok(())
    }

    /// Lists ledger names (every key except the reserved ones), sorted
    pub async fn list_ledger_names(&self) -> StoreResult<Vec<String>> {
        let mut names: Vec<String> = self
            .kv
            .keys()
            .await
            .context("Failed to list keys")?
            .into_iter()
            .filter(|key| !is_reserved_key(key))
            .collect();
        names.sort();
        Ok(names)
    }

    async fn ledger_or_not_found(&self, name: &str) -> StoreResult<Vec<Entry>> {
        self.get_ledger(name)
            .await?
            .ok_or_else(|| StoreError::LedgerNotFound(name.to_string()))
    }

    // ========================================================================
    // Tombstones
    // ========================================================================

    /// Returns the global tombstone list, oldest first
    pub async fn tombstones(&self) -> StoreResult<Vec<Tombstone>> {
        let Some(value) = self
            .kv
            .get(RECENTLY_DELETED_KEY)
            .await
            .context("Failed to read tombstones")?
        else {
            return Ok(Vec::new());
        };

        let tombstones =
            serde_json::from_value(value).context("Tombstone list is not a list of deletions")?;
        Ok(tombstones)
    }

    /// Returns the tombstones recorded for one ledger, oldest first
    pub async fn tombstones_for(&self, ledger: &str) -> StoreResult<Vec<Tombstone>> {
        Ok(self
            .tombstones()
            .await?
            .into_iter()
            .filter(|t| t.ledger == ledger)
            .collect())
    }

    /// Appends a tombstone at the end of the global list
    pub async fn append_tombstone(&self, tombstone: Tombstone) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        self.append_tombstone_locked(tombstone).await
    }

    async fn append_tombstone_locked(&self, tombstone: Tombstone) -> StoreResult<()> {
        let mut tombstones = self.tombstones().await?;
        tombstones.push(tombstone);
        self.write_tombstones(&tombstones).await
    }

    /// Removes the oldest tombstone
    ///
    /// When the list becomes empty the key itself is removed.
    ///
    /// # Returns
    ///
    /// The removed tombstone, or `None` if the list was already empty
    pub async fn remove_oldest_tombstone(&self) -> StoreResult<Option<Tombstone>> {
        let _guard = self.write_lock.lock().await;

        let mut tombstones = self.tombstones().await?;
        if tombstones.is_empty() {
            return Ok(None);
        }
        let oldest = tombstones.remove(0);

        if tombstones.is_empty() {
            self.remove_key(RECENTLY_DELETED_KEY).await?;
        } else {
            self.write_tombstones(&tombstones).await?;
        }

        tracing::debug!(
            ledger = %oldest.ledger,
            created = oldest.entry.created,
            remaining = tombstones.len(),
            "Purged tombstone"
        );
        Ok(Some(oldest))
    }

    async fn write_tombstones(&self, tombstones: &[Tombstone]) -> StoreResult<()> {
        let value = serde_json::to_value(tombstones).context("Failed to encode tombstones")?;
        self.kv
            .set(RECENTLY_DELETED_KEY, value)
            .await
            .context("Failed to write tombstones")?;
        Ok(())
    }

    // ========================================================================
    // Credential
    // ========================================================================

    /// Returns the stored backend credential
    pub async fn token(&self) -> StoreResult<Option<AccessToken>> {
        let Some(value) = self
            .kv
            .get(ACCESS_TOKEN_KEY)
            .await
            .context("Failed to read access token")?
        else {
            return Ok(None);
        };
        let token = serde_json::from_value(value).context("Stored access token is malformed")?;
        Ok(Some(token))
    }

    /// Stores or clears the backend credential
    pub async fn set_token(&self, token: Option<&AccessToken>) -> StoreResult<()> {
        match token {
            Some(token) => {
                let value = serde_json::to_value(token).context("Failed to encode access token")?;
                self.kv
                    .set(ACCESS_TOKEN_KEY, value)
                    .await
                    .context("Failed to write access token")?;
            }
            None => self.remove_key(ACCESS_TOKEN_KEY).await?,
        }
        Ok(())
    }

    // ========================================================================
    // Ledger mutations
    // ========================================================================

    async fn validate_new_name(&self, raw: &str) -> StoreResult<LedgerName> {
        let name = LedgerName::new(raw)?;
        if self.get_ledger(name.as_str()).await?.is_some() {
            return Err(StoreError::NameCollision(name.into_inner()));
        }
        Ok(name)
    }

    /// Creates a ledger seeded with a welcome entry dated at `date_of_birth`
    #[tracing::instrument(skip(self))]
    pub async fn add_ledger(&self, name: &str, date_of_birth: NaiveDate) -> StoreResult<LedgerName> {
        let _guard = self.write_lock.lock().await;

        let name = self.validate_new_name(name).await?;
        let welcome = Entry::welcome(date_of_birth, self.now());
        self.set_ledger(name.as_str(), &[welcome]).await?;

        tracing::info!(ledger = %name, "Created ledger");
        Ok(name)
    }

    /// Creates a ledger with no entries (used when discovering remote ledgers)
    #[tracing::instrument(skip(self))]
    pub async fn add_empty_ledger(&self, name: &str) -> StoreResult<LedgerName> {
        let _guard = self.write_lock.lock().await;

        let name = self.validate_new_name(name).await?;
        self.set_ledger(name.as_str(), &[]).await?;

        tracing::info!(ledger = %name, "Created empty ledger");
        Ok(name)
    }

    /// Renames a ledger
    ///
    /// Renaming an existing ledger to its unchanged name is a silent no-op.
    /// The new name goes
    /// through the same validation as a new ledger. The new key is written
    /// before the old one is removed.
    #[tracing::instrument(skip(self))]
    pub async fn rename_ledger(&self, old: &str, new: &str) -> StoreResult<LedgerName> {
        let _guard = self.write_lock.lock().await;

        let entries = self.ledger_or_not_found(old).await?;
        if old.trim() == new.trim() {
            return Ok(LedgerName::new(old)?);
        }

        let new_name = self.validate_new_name(new).await?;

        self.set_ledger(new_name.as_str(), &entries).await?;
        self.remove_key(old).await?;

        tracing::info!(from = old, to = %new_name, "Renamed ledger");
        Ok(new_name)
    }

    /// Removes a ledger and all of its entries
    ///
    /// Pending tombstones for the ledger are left to expire on their own.
    #[tracing::instrument(skip(self))]
    pub async fn remove_ledger(&self, name: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;

        let name = LedgerName::new(name)?;
        self.ledger_or_not_found(name.as_str()).await?;
        self.remove_key(name.as_str()).await?;

        tracing::info!(ledger = %name, "Removed ledger");
        Ok(())
    }

    // ========================================================================
    // Entry mutations
    // ========================================================================

    /// Adds a new entry; `created` and `updated` are assigned by the store
    #[tracing::instrument(skip(self, content))]
    pub async fn add_entry(&self, ledger: &str, content: EntryContent) -> StoreResult<Entry> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.ledger_or_not_found(ledger).await?;
        let created = next_free_created(&entries, self.now());
        let entry = Entry::from_content(content, created, created);
        entries.push(entry.clone());
        self.set_ledger(ledger, &entries).await?;

        tracing::debug!(created, "Added entry");
        Ok(entry)
    }

    /// Inserts a complete entry, keeping its timestamps
    ///
    /// # Errors
    ///
    /// `DuplicateEntry` if the ledger already has an entry with the same
    /// `created`
    pub async fn insert_entry(&self, ledger: &str, entry: Entry) -> StoreResult<Entry> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.ledger_or_not_found(ledger).await?;
        if entries.iter().any(|e| e.created == entry.created) {
            return Err(StoreError::DuplicateEntry {
                ledger: ledger.to_string(),
                created: entry.created,
            });
        }
        entries.push(entry.clone());
        self.set_ledger(ledger, &entries).await?;
        Ok(entry)
    }

    /// Replaces the user-facing fields of the entry identified by `created`
    ///
    /// `updated` is set to now.
    #[tracing::instrument(skip(self, content))]
    pub async fn update_entry(
        &self,
        ledger: &str,
        created: Timestamp,
        content: EntryContent,
    ) -> StoreResult<Entry> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.ledger_or_not_found(ledger).await?;
        let now = self.now();
        let entry = entries
            .iter_mut()
            .find(|e| e.created == created)
            .ok_or_else(|| StoreError::EntryNotFound {
                ledger: ledger.to_string(),
                created,
            })?;
        entry.apply(content, now);
        let updated = entry.clone();

        self.set_ledger(ledger, &entries).await?;
        Ok(updated)
    }

    /// Deletes the entry identified by `created`
    ///
    /// The tombstone is appended before the filtered ledger is written, so a
    /// crash in between leaves a tombstone rather than a resurrectable row.
    ///
    /// # Returns
    ///
    /// The tombstone that now blocks the entry from being pulled back
    #[tracing::instrument(skip(self))]
    pub async fn delete_entry(&self, ledger: &str, created: Timestamp) -> StoreResult<Tombstone> {
        let _guard = self.write_lock.lock().await;

        let entries = self.ledger_or_not_found(ledger).await?;
        let (removed, kept): (Vec<Entry>, Vec<Entry>) =
            entries.into_iter().partition(|e| e.created == created);
        let Some(snapshot) = removed.into_iter().next() else {
            return Err(StoreError::EntryNotFound {
                ledger: ledger.to_string(),
                created,
            });
        };

        let tombstone = Tombstone::new(ledger, snapshot, self.now());
        self.append_tombstone_locked(tombstone.clone()).await?;
        self.set_ledger(ledger, &kept).await?;

        tracing::debug!(deleted_at = tombstone.deleted_at, "Deleted entry");
        Ok(tombstone)
    }
}

/// Increments `candidate` until no entry uses it as `created`
fn next_free_created(entries: &[Entry], mut candidate: Timestamp) -> Timestamp {
    while entries.iter().any(|e| e.created == candidate) {
        candidate += 1;
    }
    candidate
}
