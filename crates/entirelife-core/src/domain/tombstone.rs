//! Tombstones (recent deletions)
//!
//! Deleting an entry does not make it disappear at once: a snapshot is kept
//! in a global, oldest-first list for a retention window so that a pull from
//! a remote copy that still contains the row does not resurrect it.

use serde::{Deserialize, Serialize};

use super::entry::Entry;
use super::newtypes::Timestamp;

/// A record of a deleted entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tombstone {
    /// Name of the ledger the entry was deleted from
    pub ledger: String,
    /// Snapshot of the entry at deletion time
    pub entry: Entry,
    /// Deletion time in ms
    pub deleted_at: Timestamp,
}

impl Tombstone {
    /// Creates a tombstone for `entry` in `ledger`
    pub fn new(ledger: impl Into<String>, entry: Entry, deleted_at: Timestamp) -> Self {
        Self {
            ledger: ledger.into(),
            entry,
            deleted_at,
        }
    }

    /// Returns true if this tombstone blocks `created` in `ledger`
    pub fn blocks(&self, ledger: &str, created: Timestamp) -> bool {
        self.ledger == ledger && self.entry.created == created
    }
}
