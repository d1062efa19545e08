//! Tombstone retention
//!
//! A tombstone keeps a deleted entry from being pulled back in while the
//! remote copy may still hold its row. [`TombstoneJanitor`] removes the
//! oldest tombstone once the retention delay has passed since the deletion
//! that created it.
//!
//! ## Flow
//!
//! ```text
//! delete_entry ──→ schedule(deleted_at) ──→ mpsc(deadline) ──→ janitor task
//!                                                               │ sleep_until(deadline)
//!                                                               ▼
//!                                                       remove_oldest_tombstone()
//! ```
//!
//! Deletions are scheduled in order, so purges happen one at a time, oldest
//! first. Tombstones left over by a previous process are picked up by
//! [`TombstoneJanitor::resume`].

use std::sync::Arc;
use std::time::Duration;

use entirelife_core::domain::{StoreError, Timestamp};
use entirelife_core::usecases::LocalStore;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Default delay between a deletion and the purge of its tombstone
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(20);

/// Background purger of expired tombstones
pub struct TombstoneJanitor {
    store: Arc<LocalStore>,
    retention: Duration,
    tx: mpsc::UnboundedSender<Instant>,
    task: JoinHandle<()>,
}

impl TombstoneJanitor {
    /// Spawns the janitor task
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(store: Arc<LocalStore>, retention: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(store.clone(), rx));
        info!(retention_secs = retention.as_secs(), "Tombstone janitor started");

        Self {
            store,
            retention,
            tx,
            task,
        }
    }

    /// Schedules one purge for a deletion made at `deleted_at`
    pub fn schedule(&self, deleted_at: Timestamp) {
        let wait = due_at(deleted_at, self.retention) - self.store.now();
        let deadline = Instant::now() + Duration::from_millis(wait.max(0) as u64);
        if self.tx.send(deadline).is_err() {
            warn!(deleted_at, "Tombstone janitor is gone; purge not scheduled");
        }
    }

    /// Schedules a purge for every persisted tombstone
    ///
    /// # Returns
    /// How many purges were scheduled
    pub async fn resume(&self) -> Result<usize, StoreError> {
        let tombstones = self.store.tombstones().await?;
        for tombstone in &tombstones {
            self.schedule(tombstone.deleted_at);
        }
        if !tombstones.is_empty() {
            info!(count = tombstones.len(), "Resumed pending tombstone purges");
        }
        Ok(tombstones.len())
    }

    /// Removes, oldest first, every tombstone whose retention has already
    /// passed
    ///
    /// Used by short-lived hosts that exit before a scheduled purge fires.
    ///
    /// # Returns
    /// How many tombstones were removed
    pub async fn purge_expired(&self) -> Result<usize, StoreError> {
        let mut purged = 0;
        loop {
            let now = self.store.now();
            let expired = self
                .store
                .tombstones()
                .await?
                .first()
                .is_some_and(|t| due_at(t.deleted_at, self.retention) <= now);
            if !expired {
                break;
            }
            self.store.remove_oldest_tombstone().await?;
            purged += 1;
        }
        if purged > 0 {
            debug!(purged, "Purged expired tombstones");
        }
        Ok(purged)
    }

    /// Stops the janitor; scheduled purges that have not fired are dropped
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for TombstoneJanitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn due_at(deleted_at: Timestamp, retention: Duration) -> Timestamp {
    deleted_at.saturating_add(retention.as_millis() as i64)
}

async fn run(store: Arc<LocalStore>, mut rx: mpsc::UnboundedReceiver<Instant>) {
    while let Some(deadline) = rx.recv().await {
        tokio::time::sleep_until(deadline).await;

        match store.remove_oldest_tombstone().await {
            Ok(Some(tombstone)) => debug!(
                ledger = %tombstone.ledger,
                created = tombstone.entry.created,
                "Purged tombstone"
            ),
            Ok(None) => debug!("No tombstone left to purge"),
            Err(e) => warn!(error = %e, "Failed to purge tombstone"),
        }
    }
}
