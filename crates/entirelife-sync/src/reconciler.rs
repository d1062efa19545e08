//! Per-ledger reconciliation
//!
//! [`Reconciler::reconcile`] pulls the ledger's spreadsheet into the local
//! store and then pushes the local state back. Rows are matched by their
//! `created` timestamp.
//!
//! ## Pull
//!
//! For each data row, in sheet order:
//! - no `created`: added locally as a new entry
//! - tombstoned `created`: skipped, the deletion wins
//! - unknown `created`: inserted with the remote timestamps
//! - known `created` with different fields: local entry updated
//! - known `created`, same fields: nothing
//!
//! ## Push
//!
//! The header plus one row per local entry overwrite `Sheet1!A1:F{n}`, then
//! the rows the pull saw past `n` are deleted. Those are the rows of pending
//! tombstones plus one per blank row the pull skipped.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use entirelife_core::domain::{Entry, StoreError, Timestamp};
use entirelife_core::ports::ITabularBackend;
use entirelife_core::usecases::LocalStore;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::auth_client::AuthAwareClient;
use crate::resolver::RemoteResourceResolver;
use crate::rows::{decode_row, entry_row, header_row, push_range, FIRST_SHEET_ID, PULL_RANGE};
use crate::SyncError;

/// What one reconciliation did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Ledger reconciled
    pub ledger: String,
    /// Entries added locally by the pull
    pub pulled_added: u32,
    /// Entries updated locally by the pull
    pub pulled_updated: u32,
    /// Remote rows ignored because their entry was recently deleted
    pub skipped_tombstoned: u32,
    /// Rows written by the push, header included
    pub pushed_rows: u32,
    /// Trailing rows deleted by the push
    pub purged_rows: u32,
}

impl ReconcileReport {
    fn new(ledger: &str) -> Self {
        Self {
            ledger: ledger.to_string(),
            ..Default::default()
        }
    }

    /// Returns true if the pull changed local data
    pub fn changed_local_data(&self) -> bool {
        self.pulled_added > 0 || self.pulled_updated > 0
    }
}

/// Pulls then pushes one ledger at a time
pub struct Reconciler {
    store: Arc<LocalStore>,
    backend: Arc<dyn ITabularBackend>,
    client: Arc<AuthAwareClient>,
    resolver: Arc<RemoteResourceResolver>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Reconciler {
    /// Creates a reconciler
    pub fn new(
        store: Arc<LocalStore>,
        backend: Arc<dyn ITabularBackend>,
        client: Arc<AuthAwareClient>,
        resolver: Arc<RemoteResourceResolver>,
    ) -> Self {
        Self {
            store,
            backend,
            client,
            resolver,
            locks: DashMap::new(),
        }
    }

    /// Pulls then pushes `ledger`
    ///
    /// Calls for the same ledger are serialized.
    #[tracing::instrument(skip(self))]
    pub async fn reconcile(&self, ledger: &str) -> Result<ReconcileReport, SyncError> {
        let lock = self.locks.entry(ledger.to_string()).or_default().clone();
        let _guard = lock.lock().await;

        let sheet = self.resolver.find_or_create_resource(ledger).await?;
        let mut report = ReconcileReport::new(ledger);

        let remote_len = self.pull(ledger, &sheet.id, &mut report).await?;
        self.push(ledger, &sheet.id, remote_len, &mut report).await?;

        info!(
            ledger,
            added = report.pulled_added,
            updated = report.pulled_updated,
            skipped = report.skipped_tombstoned,
            pushed = report.pushed_rows,
            purged = report.purged_rows,
            "Reconciled ledger"
        );
        Ok(report)
    }

    /// Returns how many rows the sheet held, header and blank rows included
    async fn pull(
        &self,
        ledger: &str,
        sheet_id: &str,
        report: &mut ReconcileReport,
    ) -> Result<usize, SyncError> {
        let backend = &self.backend;
        let rows = self
            .client
            .call("read_range", |token| async move {
                backend.read_range(&token, sheet_id, PULL_RANGE).await
            })
            .await?;

        let tombstones = self.store.tombstones_for(ledger).await?;
        let mut local: HashMap<Timestamp, Entry> = self
            .store
            .get_ledger(ledger)
            .await?
            .ok_or_else(|| StoreError::LedgerNotFound(ledger.to_string()))?
            .into_iter()
            .map(|e| (e.created, e))
            .collect();

        // Row 1 is the header
        for (index, row) in rows.iter().enumerate().skip(1) {
            let remote = decode_row(row).map_err(|reason| SyncError::InvalidRow {
                ledger: ledger.to_string(),
                row: index + 1,
                reason,
            })?;
            let Some(remote) = remote else {
                continue;
            };

            let Some(created) = remote.created else {
                let entry = self.store.add_entry(ledger, remote.content).await?;
                debug!(created = entry.created, "Pulled new row without identity");
                local.insert(entry.created, entry);
                report.pulled_added += 1;
                continue;
            };

            if tombstones.iter().any(|t| t.blocks(ledger, created)) {
                debug!(created, "Skipping recently deleted row");
                report.skipped_tombstoned += 1;
                continue;
            }

            match local.get(&created).map(|e| e.differs_from(&remote.content)) {
                None => {
                    let Some(entry) = remote.into_entry() else {
                        continue;
                    };
                    let entry = self.store.insert_entry(ledger, entry).await?;
                    debug!(created, "Pulled new row");
                    local.insert(created, entry);
                    report.pulled_added += 1;
                }
                Some(true) => {
                    let entry = self
                        .store
                        .update_entry(ledger, created, remote.content)
                        .await?;
                    debug!(created, "Pulled changed row");
                    local.insert(created, entry);
                    report.pulled_updated += 1;
                }
                Some(false) => {}
            }
        }

        Ok(rows.len())
    }

    async fn push(
        &self,
        ledger: &str,
        sheet_id: &str,
        remote_len: usize,
        report: &mut ReconcileReport,
    ) -> Result<(), SyncError> {
        let entries = self
            .store
            .get_ledger(ledger)
            .await?
            .ok_or_else(|| StoreError::LedgerNotFound(ledger.to_string()))?;
        let pending = self.store.tombstones_for(ledger).await?.len();

        if entries.is_empty() && pending == 0 {
            debug!(ledger, "Ledger has no entries; nothing to push");
            return Ok(());
        }

        let mut rows = Vec::with_capacity(entries.len() + 1);
        rows.push(header_row());
        rows.extend(entries.iter().map(entry_row));
        let row_count = rows.len();
        let range = push_range(row_count);

        let backend = &self.backend;
        let range_ref = range.as_str();
        self.client
            .call("write_range", |token| {
                let rows = rows.clone();
                async move { backend.write_range(&token, sheet_id, range_ref, rows).await }
            })
            .await?;
        report.pushed_rows = row_count as u32;

        if remote_len > row_count {
            let end = remote_len;
            self.client
                .call("delete_rows", |token| async move {
                    backend
                        .delete_rows(&token, sheet_id, FIRST_SHEET_ID, row_count, end)
                        .await
                })
                .await?;
            report.purged_rows = (end - row_count) as u32;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use entirelife_core::domain::ResourceKind;
    use serde_json::json;

    use super::*;
    use crate::test_support::{Harness, T0};

    #[tokio::test]
    async fn test_push_writes_header_and_entries() {
        let h = Harness::new();
        let entry = h.add_alice().await;

        let report = h.reconciler().reconcile("Alice").await.unwrap();
        assert_eq!(report.pushed_rows, 2);
        assert_eq!(report.purged_rows, 0);
        assert!(!report.changed_local_data());

        let writes = h.backend.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].1, "Sheet1!A1:F2");
        assert_eq!(writes[0].2, vec![header_row(), entry_row(&entry)]);
    }

    #[tokio::test]
    async fn test_push_then_pull_is_idempotent() {
        let h = Harness::new();
        h.add_alice().await;
        let reconciler = h.reconciler();

        reconciler.reconcile("Alice").await.unwrap();
        let before = h.store.get_ledger("Alice").await.unwrap();
        let report = reconciler.reconcile("Alice").await.unwrap();

        assert!(!report.changed_local_data());
        assert_eq!(h.store.get_ledger("Alice").await.unwrap(), before);
        let writes = h.backend.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0], writes[1]);
    }

    #[tokio::test]
    async fn test_pull_adds_updates_and_skips() {
        let h = Harness::new();
        let entry = h.add_alice().await;
        let reconciler = h.reconciler();
        reconciler.reconcile("Alice").await.unwrap();
        let sheet = h.backend.find("Alice", ResourceKind::Spreadsheet)[0]
            .id
            .clone();

        let mut edited = entry_row(&entry);
        edited[2] = json!("Hello again!");
        h.backend.set_rows(
            &sheet,
            vec![
                header_row(),
                edited,
                vec![json!("2000-05-05"), json!(""), json!("typed in the sheet")],
                vec![json!("2001-01-01"), json!(""), json!("from a phone"), json!(""), json!(5), json!(6)],
                vec![],
            ],
        );
        h.clock.advance(1_000);

        let report = reconciler.reconcile("Alice").await.unwrap();
        assert_eq!(report.pulled_updated, 1);
        assert_eq!(report.pulled_added, 2);
        assert!(report.changed_local_data());

        let entries = h.store.get_ledger("Alice").await.unwrap().unwrap();
        assert_eq!(entries.len(), 3);
        let updated = entries.iter().find(|e| e.created == entry.created).unwrap();
        assert_eq!(updated.title, "Hello again!");
        assert_eq!(updated.updated, h.store.now());
        let phone = entries.iter().find(|e| e.created == 5).unwrap();
        assert_eq!(phone.updated, 6);
        assert!(entries.iter().any(|e| e.title == "typed in the sheet"));

        // Pushed back: header + 3 rows, now all with identities; the blank
        // row is trimmed
        let rows = h.backend.rows(&sheet);
        assert_eq!(report.purged_rows, 1);
        assert_eq!(rows.len(), 4);
        assert!(rows[1..].iter().all(|r| r.len() == 6 && r[4].is_i64()));
    }

    #[tokio::test]
    async fn test_tombstoned_rows_are_not_resurrected() {
        let h = Harness::new();
        let entry = h.add_alice().await;
        let reconciler = h.reconciler();
        reconciler.reconcile("Alice").await.unwrap();
        let sheet = h.backend.find("Alice", ResourceKind::Spreadsheet)[0]
            .id
            .clone();

        h.store.delete_entry("Alice", entry.created).await.unwrap();
        let report = reconciler.reconcile("Alice").await.unwrap();

        assert_eq!(report.skipped_tombstoned, 1);
        assert_eq!(report.pulled_added, 0);
        assert!(h.store.get_ledger("Alice").await.unwrap().unwrap().is_empty());
        // Header rewritten, stale trailing row deleted
        assert_eq!(report.pushed_rows, 1);
        assert_eq!(report.purged_rows, 1);
        assert_eq!(h.backend.rows(&sheet), vec![header_row()]);
    }

    #[tokio::test]
    async fn test_blank_rows_do_not_leave_duplicates() {
        let h = Harness::new();
        let entry = h.add_alice().await;
        let folder = h.backend.seed_folder("Entire.Life");
        let created = T0 + 1;
        let phone = vec![
            json!("2001-01-01"),
            json!(""),
            json!("from a phone"),
            json!(""),
            json!(created),
            json!(created),
        ];
        let sheet = h.backend.seed_spreadsheet(
            &folder,
            "Alice",
            vec![header_row(), entry_row(&entry), vec![], phone],
        );
        let reconciler = h.reconciler();

        let first = reconciler.reconcile("Alice").await.unwrap();
        assert_eq!(first.pulled_added, 1);
        assert_eq!(first.purged_rows, 1);
        let second = reconciler.reconcile("Alice").await.unwrap();
        assert!(!second.changed_local_data());
        assert_eq!(second.purged_rows, 0);

        let rows = h.backend.rows(&sheet);
        assert_eq!(rows.len(), 3);
        let copies = rows.iter().filter(|r| r.get(4) == Some(&json!(created))).count();
        assert_eq!(copies, 1);
    }

    #[tokio::test]
    async fn test_empty_ledger_is_not_pushed() {
        let h = Harness::new();
        h.store.add_empty_ledger("Bob").await.unwrap();

        let report = h.reconciler().reconcile("Bob").await.unwrap();
        assert_eq!(report.pushed_rows, 0);
        assert!(h.backend.writes().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_row_aborts() {
        let h = Harness::new();
        h.add_alice().await;
        let folder = h.backend.seed_folder("Entire.Life");
        h.backend.seed_spreadsheet(
            &folder,
            "Alice",
            vec![header_row(), vec![json!("not a date"), json!(""), json!("t")]],
        );

        let err = h.reconciler().reconcile("Alice").await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidRow { row: 2, .. }));
        assert!(h.backend.writes().is_empty());
    }

    #[tokio::test]
    async fn test_same_ledger_reconciles_are_serialized() {
        let h = Harness::new();
        h.add_alice().await;
        let reconciler = h.reconciler();

        let (a, b) = tokio::join!(reconciler.reconcile("Alice"), reconciler.reconcile("Alice"));
        a.unwrap();
        b.unwrap();

        assert_eq!(h.store.get_ledger("Alice").await.unwrap().unwrap().len(), 1);
        assert_eq!(h.backend.writes().len(), 2);
    }
}
