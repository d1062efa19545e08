//! Sync orchestrator
//!
//! One [`SyncOrchestrator::run_cycle`] call is one full sync:
//!
//! 1. **Discover**: adopt spreadsheets in the container that have no local
//!    ledger yet, as empty ledgers
//! 2. **Reconcile**: pull then push every local ledger, one after another
//! 3. **Report**: emit `synced`, and `dataUpdated` if local data changed
//!
//! Credential problems end the cycle as [`SyncOutcome::Deferred`]; the next
//! `sync` signal tries again. Every other error aborts the cycle and is
//! returned.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use entirelife_core::ports::{EngineSignal, ILedgerNamePrompt, ISignalSink};
use entirelife_core::usecases::LocalStore;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::reconciler::{ReconcileReport, Reconciler};
use crate::resolver::RemoteResourceResolver;
use crate::retention::TombstoneJanitor;
use crate::SyncError;

/// How many alternative names are asked for per discovered spreadsheet
const MAX_NAME_RETRIES: u32 = 2;

// ============================================================================
// SyncSummary / SyncOutcome
// ============================================================================

/// Summary of a completed sync cycle
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncSummary {
    /// Ledgers created locally from remote spreadsheets
    pub discovered: Vec<String>,
    /// One report per reconciled ledger, in processing order
    pub reports: Vec<ReconcileReport>,
    /// Wall-clock duration of the cycle in milliseconds
    pub duration_ms: u64,
}

impl SyncSummary {
    /// Returns true if the cycle changed local data
    pub fn changed_local_data(&self) -> bool {
        !self.discovered.is_empty() || self.reports.iter().any(ReconcileReport::changed_local_data)
    }
}

/// Result of one sync cycle
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    /// Every ledger was reconciled
    Completed(SyncSummary),
    /// The cycle stopped on a credential problem and should be retried later
    Deferred,
}

// ============================================================================
// SyncOrchestrator
// ============================================================================

/// Runs full sync cycles
pub struct SyncOrchestrator {
    store: Arc<LocalStore>,
    resolver: Arc<RemoteResourceResolver>,
    reconciler: Reconciler,
    prompt: Arc<dyn ILedgerNamePrompt>,
    signals: Arc<dyn ISignalSink>,
}

impl SyncOrchestrator {
    /// Creates an orchestrator
    ///
    /// # Arguments
    /// * `store` - Local ledgers
    /// * `resolver` - Shared resolver of this execution context
    /// * `reconciler` - Per-ledger pull/push
    /// * `prompt` - Asked for a new name when a discovered one is rejected
    /// * `signals` - Receives `synced` and `dataUpdated`
    pub fn new(
        store: Arc<LocalStore>,
        resolver: Arc<RemoteResourceResolver>,
        reconciler: Reconciler,
        prompt: Arc<dyn ILedgerNamePrompt>,
        signals: Arc<dyn ISignalSink>,
    ) -> Self {
        Self {
            store,
            resolver,
            reconciler,
            prompt,
            signals,
        }
    }

    /// Runs one full sync cycle
    ///
    /// # Returns
    /// `Deferred` if the cycle hit a stale or missing credential
    ///
    /// # Errors
    /// Any other failure, after which the rest of the cycle is skipped
    #[tracing::instrument(skip(self))]
    pub async fn run_cycle(&self) -> Result<SyncOutcome, SyncError> {
        let start = Instant::now();
        info!("Starting sync cycle");

        match self.cycle().await {
            Ok(mut summary) => {
                summary.duration_ms = start.elapsed().as_millis() as u64;
                info!(
                    ledgers = summary.reports.len(),
                    discovered = summary.discovered.len(),
                    duration_ms = summary.duration_ms,
                    "Sync cycle complete"
                );

                self.signals.emit(EngineSignal::Synced);
                if summary.changed_local_data() {
                    self.signals.emit(EngineSignal::DataUpdated);
                }
                Ok(SyncOutcome::Completed(summary))
            }
            Err(e) if e.is_deferrable() => {
                warn!(error = %e, "Sync deferred until the credential is renewed");
                Ok(SyncOutcome::Deferred)
            }
            Err(e) => {
                error!(error = %e, "Sync cycle failed");
                Err(e)
            }
        }
    }

    /// Runs one cycle, then purges the tombstones whose retention has passed
    ///
    /// Hosts that do not keep a janitor running use this instead of
    /// [`run_cycle`](Self::run_cycle). Expired tombstones are only removed
    /// once a completed cycle has pushed their deletions; a deferred cycle
    /// keeps them so the next pull still skips the stale rows.
    pub async fn run_cycle_then_purge(
        &self,
        janitor: &TombstoneJanitor,
    ) -> Result<SyncOutcome, SyncError> {
        let outcome = self.run_cycle().await?;
        if let SyncOutcome::Completed(_) = outcome {
            let purged = janitor.purge_expired().await?;
            if purged > 0 {
                info!(purged, "Purged expired tombstones after sync");
            }
        }
        Ok(outcome)
    }

    async fn cycle(&self) -> Result<SyncSummary, SyncError> {
        let mut summary = SyncSummary {
            discovered: self.discover().await?,
            ..Default::default()
        };

        for ledger in self.store.list_ledger_names().await? {
            summary.reports.push(self.reconciler.reconcile(&ledger).await?);
        }

        Ok(summary)
    }

    /// Creates an empty local ledger for every unknown remote spreadsheet
    async fn discover(&self) -> Result<Vec<String>, SyncError> {
        let local: HashSet<String> = self.store.list_ledger_names().await?.into_iter().collect();
        let remote = self.resolver.list_resources().await?;

        let mut discovered = Vec::new();
        for resource in remote.iter().filter(|r| !local.contains(&r.name)) {
            if let Some(name) = self.adopt(&resource.name).await? {
                info!(ledger = %name, "Discovered remote ledger");
                discovered.push(name);
            }
        }
        Ok(discovered)
    }

    /// Creates a local ledger for `remote_name`, asking for another name if
    /// the store rejects it
    ///
    /// # Returns
    /// The local name, or `None` if the spreadsheet was skipped
    async fn adopt(&self, remote_name: &str) -> Result<Option<String>, SyncError> {
        let mut candidate = remote_name.to_string();
        let mut retries = 0;

        loop {
            let rejection = match self.store.add_empty_ledger(&candidate).await {
                Ok(name) => return Ok(Some(name.into_inner())),
                Err(e) if e.is_validation() => e,
                Err(e) => return Err(e.into()),
            };

            if retries >= MAX_NAME_RETRIES {
                warn!(remote = remote_name, error = %rejection, "Giving up on remote ledger");
                return Ok(None);
            }
            retries += 1;

            match self
                .prompt
                .alternative_name(remote_name, &rejection.to_string())
                .await
            {
                Some(name) => candidate = name,
                None => {
                    warn!(remote = remote_name, error = %rejection, "Skipping remote ledger");
                    return Ok(None);
                }
            }
        }
    }
}
