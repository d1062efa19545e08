//! Sync worker - runs sync cycles in the background on request
//!
//! A [`SyncWorker`] owns a [`SyncOrchestrator`] and runs one cycle per
//! [`SyncSignal::Sync`] it receives. Requests that arrive while a cycle is
//! pending collapse into that pending request.
//!
//! ## Flow
//!
//! ```text
//! Journal / timer ──→ WorkerRegistry::broadcast ──→ WorkerHandle::send
//!                                                         │ mpsc(1)
//!                                                         ▼
//!                                               SyncWorker::run ──→ run_cycle()
//! ```
//!
//! Workers are registered by name. Registering a second worker under a name
//! already in use keeps the first one and shuts the newcomer down.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use entirelife_core::ports::{EngineSignal, ISignalSink, SyncSignal};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::orchestrator::{SyncOrchestrator, SyncOutcome};

// ============================================================================
// SyncWorker
// ============================================================================

/// Background task running sync cycles
pub struct SyncWorker {
    name: String,
    orchestrator: Arc<SyncOrchestrator>,
    rx: mpsc::Receiver<SyncSignal>,
    cancel: CancellationToken,
}

impl SyncWorker {
    /// Spawns a worker and returns the handle used to drive it
    ///
    /// # Arguments
    /// * `name` - Registry key, also used in logs
    /// * `orchestrator` - The engine the worker runs
    pub fn spawn(name: impl Into<String>, orchestrator: Arc<SyncOrchestrator>) -> WorkerHandle {
        let name = name.into();
        let (tx, rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let worker = Self {
            name: name.clone(),
            orchestrator,
            rx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(worker.run());

        WorkerHandle {
            name,
            tx,
            cancel,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }

    /// Main loop; ends on cancellation or when every handle is dropped
    async fn run(mut self) {
        info!(worker = %self.name, "Sync worker starting");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!(worker = %self.name, "Sync worker cancelled");
                    break;
                }
                signal = self.rx.recv() => {
                    match signal {
                        Some(SyncSignal::Sync) => self.sync_once().await,
                        None => {
                            info!(worker = %self.name, "Sync channel closed, worker stopping");
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn sync_once(&self) {
        match self.orchestrator.run_cycle().await {
            Ok(SyncOutcome::Completed(summary)) => debug!(
                worker = %self.name,
                ledgers = summary.reports.len(),
                duration_ms = summary.duration_ms,
                "Sync cycle completed"
            ),
            Ok(SyncOutcome::Deferred) => {
                debug!(worker = %self.name, "Sync cycle deferred until signed in")
            }
            // Already logged by the orchestrator; the next signal retries
            Err(e) => debug!(worker = %self.name, error = %e, "Sync cycle failed"),
        }
    }
}

// ============================================================================
// WorkerHandle
// ============================================================================

/// Cloneable handle to a running [`SyncWorker`]
#[derive(Clone)]
pub struct WorkerHandle {
    name: String,
    tx: mpsc::Sender<SyncSignal>,
    cancel: CancellationToken,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl WorkerHandle {
    /// Name the worker was spawned with
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Requests a cycle
    ///
    /// # Returns
    /// `false` if the worker has stopped. A request that finds another one
    /// already pending is merged into it and still counts as delivered.
    pub fn send(&self, signal: SyncSignal) -> bool {
        match self.tx.try_send(signal) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(worker = %self.name, "Sync already pending, request merged");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Whether the worker has been shut down
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }

    /// Stops the worker and waits for the running cycle to finish
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let task = self.task.lock().ok().and_then(|mut t| t.take());
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(worker = %self.name, error = %e, "Sync worker ended abnormally");
            }
        }
    }
}

// ============================================================================
// WorkerRegistry
// ============================================================================

/// Named collection of running workers
#[derive(Default)]
pub struct WorkerRegistry {
    workers: DashMap<String, WorkerHandle>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a worker under `name`
    ///
    /// # Returns
    /// The handle now registered under `name`. If a worker already held the
    /// name, that worker is returned and `handle` is cancelled.
    pub fn set(&self, name: &str, handle: WorkerHandle) -> WorkerHandle {
        match self.workers.entry(name.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(existing) => {
                warn!(worker = name, "A sync worker with this name already exists");
                handle.cancel.cancel();
                existing.get().clone()
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                info!(worker = name, "Registered sync worker");
                slot.insert(handle.clone());
                handle
            }
        }
    }

    /// Looks up a worker
    pub fn get(&self, name: &str) -> Option<WorkerHandle> {
        self.workers.get(name).map(|h| h.clone())
    }

    /// Sends `signal` to every registered worker
    ///
    /// # Returns
    /// How many workers accepted the signal
    pub fn broadcast(&self, signal: SyncSignal) -> usize {
        let handles: Vec<WorkerHandle> = self.workers.iter().map(|h| h.clone()).collect();
        handles.iter().filter(|h| h.send(signal)).count()
    }

    /// Shuts down and forgets every worker
    pub async fn shutdown(&self) {
        let handles: Vec<WorkerHandle> = self.workers.iter().map(|h| h.clone()).collect();
        self.workers.clear();
        for handle in handles {
            handle.shutdown().await;
        }
    }
}

// ============================================================================
// ChannelSignalSink
// ============================================================================

/// Signal sink forwarding engine signals to a channel
///
/// Lets a host react to [`EngineSignal::AuthError`] and friends from its own
/// task.
#[derive(Clone)]
pub struct ChannelSignalSink {
    tx: mpsc::UnboundedSender<EngineSignal>,
}

impl ChannelSignalSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EngineSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ISignalSink for ChannelSignalSink {
    fn emit(&self, signal: EngineSignal) {
        if self.tx.send(signal).is_err() {
            error!(%signal, "Signal receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use entirelife_core::domain::ResourceKind;

    use super::*;
    use crate::test_support::{Harness, RecordingSink};

    fn synced_count(signals: &RecordingSink) -> usize {
        signals
            .signals()
            .into_iter()
            .filter(|s| *s == EngineSignal::Synced)
            .count()
    }

    async fn wait_for_synced(signals: &RecordingSink, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while synced_count(signals) < count {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_worker_runs_cycle_on_signal() {
        let h = Harness::new();
        h.add_alice().await;
        let handle = SyncWorker::spawn("main", Arc::new(h.orchestrator()));

        assert!(handle.send(SyncSignal::Sync));
        wait_for_synced(&h.signals, 1).await;

        assert_eq!(h.backend.find("Alice", ResourceKind::Spreadsheet).len(), 1);
        handle.shutdown().await;
        assert!(!handle.send(SyncSignal::Sync));
        assert!(handle.is_stopped());
    }

    #[tokio::test]
    async fn test_pending_requests_are_merged() {
        let h = Harness::new();
        let handle = SyncWorker::spawn("main", Arc::new(h.orchestrator()));

        // The worker has not been polled yet, so the first request fills the
        // slot and the rest merge into it
        for _ in 0..5 {
            assert!(handle.send(SyncSignal::Sync));
        }
        wait_for_synced(&h.signals, 1).await;
        handle.shutdown().await;

        assert_eq!(synced_count(&h.signals), 1);
    }

    #[tokio::test]
    async fn test_registry_keeps_first_worker() {
        let h = Harness::new();
        let registry = WorkerRegistry::new();
        let first = SyncWorker::spawn("main", Arc::new(h.orchestrator()));
        let second = SyncWorker::spawn("main", Arc::new(h.orchestrator()));

        registry.set("main", first.clone());
        let kept = registry.set("main", second.clone());

        assert!(!kept.is_stopped());
        assert!(second.is_stopped());
        assert_eq!(registry.get("main").unwrap().name(), "main");
        assert!(registry.get("other").is_none());

        assert_eq!(registry.broadcast(SyncSignal::Sync), 1);
        registry.shutdown().await;
        assert!(first.is_stopped());
        assert_eq!(registry.broadcast(SyncSignal::Sync), 0);
    }

    #[test]
    fn test_channel_sink_forwards() {
        let (sink, mut rx) = ChannelSignalSink::new();
        sink.emit(EngineSignal::AuthError);
        assert_eq!(rx.try_recv().unwrap(), EngineSignal::AuthError);
    }
}
