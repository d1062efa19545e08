//! Sync command - Synchronize ledgers with Google Sheets
//!
//! Provides the `entirelife sync` CLI command which:
//! 1. Loads configuration and opens the local database
//! 2. Creates the Google adapters and the sync engine
//! 3. Runs one sync cycle and displays what changed, or with `--watch` keeps
//!    a background worker running until interrupted

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use entirelife_core::ports::{EngineSignal, ITokenProvider, NoPrompt, NullSignalSink, SyncSignal};
use entirelife_core::usecases::LocalStore;
use entirelife_google::BackgroundTokenProvider;
use entirelife_sync::{ChannelSignalSink, SyncOutcome, SyncSummary, SyncWorker, WorkerRegistry};
use tracing::{info, warn};

use crate::context::{AppContext, TerminalPrompt};
use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Registry name of the watch-mode worker
const WATCH_WORKER: &str = "sync";

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Keep running and sync periodically until interrupted
    #[arg(long)]
    pub watch: bool,

    /// Seconds between cycles in watch mode (default: sync.watch_interval_secs)
    #[arg(long, requires = "watch")]
    pub interval: Option<u64>,
}

impl SyncCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        if self.watch {
            self.execute_watch(ctx, format).await
        } else {
            self.execute_once(ctx, format).await
        }
    }

    /// Runs a single cycle in the foreground
    ///
    /// A rejected credential may open the browser for a new sign-in.
    async fn execute_once(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let store = ctx.open_store().await?;
        let backend = ctx.backend()?;

        let janitor = ctx.janitor(store.clone());
        let orchestrator = ctx.orchestrator(
            store.clone(),
            backend,
            foreground_tokens(ctx, store),
            Arc::new(TerminalPrompt),
            Arc::new(NullSignalSink),
        );

        formatter.info(&format!(
            "Syncing with Google Drive folder \"{}\"...",
            ctx.config.sync.folder_name
        ));

        let outcome = orchestrator
            .run_cycle_then_purge(&janitor)
            .await
            .context("Sync failed")?;
        match outcome {
            SyncOutcome::Completed(summary) => print_summary(&*formatter, format, &summary)?,
            SyncOutcome::Deferred => {
                if format.is_json() {
                    formatter.print_json(&serde_json::json!({"deferred": true}));
                } else {
                    formatter.warn("Sync postponed: sign in with 'entirelife auth login'");
                }
            }
        }

        janitor.shutdown();
        Ok(())
    }

    /// Runs a background worker until Ctrl-C
    ///
    /// The worker never opens a browser. When it reports an authorization
    /// error the credential is renewed here, in the foreground, and a new
    /// cycle is requested. Tombstones left by earlier processes are only
    /// scheduled for purging after the first completed cycle.
    async fn execute_watch(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let store = ctx.open_store().await?;
        let backend = ctx.backend()?;
        let interval = Duration::from_secs(
            self.interval
                .unwrap_or(ctx.config.sync.watch_interval_secs)
                .max(1),
        );

        let janitor = ctx.janitor(store.clone());
        let mut resumed = false;

        let (sink, mut signals) = ChannelSignalSink::new();
        let orchestrator = ctx.orchestrator(
            store.clone(),
            backend,
            Arc::new(BackgroundTokenProvider::new(store.clone())),
            Arc::new(NoPrompt),
            Arc::new(sink),
        );

        let registry = WorkerRegistry::new();
        registry.set(
            WATCH_WORKER,
            SyncWorker::spawn(WATCH_WORKER, Arc::new(orchestrator)),
        );
        let renewer = foreground_tokens(ctx, store.clone());

        formatter.success(&format!(
            "Watching; syncing every {}s (Ctrl-C to stop)",
            interval.as_secs()
        ));

        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, stopping sync worker");
                    break;
                }
                _ = ticker.tick() => {
                    registry.broadcast(SyncSignal::Sync);
                }
                signal = signals.recv() => {
                    let Some(signal) = signal else { break };
                    match signal {
                        EngineSignal::Synced => {
                            if !resumed {
                                janitor.resume().await?;
                                resumed = true;
                            }
                            formatter.info(&format!(
                                "Synced at {}",
                                chrono::Local::now().format("%H:%M:%S")
                            ));
                        }
                        EngineSignal::DataUpdated => {
                            formatter.info("Local ledgers updated from Google Sheets")
                        }
                        EngineSignal::AuthError => {
                            if renew_credential(&*renewer, &*formatter).await {
                                registry.broadcast(SyncSignal::Sync);
                            }
                        }
                    }
                }
            }
        }

        registry.shutdown().await;
        janitor.shutdown();
        formatter.success("Stopped");
        Ok(())
    }
}

/// Token provider for foreground use
///
/// Falls back to the stored credential alone when no OAuth client is
/// configured.
fn foreground_tokens(ctx: &AppContext, store: Arc<LocalStore>) -> Arc<dyn ITokenProvider> {
    match ctx.interactive_tokens(store.clone()) {
        Ok(tokens) => tokens as Arc<dyn ITokenProvider>,
        Err(e) => {
            warn!(error = %e, "Interactive sign-in unavailable");
            Arc::new(BackgroundTokenProvider::new(store))
        }
    }
}

async fn renew_credential(tokens: &dyn ITokenProvider, formatter: &dyn OutputFormatter) -> bool {
    formatter.info("Google rejected the credential; renewing it...");
    match tokens.request_new_token().await {
        Ok(_) => true,
        Err(e) => {
            formatter.warn(&format!("Could not renew the credential: {e:#}"));
            false
        }
    }
}

fn print_summary(
    formatter: &dyn OutputFormatter,
    format: OutputFormat,
    summary: &SyncSummary,
) -> Result<()> {
    if format.is_json() {
        formatter.print_json(&serde_json::to_value(summary)?);
        return Ok(());
    }

    let duration_display = if summary.duration_ms >= 1000 {
        format!("{:.1}s", summary.duration_ms as f64 / 1000.0)
    } else {
        format!("{}ms", summary.duration_ms)
    };

    if summary.changed_local_data() {
        formatter.success(&format!("Sync completed in {}", duration_display));
    } else {
        formatter.success("Already up to date");
    }

    for name in &summary.discovered {
        formatter.info(&format!("New ledger from Google Sheets: {name}"));
    }
    for report in &summary.reports {
        let mut parts = Vec::new();
        if report.pulled_added > 0 {
            parts.push(format!("{} added", report.pulled_added));
        }
        if report.pulled_updated > 0 {
            parts.push(format!("{} updated", report.pulled_updated));
        }
        if report.skipped_tombstoned > 0 {
            parts.push(format!("{} deleted rows ignored", report.skipped_tombstoned));
        }
        if report.purged_rows > 0 {
            parts.push(format!("{} rows removed remotely", report.purged_rows));
        }
        let detail = if parts.is_empty() {
            "no local changes".to_string()
        } else {
            parts.join(", ")
        };
        formatter.info(&format!("{}: {}", report.ledger, detail));
    }
    Ok(())
}
