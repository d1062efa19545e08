//! Shared wiring for CLI commands
//!
//! Loads the configuration once and builds the adapters every command needs:
//! the SQLite-backed [`LocalStore`], the Google backend, the interactive
//! sign-in flow and the sync engine.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use entirelife_cache::{pool::DatabasePool, SqliteKeyValueStore};
use entirelife_core::config::Config;
use entirelife_core::ports::{
    ILedgerNamePrompt, ISignalSink, ITabularBackend, ITokenProvider, SystemClock,
};
use entirelife_core::usecases::LocalStore;
use entirelife_google::{
    GoogleAuthAdapter, GoogleError, GoogleSheetsBackend, GoogleTokenProvider, OAuth2Config,
    SheetsClient,
};
use entirelife_sync::{
    AuthAwareClient, Journal, Reconciler, RemoteResourceResolver, SyncOrchestrator,
    TombstoneJanitor, WorkerRegistry,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;

/// Configuration plus the path it was loaded from
pub struct AppContext {
    pub config: Config,
    pub config_path: PathBuf,
}

impl AppContext {
    /// Loads the configuration from `path`, or the default location
    ///
    /// A missing file yields the defaults; an unreadable or invalid one is
    /// reported and the defaults are used instead.
    pub fn load(path: Option<&str>) -> Self {
        let config_path = path.map(PathBuf::from).unwrap_or_else(Config::default_path);
        let config = if config_path.exists() {
            match Config::load(&config_path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Ignoring {}: {e:#}", config_path.display());
                    Config::default()
                }
            }
        } else {
            Config::default()
        };

        Self {
            config,
            config_path,
        }
    }

    /// Opens the local database and returns the store over it
    pub async fn open_store(&self) -> Result<Arc<LocalStore>> {
        let pool = DatabasePool::new(&self.config.storage.database)
            .await
            .context("Failed to open database")?;
        let kv = Arc::new(SqliteKeyValueStore::new(pool.pool().clone()));
        Ok(Arc::new(LocalStore::new(kv, Arc::new(SystemClock))))
    }

    /// Journal over the local store with no background workers attached
    ///
    /// Deletions still schedule their tombstone purge, which only fires if
    /// the process lives long enough; `sync` purges whatever has expired.
    pub async fn journal(&self) -> Result<Journal> {
        let store = self.open_store().await?;
        let janitor = self.janitor(store.clone());
        Ok(Journal::new(store, Arc::new(WorkerRegistry::new()), janitor))
    }

    /// Google Drive / Sheets backend configured from `google.*`
    pub fn backend(&self) -> Result<Arc<GoogleSheetsBackend>> {
        let google = &self.config.google;
        let client = SheetsClient::new(
            google.api_key.clone(),
            Duration::from_secs(google.http_timeout_secs),
        )
        .context("Failed to create HTTP client")?;
        Ok(Arc::new(GoogleSheetsBackend::new(client)))
    }

    /// Interactive browser sign-in flow
    ///
    /// # Errors
    /// `google.client_id` is not configured
    pub fn interactive_auth(&self) -> Result<Arc<GoogleAuthAdapter>> {
        let google = &self.config.google;
        let client_id = google.client_id.clone().ok_or(GoogleError::MissingClientId)?;

        let mut oauth = OAuth2Config::new(client_id).with_redirect_port(google.redirect_port);
        if let Some(secret) = &google.client_secret {
            oauth = oauth.with_client_secret(secret.clone());
        }
        Ok(Arc::new(GoogleAuthAdapter::new(oauth)))
    }

    /// Token provider able to open a browser when the credential is rejected
    pub fn interactive_tokens(&self, store: Arc<LocalStore>) -> Result<Arc<GoogleTokenProvider>> {
        Ok(Arc::new(GoogleTokenProvider::new(
            store,
            self.interactive_auth()?,
        )))
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.config.sync.tombstone_retention_secs)
    }

    /// Starts the tombstone janitor
    pub fn janitor(&self, store: Arc<LocalStore>) -> Arc<TombstoneJanitor> {
        Arc::new(TombstoneJanitor::spawn(store, self.retention()))
    }

    /// Builds the sync engine around `tokens`
    pub fn orchestrator(
        &self,
        store: Arc<LocalStore>,
        backend: Arc<dyn ITabularBackend>,
        tokens: Arc<dyn ITokenProvider>,
        prompt: Arc<dyn ILedgerNamePrompt>,
        signals: Arc<dyn ISignalSink>,
    ) -> SyncOrchestrator {
        let client = Arc::new(AuthAwareClient::new(tokens, signals.clone()));
        let resolver = Arc::new(RemoteResourceResolver::new(
            backend.clone(),
            client.clone(),
            self.config.sync.folder_name.clone(),
        ));
        let reconciler = Reconciler::new(store.clone(), backend, client, resolver.clone());
        SyncOrchestrator::new(store, resolver, reconciler, prompt, signals)
    }
}

// ============================================================================
// TerminalPrompt
// ============================================================================

/// Asks for an alternative ledger name on the terminal
pub struct TerminalPrompt;

#[async_trait::async_trait]
impl ILedgerNamePrompt for TerminalPrompt {
    async fn alternative_name(&self, remote_name: &str, reason: &str) -> Option<String> {
        let question = format!(
            "Found spreadsheet \"{remote_name}\" in Google Drive, but it cannot be used as a \
             ledger name:\n  {reason}\nEnter another name (empty to skip): "
        );

        let mut stdout = tokio::io::stdout();
        if let Err(e) = stdout.write_all(question.as_bytes()).await {
            warn!(error = %e, "Failed to write prompt");
            return None;
        }
        let _ = stdout.flush().await;

        let mut line = String::new();
        match BufReader::new(tokio::io::stdin()).read_line(&mut line).await {
            Ok(0) => None,
            Ok(_) => Some(line.trim().to_string()).filter(|name| !name.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read answer");
                None
            }
        }
    }
}
