//! Shared fixtures for the engine's unit tests

use std::sync::{Arc, Mutex};

use entirelife_cache::MemoryKeyValueStore;
use entirelife_core::domain::{Entry, EntryContent};
use entirelife_core::ports::{
    AccessToken, EngineSignal, ILedgerNamePrompt, ISignalSink, ITokenProvider, ManualClock,
    NoPrompt,
};
use entirelife_core::usecases::LocalStore;

use crate::auth_client::AuthAwareClient;
use crate::memory::InMemoryBackend;
use crate::orchestrator::SyncOrchestrator;
use crate::reconciler::Reconciler;
use crate::resolver::RemoteResourceResolver;

/// Start time of every harness clock
pub const T0: i64 = 1_600_000_000_000;

/// Token provider holding one token; a refresh swaps in `refreshed`
pub struct TokenStub {
    current: Mutex<Option<AccessToken>>,
    refreshed: Option<String>,
    pub refreshes: Mutex<usize>,
}

impl TokenStub {
    pub fn new(current: Option<&str>, refreshed: Option<&str>) -> Self {
        Self {
            current: Mutex::new(current.map(AccessToken::bearer)),
            refreshed: refreshed.map(str::to_string),
            refreshes: Mutex::new(0),
        }
    }
}

#[async_trait::async_trait]
impl ITokenProvider for TokenStub {
    async fn current_token(&self) -> anyhow::Result<Option<AccessToken>> {
        Ok(self.current.lock().unwrap().clone())
    }

    async fn request_new_token(&self) -> anyhow::Result<AccessToken> {
        *self.refreshes.lock().unwrap() += 1;
        let Some(secret) = &self.refreshed else {
            anyhow::bail!("cannot sign in from here");
        };
        let token = AccessToken::bearer(secret.clone());
        *self.current.lock().unwrap() = Some(token.clone());
        Ok(token)
    }

    async fn revoke_token(&self) -> anyhow::Result<()> {
        *self.current.lock().unwrap() = None;
        Ok(())
    }
}

/// Sink that remembers every signal
#[derive(Default)]
pub struct RecordingSink(Mutex<Vec<EngineSignal>>);

impl RecordingSink {
    pub fn signals(&self) -> Vec<EngineSignal> {
        self.0.lock().unwrap().clone()
    }
}

impl ISignalSink for RecordingSink {
    fn emit(&self, signal: EngineSignal) {
        self.0.lock().unwrap().push(signal);
    }
}

/// A store, a backend and the engine pieces wired together
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub store: Arc<LocalStore>,
    pub backend: Arc<InMemoryBackend>,
    pub tokens: Arc<TokenStub>,
    pub signals: Arc<RecordingSink>,
    pub client: Arc<AuthAwareClient>,
    pub resolver: Arc<RemoteResourceResolver>,
}

impl Harness {
    /// Signed in with token `t`, no refresh possible
    pub fn new() -> Self {
        Self::with_tokens(TokenStub::new(Some("t"), None))
    }

    pub fn with_tokens(tokens: TokenStub) -> Self {
        let clock = Arc::new(ManualClock::new(T0));
        let store = Arc::new(LocalStore::new(
            Arc::new(MemoryKeyValueStore::new()),
            clock.clone(),
        ));
        let backend = Arc::new(InMemoryBackend::new());
        let tokens = Arc::new(tokens);
        let signals = Arc::new(RecordingSink::default());
        let client = Arc::new(AuthAwareClient::new(tokens.clone(), signals.clone()));
        let resolver = Arc::new(RemoteResourceResolver::new(
            backend.clone(),
            client.clone(),
            "Entire.Life",
        ));

        Self {
            clock,
            store,
            backend,
            tokens,
            signals,
            client,
            resolver,
        }
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(
            self.store.clone(),
            self.backend.clone(),
            self.client.clone(),
            self.resolver.clone(),
        )
    }

    pub fn orchestrator(&self) -> SyncOrchestrator {
        self.orchestrator_with_prompt(Arc::new(NoPrompt))
    }

    pub fn orchestrator_with_prompt(&self, prompt: Arc<dyn ILedgerNamePrompt>) -> SyncOrchestrator {
        SyncOrchestrator::new(
            self.store.clone(),
            self.resolver.clone(),
            self.reconciler(),
            prompt,
            self.signals.clone(),
        )
    }

    /// Creates ledger "Alice" born 1990-01-01 and returns its welcome entry
    pub async fn add_alice(&self) -> Entry {
        let dob = EntryContent::parse_date("1990-01-01").unwrap();
        self.store.add_ledger("Alice", dob).await.unwrap();
        self.store.get_ledger("Alice").await.unwrap().unwrap()[0].clone()
    }
}
