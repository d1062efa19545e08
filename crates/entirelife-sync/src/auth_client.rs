//! Auth-aware request client
//!
//! Every remote call made by the engine goes through [`AuthAwareClient::call`].
//! The HTTP adapter has already classified each failure; this module only
//! decides what to do about [`BackendError::AuthFailure`]:
//!
//! ```text
//! Attempt 1 ──ok──→ Done
//!     │ auth failure
//!     ▼
//! emit authError, request new token ──fail──→ RefreshFailed
//!     │ ok
//!     ▼
//! Attempt 2 ──ok──→ Done
//!     ├── auth failure ──→ StaleAuthToken
//!     └── other failure ──→ propagated
//! ```
//!
//! Non-auth failures are never retried here.

use std::future::Future;
use std::sync::Arc;

use entirelife_core::ports::{AccessToken, BackendError, EngineSignal, ISignalSink, ITokenProvider};
use tracing::{debug, warn};

use crate::SyncError;

/// Maximum number of times a wrapped operation is invoked per call
const MAX_ATTEMPTS: u32 = 2;

/// Wraps remote calls with a single refresh-and-retry on authorization failure
pub struct AuthAwareClient {
    tokens: Arc<dyn ITokenProvider>,
    signals: Arc<dyn ISignalSink>,
}

impl AuthAwareClient {
    /// Creates a client that obtains credentials from `tokens` and reports
    /// `authError` to `signals`
    pub fn new(tokens: Arc<dyn ITokenProvider>, signals: Arc<dyn ISignalSink>) -> Self {
        Self { tokens, signals }
    }

    /// Runs `operation` with the current credential
    ///
    /// # Arguments
    /// * `name` - Operation name used in log fields
    /// * `operation` - Performs exactly one remote call with the given token
    ///
    /// # Errors
    /// - `NotAuthenticated` if no credential is stored
    /// - `RefreshFailed` if the first attempt was rejected and no new
    ///   credential could be obtained
    /// - `StaleAuthToken` if the refreshed credential was rejected as well
    /// - `Backend` for every other failure, unchanged
    pub async fn call<T, F, Fut>(&self, name: &str, operation: F) -> Result<T, SyncError>
    where
        F: Fn(AccessToken) -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let mut token = self
            .tokens
            .current_token()
            .await
            .map_err(SyncError::Credential)?
            .ok_or(SyncError::NotAuthenticated)?;

        let mut attempt = 1;
        loop {
            match operation(token.clone()).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation = name, attempt, "Operation succeeded after token refresh");
                    }
                    return Ok(value);
                }
                Err(err) if !err.is_auth_failure() => return Err(err.into()),
                Err(err) if attempt >= MAX_ATTEMPTS => {
                    warn!(operation = name, error = %err, "Refreshed token was rejected too");
                    return Err(SyncError::StaleAuthToken);
                }
                Err(err) => {
                    warn!(operation = name, error = %err, "Authorization failed, requesting a new token");
                    self.signals.emit(EngineSignal::AuthError);
                    token = self
                        .tokens
                        .request_new_token()
                        .await
                        .map_err(SyncError::RefreshFailed)?;
                    attempt += 1;
                }
            }
        }
    }
}
