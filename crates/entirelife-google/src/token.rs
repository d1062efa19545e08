//! Token providers backed by the local store
//!
//! The credential lives under the `google-access-token` key of the local
//! store, so every process sharing the database sees the same sign-in.
//!
//! - [`GoogleTokenProvider`] is used where a user is present. A refresh first
//!   tries the silent refresh-token grant and falls back to the browser flow.
//! - [`BackgroundTokenProvider`] is used by unattended sync. It never
//!   refreshes; it can only report that a sign-in is needed.

use std::sync::Arc;

use anyhow::Context;
use entirelife_core::ports::{AccessToken, IInteractiveAuth, ITokenProvider};
use entirelife_core::usecases::LocalStore;
use tracing::{info, warn};

use crate::GoogleError;

// ============================================================================
// GoogleTokenProvider
// ============================================================================

/// Interactive token provider
pub struct GoogleTokenProvider {
    store: Arc<LocalStore>,
    auth: Arc<dyn IInteractiveAuth>,
}

impl GoogleTokenProvider {
    /// Creates a provider that stores credentials in `store` and signs in via `auth`
    pub fn new(store: Arc<LocalStore>, auth: Arc<dyn IInteractiveAuth>) -> Self {
        Self { store, auth }
    }

    /// Runs the browser sign-in unconditionally and stores the result
    pub async fn sign_in(&self) -> anyhow::Result<AccessToken> {
        let token = self.auth.authorize().await?;
        self.save(&token).await?;
        Ok(token)
    }

    async fn save(&self, token: &AccessToken) -> anyhow::Result<()> {
        self.store
            .set_token(Some(token))
            .await
            .context("Failed to store access token")
    }
}

#[async_trait::async_trait]
impl ITokenProvider for GoogleTokenProvider {
    async fn current_token(&self) -> anyhow::Result<Option<AccessToken>> {
        Ok(self.store.token().await?)
    }

    async fn request_new_token(&self) -> anyhow::Result<AccessToken> {
        let stored = self.store.token().await?;

        if let Some(refresh_token) = stored.as_ref().and_then(|t| t.refresh_token.as_deref()) {
            match self.auth.refresh(refresh_token).await {
                Ok(token) => {
                    self.save(&token).await?;
                    info!("Access token refreshed without user interaction");
                    return Ok(token);
                }
                Err(e) => warn!(error = %e, "Refresh token rejected, signing in again"),
            }
        }

        self.sign_in().await
    }

    async fn revoke_token(&self) -> anyhow::Result<()> {
        if let Some(token) = self.store.token().await? {
            if let Err(e) = self.auth.revoke(&token).await {
                warn!(error = %e, "Failed to revoke credential remotely, forgetting it locally");
            }
        }
        self.store.set_token(None).await?;
        Ok(())
    }
}

// ============================================================================
// BackgroundTokenProvider
// ============================================================================

/// Non-interactive token provider for unattended sync
pub struct BackgroundTokenProvider {
    store: Arc<LocalStore>,
}

impl BackgroundTokenProvider {
    /// Creates a provider that only reads the stored credential
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl ITokenProvider for BackgroundTokenProvider {
    async fn current_token(&self) -> anyhow::Result<Option<AccessToken>> {
        Ok(self.store.token().await?)
    }

    async fn request_new_token(&self) -> anyhow::Result<AccessToken> {
        Err(GoogleError::InteractionRequired.into())
    }

    async fn revoke_token(&self) -> anyhow::Result<()> {
        self.store.set_token(None).await?;
        Ok(())
    }
}
