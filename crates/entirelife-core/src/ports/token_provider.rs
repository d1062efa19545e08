//! Token provider ports (driven/secondary ports)
//!
//! The backend credential is an opaque bearer token with no expiry field.
//! Expiry is only ever learned from a rejected call, at which point the
//! engine asks the [`ITokenProvider`] for a new one.
//!
//! ## Design Notes
//!
//! - [`ITokenProvider`] is what the engine sees. Whether a refresh can show a
//!   browser window depends on the context the provider was built for.
//! - [`IInteractiveAuth`] is the OAuth flow itself, kept separate so that
//!   providers can be composed around it.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// AccessToken
// ============================================================================

/// Bearer credential for the remote backend
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Bearer token sent with every request
    pub access_token: String,
    /// Long-lived token used to obtain a new access token without a browser
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Space-separated scopes granted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Token type, normally `Bearer`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl AccessToken {
    /// Creates a bare bearer token
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            scope: None,
            token_type: Some("Bearer".to_string()),
        }
    }

    /// Returns the bearer secret
    pub fn secret(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .finish()
    }
}

// ============================================================================
// ITokenProvider
// ============================================================================

/// Port trait for obtaining and renewing the backend credential
#[async_trait::async_trait]
pub trait ITokenProvider: Send + Sync {
    /// Returns the stored credential, if any
    async fn current_token(&self) -> anyhow::Result<Option<AccessToken>>;

    /// Obtains (and stores) a new credential
    ///
    /// Fails when no refresh is possible in this context, e.g. when running
    /// in a background worker that cannot show a sign-in window.
    async fn request_new_token(&self) -> anyhow::Result<AccessToken>;

    /// Revokes and forgets the stored credential
    async fn revoke_token(&self) -> anyhow::Result<()>;
}

// ============================================================================
// IInteractiveAuth
// ============================================================================

/// Port trait for the OAuth flow against the backend's identity provider
#[async_trait::async_trait]
pub trait IInteractiveAuth: Send + Sync {
    /// Runs the full sign-in flow, involving the user
    async fn authorize(&self) -> anyhow::Result<AccessToken>;

    /// Exchanges a refresh token for a new credential without user interaction
    async fn refresh(&self, refresh_token: &str) -> anyhow::Result<AccessToken>;

    /// Revokes a credential at the identity provider
    async fn revoke(&self, token: &AccessToken) -> anyhow::Result<()>;
}
