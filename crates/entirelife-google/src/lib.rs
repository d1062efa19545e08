//! Entire.Life Google - Google Drive and Sheets backend
//!
//! Provides async adapters for:
//! - OAuth2 authentication (Authorization Code with PKCE)
//! - Folder and spreadsheet discovery/creation via the Drive API
//! - Reading and writing ledger rows via the Sheets API
//!
//! ## Modules
//!
//! - [`auth`] - OAuth2 PKCE authentication flow components
//! - [`client`] - HTTP client and error classification
//! - [`provider`] - `ITabularBackend` implementation
//! - [`token`] - `ITokenProvider` implementations over the local store

pub mod auth;
pub mod client;
pub mod provider;
pub mod token;

pub use auth::{GoogleAuthAdapter, OAuth2Config};
pub use client::SheetsClient;
pub use provider::GoogleSheetsBackend;
pub use token::{BackgroundTokenProvider, GoogleTokenProvider};

use thiserror::Error;

/// Errors raised while signing in to Google
///
/// API call failures are reported as
/// [`BackendError`](entirelife_core::ports::BackendError) instead.
#[derive(Debug, Error)]
pub enum GoogleError {
    /// No OAuth client ID is configured
    #[error("No Google client ID configured; set google.client_id in the config file")]
    MissingClientId,

    /// The browser never came back with a usable redirect
    #[error("OAuth callback failed: {0}")]
    CallbackFailed(String),

    /// The redirect carried a different CSRF state than we sent
    #[error("OAuth state mismatch; the sign-in response was not for this request")]
    StateMismatch,

    /// The token endpoint rejected the code or refresh token
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// The revocation endpoint answered with an error status
    #[error("Token revocation failed with status {0}")]
    Revoke(u16),

    /// A new credential is needed but this context cannot show a browser
    #[error("Sign-in required; run `entirelife auth login`")]
    InteractionRequired,
}
