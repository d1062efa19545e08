//! Auth commands - Login, Logout, and Status for Google authentication
//!
//! Provides the `entirelife auth` CLI subcommands which:
//! 1. `login`  - Runs the OAuth2 PKCE flow in the browser and stores the
//!    credential in the local database.
//! 2. `logout` - Revokes the credential with Google and forgets it.
//! 3. `status` - Shows whether a credential is stored.

use anyhow::{Context, Result};
use clap::Subcommand;
use entirelife_core::ports::ITokenProvider;
use tracing::{info, warn};

use crate::context::AppContext;
use crate::output::{get_formatter, OutputFormat, OutputFormatter};

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Sign in to Google in the browser
    Login,
    /// Revoke and remove the stored credential
    Logout,
    /// Check authentication status
    Status,
}

impl AuthCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format);
        match self {
            AuthCommand::Login => self.execute_login(ctx, &*fmt).await,
            AuthCommand::Logout => self.execute_logout(ctx, &*fmt).await,
            AuthCommand::Status => self.execute_status(ctx, &*fmt, format).await,
        }
    }

    /// Runs the browser flow and stores the resulting credential
    async fn execute_login(&self, ctx: &AppContext, fmt: &dyn OutputFormatter) -> Result<()> {
        let store = ctx.open_store().await?;
        let tokens = ctx
            .interactive_tokens(store)
            .context("Set google.client_id in the configuration file first")?;

        fmt.info("Opening browser for Google sign-in...");
        let token = tokens.sign_in().await.context("Google sign-in failed")?;

        info!(
            offline = token.refresh_token.is_some(),
            "Signed in to Google"
        );
        fmt.success("Signed in to Google");
        if token.refresh_token.is_none() {
            fmt.warn("No refresh token was granted; you will be asked to sign in again when it expires");
        }
        Ok(())
    }

    /// Revokes the credential when possible and always forgets it locally
    async fn execute_logout(&self, ctx: &AppContext, fmt: &dyn OutputFormatter) -> Result<()> {
        let store = ctx.open_store().await?;
        if store.token().await?.is_none() {
            fmt.info("Not signed in. Nothing to log out.");
            return Ok(());
        }

        match ctx.interactive_tokens(store.clone()) {
            Ok(tokens) => tokens.revoke_token().await?,
            Err(e) => {
                warn!(error = %e, "Cannot revoke with Google; removing the local credential only");
                store.set_token(None).await?;
            }
        }

        fmt.success("Logged out successfully");
        Ok(())
    }

    async fn execute_status(
        &self,
        ctx: &AppContext,
        fmt: &dyn OutputFormatter,
        format: OutputFormat,
    ) -> Result<()> {
        let store = ctx.open_store().await?;
        let token = store.token().await?;

        if format.is_json() {
            fmt.print_json(&serde_json::json!({
                "signed_in": token.is_some(),
                "can_refresh": token.as_ref().is_some_and(|t| t.refresh_token.is_some()),
                "scope": token.as_ref().and_then(|t| t.scope.clone()),
                "client_id_configured": ctx.config.google.client_id.is_some(),
            }));
            return Ok(());
        }

        match token {
            Some(token) => {
                fmt.success("Signed in to Google");
                if let Some(scope) = &token.scope {
                    fmt.info(&format!("Scopes: {scope}"));
                }
                if token.refresh_token.is_none() {
                    fmt.info("No refresh token; sign-in will be needed when the token expires");
                }
            }
            None => {
                fmt.info("Authentication status: Not signed in");
                fmt.info("Run 'entirelife auth login' to authenticate");
            }
        }
        if ctx.config.google.client_id.is_none() {
            fmt.warn(&format!(
                "google.client_id is not set in {}",
                ctx.config_path.display()
            ));
        }
        Ok(())
    }
}
