//! OAuth2 PKCE authentication flow for Google APIs
//!
//! Implements the Authorization Code flow with PKCE (RFC 7636) for
//! authenticating a native desktop application with Google identity.
//!
//! ## Components
//!
//! - [`OAuth2Config`] - Configuration for the OAuth2 flow
//! - [`PKCEFlow`] - OAuth2 PKCE challenge/exchange logic
//! - [`LocalCallbackServer`] - Minimal HTTP server for the OAuth redirect
//! - [`GoogleAuthAdapter`] - Orchestrates the full authentication flow

use std::time::Duration;

use anyhow::{Context, Result};
use entirelife_core::ports::{AccessToken, IInteractiveAuth};
use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken,
    Scope, TokenResponse, TokenUrl,
};
use tracing::{debug, info, warn};

use crate::GoogleError;

/// Google OAuth2 authorization endpoint
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google OAuth2 token endpoint
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Google OAuth2 revocation endpoint
const REVOKE_URL: &str = "https://oauth2.googleapis.com/revoke";

/// Default port for the local callback server
pub const DEFAULT_REDIRECT_PORT: u16 = 8400;

/// Scopes needed to create the folder and read/write the spreadsheets in it
const DEFAULT_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/drive.file",
    "https://www.googleapis.com/auth/spreadsheets",
];

/// How long the local callback server waits for the browser
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

// ============================================================================
// OAuth2Config
// ============================================================================

/// Configuration for the OAuth2 PKCE authentication flow
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    /// OAuth client ID from the Google Cloud console
    pub client_id: String,
    /// Client secret; Google issues one even for desktop clients
    pub client_secret: Option<String>,
    /// Local port receiving the redirect
    pub redirect_port: u16,
    /// OAuth scopes to request
    pub scopes: Vec<String>,
}

impl OAuth2Config {
    /// Creates a new OAuth2Config with the given client ID and default settings
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_port: DEFAULT_REDIRECT_PORT,
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Sets the client secret
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Sets the local redirect port
    pub fn with_redirect_port(mut self, port: u16) -> Self {
        self.redirect_port = port;
        self
    }

    /// Creates a config with custom scopes
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Redirect URI registered for the loopback flow
    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/callback", self.redirect_port)
    }
}

// ============================================================================
// PKCEFlow
// ============================================================================

/// OAuth2 PKCE flow implementation using the `oauth2` crate
///
/// Handles generating authorization URLs with PKCE challenges,
/// exchanging authorization codes for tokens, and refreshing tokens.
pub struct PKCEFlow {
    client: BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>,
    scopes: Vec<String>,
    http: reqwest::Client,
}

impl PKCEFlow {
    /// Creates a new PKCEFlow with the given configuration
    pub fn new(config: &OAuth2Config) -> Result<Self> {
        let mut client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_auth_uri(AuthUrl::new(AUTH_URL.to_string()).context("Invalid authorization URL")?)
            .set_token_uri(TokenUrl::new(TOKEN_URL.to_string()).context("Invalid token URL")?)
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_uri()).context("Invalid redirect URI")?,
            );
        if let Some(secret) = &config.client_secret {
            client = client.set_client_secret(ClientSecret::new(secret.clone()));
        }

        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to build OAuth HTTP client")?;

        Ok(Self {
            client,
            scopes: config.scopes.clone(),
            http,
        })
    }

    /// Generates an authorization URL with a PKCE challenge
    ///
    /// Requests offline access so that Google returns a refresh token.
    ///
    /// # Returns
    /// A tuple of `(authorization_url, csrf_token, pkce_verifier)`.
    /// The `pkce_verifier` must be kept until the code exchange step.
    pub fn generate_auth_url(&self) -> (String, CsrfToken, PkceCodeVerifier) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut auth_request = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent");

        for scope in &self.scopes {
            auth_request = auth_request.add_scope(Scope::new(scope.clone()));
        }

        let (auth_url, csrf_token) = auth_request.set_pkce_challenge(pkce_challenge).url();

        debug!("Generated authorization URL");
        (auth_url.to_string(), csrf_token, pkce_verifier)
    }

    /// Exchanges an authorization code for a credential
    pub async fn exchange_code(
        &self,
        code: String,
        pkce_verifier: PkceCodeVerifier,
    ) -> Result<AccessToken> {
        info!("Exchanging authorization code for tokens");

        let token_result = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&self.http)
            .await
            .map_err(|e| GoogleError::TokenExchange(e.to_string()))?;

        Ok(AccessToken {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result.refresh_token().map(|t| t.secret().to_string()),
            scope: token_result.scopes().map(|scopes| {
                scopes
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            }),
            token_type: Some("Bearer".to_string()),
        })
    }

    /// Exchanges a refresh token for a new access token
    ///
    /// Google does not rotate refresh tokens, so the one passed in is kept
    /// when the response carries none.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<AccessToken> {
        info!("Refreshing access token");

        let token_result = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| GoogleError::TokenExchange(e.to_string()))?;

        Ok(AccessToken {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result
                .refresh_token()
                .map(|t| t.secret().to_string())
                .or_else(|| Some(refresh_token.to_string())),
            scope: None,
            token_type: Some("Bearer".to_string()),
        })
    }
}

// ============================================================================
// LocalCallbackServer
// ============================================================================

/// Minimal HTTP server that listens on localhost for the OAuth2 redirect callback.
///
/// Waits for Google to redirect the user's browser back with an
/// authorization code, answers with a small HTML page and shuts down.
pub struct LocalCallbackServer;

/// Parameters extracted from the OAuth2 callback
#[derive(Debug)]
pub struct CallbackParams {
    /// The authorization code
    pub code: String,
    /// The CSRF state parameter
    pub state: String,
}

impl LocalCallbackServer {
    /// Starts the local callback server and waits for the OAuth redirect
    ///
    /// Connections that do not carry a code (favicon requests, for example)
    /// are answered with an error page and the server keeps waiting.
    pub async fn start(port: u16) -> Result<CallbackParams> {
        use tokio::net::TcpListener;

        let addr = format!("127.0.0.1:{port}");
        info!(%addr, "Starting local OAuth callback server");

        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind callback server to {addr}"))?;

        let params = tokio::time::timeout(CALLBACK_TIMEOUT, Self::accept_until_code(listener))
            .await
            .map_err(|_| GoogleError::CallbackFailed("timed out waiting for the browser".into()))??;

        info!("Received OAuth callback with authorization code");
        Ok(params)
    }

    async fn accept_until_code(listener: tokio::net::TcpListener) -> Result<CallbackParams> {
        use http_body_util::Full;
        use hyper::body::Bytes;
        use hyper::server::conn::http1;
        use hyper::service::service_fn;
        use hyper::{Request, StatusCode};
        use hyper_util::rt::TokioIo;
        use tokio::sync::mpsc;

        let (tx, mut rx) = mpsc::channel::<CallbackParams>(1);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, _addr) =
                        accepted.context("Failed to accept connection on callback server")?;
                    let io = TokioIo::new(stream);
                    let tx = tx.clone();

                    let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                        let tx = tx.clone();
                        async move {
                            let uri = req.uri().to_string();
                            debug!("Callback server received request: {}", uri);

                            let response = match parse_callback_params(&uri) {
                                Some(params) => {
                                    let _ = tx.send(params).await;
                                    html_response(StatusCode::OK, success_html())
                                }
                                None => html_response(
                                    StatusCode::BAD_REQUEST,
                                    error_html("Missing authorization code in callback"),
                                ),
                            };
                            Ok::<_, hyper::Error>(response.map(|body: String| Full::new(Bytes::from(body))))
                        }
                    });

                    tokio::spawn(async move {
                        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                            warn!("Callback server connection error: {}", e);
                        }
                    });
                }
                Some(params) = rx.recv() => return Ok(params),
            }
        }
    }
}

/// Builds an HTML response without going through the fallible builder
fn html_response(status: hyper::StatusCode, html: String) -> hyper::Response<String> {
    let mut response = hyper::Response::new(html);
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

/// Parses the authorization code and state from a callback URI
fn parse_callback_params(uri: &str) -> Option<CallbackParams> {
    let url = url::Url::parse(&format!("http://localhost{}", uri)).ok()?;
    let mut code = None;
    let mut state = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.to_string()),
            "state" => state = Some(value.to_string()),
            _ => {}
        }
    }

    Some(CallbackParams {
        code: code?,
        state: state.unwrap_or_default(),
    })
}

/// Returns the HTML for a successful authentication page
fn success_html() -> String {
    r#"<!DOCTYPE html>
<html>
<head><title>Entire.Life - Signed in</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Signed in</h1>
    <p>Entire.Life can now sync your ledgers to Google Sheets.</p>
    <p>You can close this window.</p>
    <script>setTimeout(function() { window.close(); }, 3000);</script>
</body>
</html>"#
        .to_string()
}

/// Returns the HTML for an authentication error page
fn error_html(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Entire.Life - Sign-in Error</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Sign-in Error</h1>
    <p>{}</p>
    <p>Please close this window and try again.</p>
</body>
</html>"#,
        message
    )
}

// ============================================================================
// GoogleAuthAdapter
// ============================================================================

/// High-level authentication adapter that orchestrates the full OAuth2 PKCE flow.
///
/// 1. Generates PKCE authorization URL
/// 2. Opens the user's browser to the Google consent page
/// 3. Starts a local callback server to receive the redirect
/// 4. Checks the CSRF state and exchanges the code for a credential
pub struct GoogleAuthAdapter {
    config: OAuth2Config,
}

impl GoogleAuthAdapter {
    /// Creates a new GoogleAuthAdapter with the given configuration
    pub fn new(config: OAuth2Config) -> Self {
        Self { config }
    }

    /// Creates a new GoogleAuthAdapter with just a client ID
    pub fn with_client_id(client_id: impl Into<String>) -> Self {
        Self {
            config: OAuth2Config::new(client_id),
        }
    }

    /// Performs the full interactive OAuth2 PKCE login flow
    pub async fn login(&self) -> Result<AccessToken> {
        info!("Starting OAuth2 PKCE login flow");

        let flow = PKCEFlow::new(&self.config)?;
        let (auth_url, csrf_token, pkce_verifier) = flow.generate_auth_url();

        info!("Opening browser for authentication");
        if let Err(e) = webbrowser::open(&auth_url) {
            warn!(error = %e, "Could not open a browser; open the URL manually");
        }
        info!(url = %auth_url, "Waiting for sign-in to complete in the browser");

        let callback = LocalCallbackServer::start(self.config.redirect_port).await?;
        if callback.state != *csrf_token.secret() {
            return Err(GoogleError::StateMismatch.into());
        }

        let token = flow.exchange_code(callback.code, pkce_verifier).await?;

        info!("OAuth2 PKCE login completed successfully");
        Ok(token)
    }

    /// Returns a reference to the current configuration
    pub fn config(&self) -> &OAuth2Config {
        &self.config
    }
}

#[async_trait::async_trait]
impl IInteractiveAuth for GoogleAuthAdapter {
    async fn authorize(&self) -> Result<AccessToken> {
        self.login().await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AccessToken> {
        let flow = PKCEFlow::new(&self.config)?;
        flow.refresh_token(refresh_token).await
    }

    async fn revoke(&self, token: &AccessToken) -> Result<()> {
        // Revoking the refresh token also invalidates every access token issued from it.
        let secret = token.refresh_token.as_deref().unwrap_or(token.secret());

        let response = reqwest::Client::new()
            .post(REVOKE_URL)
            .form(&[("token", secret)])
            .send()
            .await
            .context("Failed to reach the revocation endpoint")?;

        if !response.status().is_success() {
            return Err(GoogleError::Revoke(response.status().as_u16()).into());
        }

        info!("Revoked Google credential");
        Ok(())
    }
}
