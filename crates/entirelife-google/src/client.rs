//! Google Drive / Sheets HTTP client
//!
//! Provides the low-level HTTP plumbing shared by every backend call:
//! endpoint construction, bearer authentication, the optional API key, the
//! request timeout and, most importantly, the single place where HTTP
//! failures are classified into [`BackendError`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use entirelife_core::ports::AccessToken;
//! use entirelife_google::client::{Api, SheetsClient};
//! use reqwest::Method;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = SheetsClient::new(None, Duration::from_secs(30))?;
//! let token = AccessToken::bearer("ya29...");
//! let files: serde_json::Value = client
//!     .send_json(client.request(Method::GET, Api::Drive, "/files", &token))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use anyhow::Context;
use entirelife_core::ports::{AccessToken, BackendError};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, warn};

/// Base URL for Drive v3 (and the media upload endpoint)
const GOOGLE_APIS_BASE_URL: &str = "https://www.googleapis.com";

/// Base URL for Sheets v4
const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";

/// Longest `Retry-After` we are willing to report
const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

// ============================================================================
// Google error body
// ============================================================================

/// Error envelope returned by every Google API
#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: GoogleErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    #[serde(default)]
    message: String,
    /// Canonical status such as `PERMISSION_DENIED` or `UNAUTHENTICATED`
    #[serde(default)]
    status: Option<String>,
}

// ============================================================================
// SheetsClient
// ============================================================================

/// Which Google API a path is relative to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Api {
    /// `{base}/drive/v3`
    Drive,
    /// `{base}/upload/drive/v3`
    DriveUpload,
    /// `{base}/v4`
    Sheets,
}

/// HTTP client for the Drive and Sheets REST APIs
pub struct SheetsClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for Drive and uploads
    apis_base_url: String,
    /// Base URL for Sheets
    sheets_base_url: String,
    /// API key sent as `key=` on every request
    api_key: Option<String>,
}

impl SheetsClient {
    /// Creates a client pointed at the production Google endpoints
    ///
    /// # Arguments
    /// * `api_key` - Optional API key added to every request
    /// * `timeout` - Per-request timeout
    pub fn new(api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("entirelife/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            apis_base_url: GOOGLE_APIS_BASE_URL.to_string(),
            sheets_base_url: SHEETS_BASE_URL.to_string(),
            api_key,
        })
    }

    /// Points both Drive and Sheets at the same base URL (useful for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.apis_base_url = base_url.clone();
        self.sheets_base_url = base_url;
        self
    }

    /// Builds the absolute URL of `path` within `api`
    pub fn url(&self, api: Api, path: &str) -> String {
        match api {
            Api::Drive => format!("{}/drive/v3{}", self.apis_base_url, path),
            Api::DriveUpload => format!("{}/upload/drive/v3{}", self.apis_base_url, path),
            Api::Sheets => format!("{}/v4{}", self.sheets_base_url, path),
        }
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// Adds the `Authorization` header and, when configured, the API key.
    pub fn request(
        &self,
        method: Method,
        api: Api,
        path: &str,
        token: &AccessToken,
    ) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, self.url(api, path))
            .bearer_auth(token.secret());
        if let Some(key) = &self.api_key {
            builder = builder.query(&[("key", key)]);
        }
        builder
    }

    /// Sends a request and decodes a JSON response body
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, BackendError> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }

    /// Sends a request and discards the response body
    pub async fn send_empty(&self, request: RequestBuilder) -> Result<(), BackendError> {
        self.send(request).await.map(|_| ())
    }

    /// Sends a request, turning any non-success status into a [`BackendError`]
    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), url = %response.url().path(), "Request succeeded");
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.unwrap_or_default();

        let error = classify_error(status, retry_after.as_deref(), &body);
        warn!(status = status.as_u16(), error = %error, "Request failed");
        Err(error)
    }
}

// ============================================================================
// Error classification
// ============================================================================

/// Maps a failed HTTP response to a [`BackendError`]
///
/// 401, and 403 with the `PERMISSION_DENIED` status, are authorization
/// failures that a refreshed token may fix. Everything else is reported as
/// is.
pub fn classify_error(status: StatusCode, retry_after: Option<&str>, body: &str) -> BackendError {
    let detail = serde_json::from_str::<GoogleErrorBody>(body).ok().map(|b| b.error);
    let message = detail
        .as_ref()
        .map(|d| d.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });
    let google_status = detail.as_ref().and_then(|d| d.status.as_deref());

    match status {
        StatusCode::UNAUTHORIZED => BackendError::AuthFailure {
            status: status.as_u16(),
            message,
        },
        StatusCode::FORBIDDEN if google_status == Some("PERMISSION_DENIED") => {
            BackendError::AuthFailure {
                status: status.as_u16(),
                message,
            }
        }
        StatusCode::TOO_MANY_REQUESTS => BackendError::TooManyRequests {
            retry_after: retry_after.and_then(parse_retry_after),
        },
        _ => BackendError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// Parses a `Retry-After` header value (delay-seconds or HTTP-date)
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(seconds).min(MAX_RETRY_AFTER));
    }

    let date = chrono::DateTime::parse_from_rfc2822(value.trim()).ok()?;
    let diff = date.with_timezone(&chrono::Utc) - chrono::Utc::now();
    let secs: u64 = diff.num_seconds().try_into().ok()?;
    Some(Duration::from_secs(secs).min(MAX_RETRY_AFTER))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SheetsClient {
        SheetsClient::new(None, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_production_urls() {
        let client = client();
        assert_eq!(
            client.url(Api::Drive, "/files"),
            "https://www.googleapis.com/drive/v3/files"
        );
        assert_eq!(
            client.url(Api::DriveUpload, "/files"),
            "https://www.googleapis.com/upload/drive/v3/files"
        );
        assert_eq!(
            client.url(Api::Sheets, "/spreadsheets/abc"),
            "https://sheets.googleapis.com/v4/spreadsheets/abc"
        );
    }

    #[test]
    fn test_request_builder_adds_auth_and_key() {
        let client = SheetsClient::new(Some("AIza-key".into()), Duration::from_secs(5))
            .unwrap()
            .with_base_url("http://localhost:8080");
        let token = AccessToken::bearer("test-token");
        let request = client
            .request(Method::GET, Api::Drive, "/files", &token)
            .build()
            .unwrap();

        assert_eq!(
            request.url().as_str(),
            "http://localhost:8080/drive/v3/files?key=AIza-key"
        );
        let auth_header = request
            .headers()
            .get("authorization")
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(auth_header, "Bearer test-token");
    }

    #[test]
    fn test_classify_401_is_auth_failure() {
        let body = r#"{"error":{"code":401,"message":"Invalid Credentials","status":"UNAUTHENTICATED"}}"#;
        let err = classify_error(StatusCode::UNAUTHORIZED, None, body);
        assert_eq!(
            err,
            BackendError::AuthFailure {
                status: 401,
                message: "Invalid Credentials".into()
            }
        );
    }

    #[test]
    fn test_classify_403_depends_on_status() {
        let denied = r#"{"error":{"code":403,"message":"denied","status":"PERMISSION_DENIED"}}"#;
        assert!(classify_error(StatusCode::FORBIDDEN, None, denied).is_auth_failure());

        let quota = r#"{"error":{"code":403,"message":"quota","status":"RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(
            classify_error(StatusCode::FORBIDDEN, None, quota),
            BackendError::Api {
                status: 403,
                message: "quota".into()
            }
        );
    }

    #[test]
    fn test_classify_429_reads_retry_after() {
        let err = classify_error(StatusCode::TOO_MANY_REQUESTS, Some("7"), "");
        assert_eq!(
            err,
            BackendError::TooManyRequests {
                retry_after: Some(Duration::from_secs(7))
            }
        );
    }

    #[test]
    fn test_classify_non_json_body_uses_reason() {
        let err = classify_error(StatusCode::BAD_GATEWAY, None, "<html>oops</html>");
        assert_eq!(
            err,
            BackendError::Api {
                status: 502,
                message: "Bad Gateway".into()
            }
        );
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
        assert_eq!(parse_retry_after("999999"), Some(MAX_RETRY_AFTER));
        assert_eq!(parse_retry_after("soon"), None);
        // A date in the past gives a negative delay
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }
}
