//! Shared test helpers for Google API integration tests
//!
//! Provides wiremock-based mock server setup. Each helper returns a backend
//! pointing at the mock server so Drive and Sheets paths share one base URL.

use std::time::Duration;

use entirelife_core::ports::AccessToken;
use entirelife_google::{GoogleSheetsBackend, SheetsClient};
use wiremock::MockServer;

/// Bearer token used by every test request
pub const TEST_TOKEN: &str = "test-access-token";

/// Starts a mock server and returns a (MockServer, backend) tuple.
pub async fn setup_google_mock() -> (MockServer, GoogleSheetsBackend) {
    let server = MockServer::start().await;
    let client = SheetsClient::new(None, Duration::from_secs(5))
        .expect("client builds")
        .with_base_url(server.uri());
    (server, GoogleSheetsBackend::new(client))
}

/// Returns the token matching [`TEST_TOKEN`]
pub fn token() -> AccessToken {
    AccessToken::bearer(TEST_TOKEN)
}

/// Parses the JSON body of the only request matching `path_suffix`
pub async fn request_body(server: &MockServer, path_suffix: &str) -> serde_json::Value {
    let requests = server.received_requests().await.expect("recording enabled");
    let request = requests
        .iter()
        .find(|r| r.url.path().ends_with(path_suffix))
        .unwrap_or_else(|| panic!("no request to {path_suffix}"));
    serde_json::from_slice(&request.body).expect("JSON body")
}
