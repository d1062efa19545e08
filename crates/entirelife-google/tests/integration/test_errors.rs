//! HTTP failure classification as seen through the backend

use std::time::Duration;

use entirelife_core::ports::{BackendError, ITabularBackend, ResourceQuery};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{setup_google_mock, token};

async fn search_with_response(response: ResponseTemplate) -> BackendError {
    let (server, backend) = setup_google_mock().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(response)
        .mount(&server)
        .await;

    backend
        .search(&token(), &ResourceQuery::folder("Entire.Life"))
        .await
        .unwrap_err()
}

#[tokio::test]
async fn test_401_is_auth_failure() {
    let err = search_with_response(ResponseTemplate::new(401).set_body_json(json!({
        "error": { "code": 401, "message": "Invalid Credentials", "status": "UNAUTHENTICATED" }
    })))
    .await;
    assert!(err.is_auth_failure());
}

#[tokio::test]
async fn test_403_permission_denied_is_auth_failure() {
    let err = search_with_response(ResponseTemplate::new(403).set_body_json(json!({
        "error": { "code": 403, "message": "The caller does not have permission", "status": "PERMISSION_DENIED" }
    })))
    .await;
    assert!(err.is_auth_failure());
}

#[tokio::test]
async fn test_server_error_is_api_error() {
    let err = search_with_response(ResponseTemplate::new(500).set_body_json(json!({
        "error": { "code": 500, "message": "Internal error", "status": "INTERNAL" }
    })))
    .await;
    assert_eq!(
        err,
        BackendError::Api {
            status: 500,
            message: "Internal error".into()
        }
    );
}

#[tokio::test]
async fn test_429_carries_retry_after() {
    let err = search_with_response(ResponseTemplate::new(429).insert_header("Retry-After", "30")).await;
    assert_eq!(
        err,
        BackendError::TooManyRequests {
            retry_after: Some(Duration::from_secs(30))
        }
    );
}

#[tokio::test]
async fn test_malformed_success_body_is_invalid_response() {
    let err = search_with_response(ResponseTemplate::new(200).set_body_string("not json")).await;
    assert!(matches!(err, BackendError::InvalidResponse(_)));
}
