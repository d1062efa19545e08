//! Drive search, folder creation and README upload

use entirelife_core::domain::ResourceKind;
use entirelife_core::ports::{ITabularBackend, ResourceQuery};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{request_body, setup_google_mock, token, TEST_TOKEN};

#[tokio::test]
async fn test_search_sends_drive_query() {
    let (server, backend) = setup_google_mock().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(header("authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .and(query_param(
            "q",
            "mimeType='application/vnd.google-apps.folder' and name='Entire.Life' and trashed = false",
        ))
        .and(query_param("spaces", "drive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [{ "id": "folder-1", "name": "Entire.Life" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let found = backend
        .search(&token(), &ResourceQuery::folder("Entire.Life"))
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "folder-1");
    assert_eq!(found[0].name, "Entire.Life");
}

#[tokio::test]
async fn test_search_follows_page_tokens() {
    let (server, backend) = setup_google_mock().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [{ "id": "s2", "name": "Bob" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    // Mounted second so the page-2 matcher above takes precedence
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [{ "id": "s1", "name": "Alice" }],
            "nextPageToken": "page-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let found = backend
        .search(&token(), &ResourceQuery::spreadsheets_in("folder-1"))
        .await
        .unwrap();

    let names: Vec<_> = found.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "Bob"]);
}

#[tokio::test]
async fn test_create_spreadsheet_in_folder() {
    let (server, backend) = setup_google_mock().await;

    Mock::given(method("POST"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "sheet-9", "name": "Alice"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = backend
        .create_resource(&token(), Some("folder-1"), "Alice", ResourceKind::Spreadsheet)
        .await
        .unwrap();
    assert_eq!(created.id, "sheet-9");

    let body = request_body(&server, "/drive/v3/files").await;
    assert_eq!(body["mimeType"], "application/vnd.google-apps.spreadsheet");
    assert_eq!(body["name"], "Alice");
    assert_eq!(body["parents"], serde_json::json!(["folder-1"]));
}

#[tokio::test]
async fn test_create_folder_has_no_parent() {
    let (server, backend) = setup_google_mock().await;

    Mock::given(method("POST"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "folder-1", "name": "Entire.Life"
        })))
        .mount(&server)
        .await;

    backend
        .create_resource(&token(), None, "Entire.Life", ResourceKind::Folder)
        .await
        .unwrap();

    let body = request_body(&server, "/drive/v3/files").await;
    assert_eq!(body["mimeType"], "application/vnd.google-apps.folder");
    assert!(body.get("parents").is_none());
}

#[tokio::test]
async fn test_upload_document_is_multipart() {
    let (server, backend) = setup_google_mock().await;

    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(query_param("uploadType", "multipart"))
        .and(body_string_contains("\"name\":\"README.md\""))
        .and(body_string_contains("Welcome to Entire.Life"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "doc-1", "name": "README.md"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let doc = backend
        .upload_document(&token(), "folder-1", "README.md", "Welcome to Entire.Life")
        .await
        .unwrap();
    assert_eq!(doc.id, "doc-1");

    let requests = server.received_requests().await.unwrap();
    let content_type = requests[0]
        .headers
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.starts_with("multipart/related; boundary="));
}
