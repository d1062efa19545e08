//! Sheets value writes, row deletion and reads

use entirelife_core::ports::ITabularBackend;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{request_body, setup_google_mock, token};

#[tokio::test]
async fn test_write_range_uses_raw_batch_update() {
    let (server, backend) = setup_google_mock().await;

    Mock::given(method("POST"))
        .and(path("/v4/spreadsheets/sheet-1/values:batchUpdate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let rows = vec![
        vec![json!("date"), json!("emoji"), json!("title"), json!("body"), json!("created"), json!("updated")],
        vec![json!("2020-01-01"), json!("🐣"), json!("Hello World!"), json!(""), json!(1), json!(1)],
    ];
    backend
        .write_range(&token(), "sheet-1", "Sheet1!A1:F2", rows)
        .await
        .unwrap();

    let body = request_body(&server, "values:batchUpdate").await;
    assert_eq!(body["valueInputOption"], "RAW");
    assert_eq!(body["data"][0]["range"], "Sheet1!A1:F2");
    assert_eq!(body["data"][0]["values"][1][2], "Hello World!");
    assert_eq!(body["data"][0]["values"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_delete_rows_sends_delete_dimension() {
    let (server, backend) = setup_google_mock().await;

    Mock::given(method("POST"))
        .and(path("/v4/spreadsheets/sheet-1:batchUpdate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "replies": [{}] })))
        .expect(1)
        .mount(&server)
        .await;

    backend
        .delete_rows(&token(), "sheet-1", 0, 3, 5)
        .await
        .unwrap();

    let body = request_body(&server, "sheet-1:batchUpdate").await;
    let range = &body["requests"][0]["deleteDimension"]["range"];
    assert_eq!(range["sheetId"], 0);
    assert_eq!(range["dimension"], "ROWS");
    assert_eq!(range["startIndex"], 3);
    assert_eq!(range["endIndex"], 5);
}

#[tokio::test]
async fn test_read_range_requests_unformatted_values() {
    let (server, backend) = setup_google_mock().await;

    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-1/values/Sheet1!A1:F"))
        .and(query_param("valueRenderOption", "UNFORMATTED_VALUE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "range": "Sheet1!A1:F3",
            "majorDimension": "ROWS",
            "values": [
                ["date", "emoji", "title", "body", "created", "updated"],
                [43831, "🐣", "Hello World!", "", 1000, 1000]
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let rows = backend
        .read_range(&token(), "sheet-1", "Sheet1!A1:F")
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][0], json!(43831));
    assert_eq!(rows[1][4], json!(1000));
}

#[tokio::test]
async fn test_read_empty_sheet() {
    let (server, backend) = setup_google_mock().await;

    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-1/values/Sheet1!A1:F"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "range": "Sheet1!A1:F1000",
            "majorDimension": "ROWS"
        })))
        .mount(&server)
        .await;

    let rows = backend
        .read_range(&token(), "sheet-1", "Sheet1!A1:F")
        .await
        .unwrap();
    assert!(rows.is_empty());
}
