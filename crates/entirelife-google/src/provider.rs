//! GoogleSheetsBackend - ITabularBackend implementation for Google Drive and Sheets
//!
//! Maps each port operation onto one Google REST call:
//!
//! | Operation         | Call                                                     |
//! |-------------------|----------------------------------------------------------|
//! | `search`          | `GET drive/v3/files?q=...`                               |
//! | `create_resource` | `POST drive/v3/files`                                    |
//! | `upload_document` | `POST upload/drive/v3/files?uploadType=multipart`        |
//! | `write_range`     | `POST v4/spreadsheets/{id}/values:batchUpdate`           |
//! | `delete_rows`     | `POST v4/spreadsheets/{id}:batchUpdate` (deleteDimension)|
//! | `read_range`      | `GET v4/spreadsheets/{id}/values/{range}`                |
//!
//! ## Design Notes
//!
//! - The adapter is stateless apart from the HTTP client. The bearer token
//!   is passed per call so the auth-aware client can retry with a fresh one.
//! - Errors are classified by [`SheetsClient`]; nothing here inspects
//!   status codes.

use entirelife_core::domain::{RemoteResourceRef, ResourceKind};
use entirelife_core::ports::{AccessToken, BackendError, ITabularBackend, ResourceQuery, Row};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::client::{Api, SheetsClient};

/// Boundary used for `multipart/related` uploads
const MULTIPART_BOUNDARY: &str = "entirelife_multipart_boundary";

// ============================================================================
// Drive / Sheets response types
// ============================================================================

/// Response from `GET drive/v3/files`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

/// Minimal Drive file resource
#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
}

impl From<DriveFile> for RemoteResourceRef {
    fn from(file: DriveFile) -> Self {
        RemoteResourceRef::new(file.id, file.name)
    }
}

/// Response from `GET v4/spreadsheets/{id}/values/{range}`
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Row>,
}

// ============================================================================
// Query building
// ============================================================================

/// Escapes a value for use inside a single-quoted Drive query string
pub fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Builds the Drive `q` parameter for a [`ResourceQuery`]
pub fn build_drive_query(query: &ResourceQuery) -> String {
    let mut q = format!("mimeType='{}'", query.kind.mime_type());
    if let Some(name) = &query.name {
        q.push_str(&format!(" and name='{}'", escape_query_value(name)));
    }
    if let Some(parent) = &query.parent {
        q.push_str(&format!(" and '{}' in parents", escape_query_value(parent)));
    }
    q.push_str(" and trashed = false");
    q
}

/// Builds a `multipart/related` body holding JSON metadata and a text part
fn multipart_related_body(metadata: &serde_json::Value, content: &str) -> String {
    format!(
        "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{meta}\r\n\
         --{b}\r\nContent-Type: text/plain; charset=UTF-8\r\n\r\n{content}\r\n\
         --{b}--\r\n",
        b = MULTIPART_BOUNDARY,
        meta = metadata,
        content = content,
    )
}

// ============================================================================
// GoogleSheetsBackend
// ============================================================================

/// Tabular backend backed by Google Drive folders and Google Sheets
pub struct GoogleSheetsBackend {
    client: SheetsClient,
}

impl GoogleSheetsBackend {
    /// Creates a new backend over the given HTTP client
    pub fn new(client: SheetsClient) -> Self {
        Self { client }
    }

    /// Returns a reference to the underlying HTTP client
    pub fn client(&self) -> &SheetsClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl ITabularBackend for GoogleSheetsBackend {
    async fn search(
        &self,
        token: &AccessToken,
        query: &ResourceQuery,
    ) -> Result<Vec<RemoteResourceRef>, BackendError> {
        let q = build_drive_query(query);
        debug!(q = %q, "Searching Drive");

        let mut found = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .client
                .request(Method::GET, Api::Drive, "/files", token)
                .query(&[
                    ("spaces", "drive"),
                    ("q", q.as_str()),
                    ("fields", "nextPageToken,files(id,name)"),
                    ("pageSize", "1000"),
                ]);
            if let Some(page) = &page_token {
                request = request.query(&[("pageToken", page.as_str())]);
            }

            let page: FileList = self.client.send_json(request).await?;
            found.extend(page.files.into_iter().map(RemoteResourceRef::from));

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!(count = found.len(), "Drive search finished");
        Ok(found)
    }

    async fn create_resource(
        &self,
        token: &AccessToken,
        parent: Option<&str>,
        name: &str,
        kind: ResourceKind,
    ) -> Result<RemoteResourceRef, BackendError> {
        let mut body = json!({
            "mimeType": kind.mime_type(),
            "name": name,
        });
        if let Some(parent) = parent {
            body["parents"] = json!([parent]);
        }

        let request = self
            .client
            .request(Method::POST, Api::Drive, "/files", token)
            .query(&[("fields", "id,name")])
            .json(&body);
        let file: DriveFile = self.client.send_json(request).await?;

        debug!(id = %file.id, %kind, name, "Created Drive resource");
        Ok(file.into())
    }

    async fn upload_document(
        &self,
        token: &AccessToken,
        parent: &str,
        name: &str,
        content: &str,
    ) -> Result<RemoteResourceRef, BackendError> {
        let metadata = json!({
            "name": name,
            "parents": [parent],
        });

        let request = self
            .client
            .request(Method::POST, Api::DriveUpload, "/files", token)
            .query(&[("uploadType", "multipart"), ("fields", "id,name")])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(multipart_related_body(&metadata, content));
        let file: DriveFile = self.client.send_json(request).await?;

        debug!(id = %file.id, name, "Uploaded document");
        Ok(file.into())
    }

    async fn write_range(
        &self,
        token: &AccessToken,
        resource_id: &str,
        range: &str,
        rows: Vec<Row>,
    ) -> Result<(), BackendError> {
        let row_count = rows.len();
        let body = json!({
            "valueInputOption": "RAW",
            "data": [{ "range": range, "values": rows }],
        });

        let path = format!("/spreadsheets/{resource_id}/values:batchUpdate");
        let request = self
            .client
            .request(Method::POST, Api::Sheets, &path, token)
            .json(&body);
        self.client.send_empty(request).await?;

        debug!(resource_id, range, rows = row_count, "Wrote range");
        Ok(())
    }

    async fn delete_rows(
        &self,
        token: &AccessToken,
        resource_id: &str,
        sheet_id: i64,
        start: usize,
        end: usize,
    ) -> Result<(), BackendError> {
        let body = json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": start,
                        "endIndex": end,
                    }
                }
            }]
        });

        let path = format!("/spreadsheets/{resource_id}:batchUpdate");
        let request = self
            .client
            .request(Method::POST, Api::Sheets, &path, token)
            .json(&body);
        self.client.send_empty(request).await?;

        debug!(resource_id, start, end, "Deleted rows");
        Ok(())
    }

    async fn read_range(
        &self,
        token: &AccessToken,
        resource_id: &str,
        range: &str,
    ) -> Result<Vec<Row>, BackendError> {
        let path = format!("/spreadsheets/{resource_id}/values/{range}");
        let request = self
            .client
            .request(Method::GET, Api::Sheets, &path, token)
            .query(&[("valueRenderOption", "UNFORMATTED_VALUE")]);
        let values: ValueRange = self.client.send_json(request).await?;

        debug!(resource_id, range, rows = values.values.len(), "Read range");
        Ok(values.values)
    }
}
