//! In-memory tabular backend
//!
//! A process-local stand-in for Google Drive and Sheets, used by the engine
//! tests. It keeps folders, spreadsheets and documents in a flat list, counts
//! calls and can be told to reject tokens or fail the next call.

use std::collections::VecDeque;
use std::sync::Mutex;

use entirelife_core::domain::{RemoteResourceRef, ResourceKind};
use entirelife_core::ports::{AccessToken, BackendError, ITabularBackend, ResourceQuery, Row};

#[derive(Debug, Clone)]
struct StoredResource {
    id: String,
    name: String,
    kind: ResourceKind,
    parent: Option<String>,
    rows: Vec<Row>,
    content: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    resources: Vec<StoredResource>,
    next_id: u64,
    accepted_token: Option<String>,
    failures: VecDeque<BackendError>,
    fail_uploads: bool,
    writes: Vec<(String, String, Vec<Row>)>,
    search_calls: usize,
    create_calls: usize,
    delete_calls: usize,
}

/// [`ITabularBackend`] kept entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
}

impl InMemoryBackend {
    /// Creates an empty backend that accepts any token
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned lock only means a test already panicked
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Only accept calls made with this access token; others get a 401
    pub fn accept_only(&self, token: &str) {
        self.lock().accepted_token = Some(token.to_string());
    }

    /// Makes the next call fail with `error`
    pub fn fail_next(&self, error: BackendError) {
        self.lock().failures.push_back(error);
    }

    /// Makes every `upload_document` call fail with a server error
    pub fn fail_uploads(&self) {
        self.lock().fail_uploads = true;
    }

    /// Adds a folder and returns its id
    pub fn seed_folder(&self, name: &str) -> String {
        self.insert(None, name, ResourceKind::Folder, Vec::new())
    }

    /// Adds a spreadsheet with the given rows and returns its id
    pub fn seed_spreadsheet(&self, parent: &str, name: &str, rows: Vec<Row>) -> String {
        self.insert(Some(parent), name, ResourceKind::Spreadsheet, rows)
    }

    /// Replaces the rows of a spreadsheet
    pub fn set_rows(&self, id: &str, rows: Vec<Row>) {
        if let Some(resource) = self.lock().resources.iter_mut().find(|r| r.id == id) {
            resource.rows = rows;
        }
    }

    /// Returns the rows of a spreadsheet
    pub fn rows(&self, id: &str) -> Vec<Row> {
        self.lock()
            .resources
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.rows.clone())
            .unwrap_or_default()
    }

    /// Returns every resource of `kind` named `name`
    pub fn find(&self, name: &str, kind: ResourceKind) -> Vec<RemoteResourceRef> {
        self.lock()
            .resources
            .iter()
            .filter(|r| r.name == name && r.kind == kind)
            .map(|r| RemoteResourceRef::new(r.id.clone(), r.name.clone()))
            .collect()
    }

    /// Returns the content of the document named `name` in `parent`
    pub fn document(&self, parent: &str, name: &str) -> Option<String> {
        self.lock()
            .resources
            .iter()
            .find(|r| {
                r.kind == ResourceKind::Document
                    && r.name == name
                    && r.parent.as_deref() == Some(parent)
            })
            .and_then(|r| r.content.clone())
    }

    /// Every `write_range` payload received so far, as `(id, range, rows)`
    pub fn writes(&self) -> Vec<(String, String, Vec<Row>)> {
        self.lock().writes.clone()
    }

    /// Number of `search` calls received
    pub fn search_calls(&self) -> usize {
        self.lock().search_calls
    }

    /// Number of `create_resource` calls received
    pub fn create_calls(&self) -> usize {
        self.lock().create_calls
    }

    /// Number of `delete_rows` calls received
    pub fn delete_calls(&self) -> usize {
        self.lock().delete_calls
    }

    fn insert(&self, parent: Option<&str>, name: &str, kind: ResourceKind, rows: Vec<Row>) -> String {
        let mut state = self.lock();
        state.next_id += 1;
        let id = format!("{kind}-{}", state.next_id);
        state.resources.push(StoredResource {
            id: id.clone(),
            name: name.to_string(),
            kind,
            parent: parent.map(str::to_string),
            rows,
            content: None,
        });
        id
    }

    /// Applies injected failures and the token check
    fn admit(&self, token: &AccessToken) -> Result<(), BackendError> {
        let mut state = self.lock();
        if let Some(error) = state.failures.pop_front() {
            return Err(error);
        }
        match &state.accepted_token {
            Some(accepted) if accepted != token.secret() => Err(BackendError::AuthFailure {
                status: 401,
                message: "Request had invalid authentication credentials.".into(),
            }),
            _ => Ok(()),
        }
    }

    fn not_found(id: &str) -> BackendError {
        BackendError::Api {
            status: 404,
            message: format!("Requested entity was not found: {id}"),
        }
    }
}

#[async_trait::async_trait]
impl ITabularBackend for InMemoryBackend {
    async fn search(
        &self,
        token: &AccessToken,
        query: &ResourceQuery,
    ) -> Result<Vec<RemoteResourceRef>, BackendError> {
        // Let concurrent callers interleave like they would over HTTP
        tokio::task::yield_now().await;
        self.admit(token)?;

        let mut state = self.lock();
        state.search_calls += 1;
        Ok(state
            .resources
            .iter()
            .filter(|r| r.kind == query.kind)
            .filter(|r| query.name.as_ref().map_or(true, |n| &r.name == n))
            .filter(|r| query.parent.is_none() || r.parent == query.parent)
            .map(|r| RemoteResourceRef::new(r.id.clone(), r.name.clone()))
            .collect())
    }

    async fn create_resource(
        &self,
        token: &AccessToken,
        parent: Option<&str>,
        name: &str,
        kind: ResourceKind,
    ) -> Result<RemoteResourceRef, BackendError> {
        tokio::task::yield_now().await;
        self.admit(token)?;

        self.lock().create_calls += 1;
        let id = self.insert(parent, name, kind, Vec::new());
        Ok(RemoteResourceRef::new(id, name))
    }

    async fn upload_document(
        &self,
        token: &AccessToken,
        parent: &str,
        name: &str,
        content: &str,
    ) -> Result<RemoteResourceRef, BackendError> {
        self.admit(token)?;
        if self.lock().fail_uploads {
            return Err(BackendError::Api {
                status: 500,
                message: "Upload failed".into(),
            });
        }

        let id = self.insert(Some(parent), name, ResourceKind::Document, Vec::new());
        if let Some(doc) = self.lock().resources.iter_mut().find(|r| r.id == id) {
            doc.content = Some(content.to_string());
        }
        Ok(RemoteResourceRef::new(id, name))
    }

    async fn write_range(
        &self,
        token: &AccessToken,
        resource_id: &str,
        range: &str,
        rows: Vec<Row>,
    ) -> Result<(), BackendError> {
        self.admit(token)?;

        let mut state = self.lock();
        state
            .writes
            .push((resource_id.to_string(), range.to_string(), rows.clone()));
        let sheet = state
            .resources
            .iter_mut()
            .find(|r| r.id == resource_id)
            .ok_or_else(|| Self::not_found(resource_id))?;

        // Ranges always start at A1, so row i of the payload is sheet row i
        for (i, row) in rows.into_iter().enumerate() {
            if i < sheet.rows.len() {
                sheet.rows[i] = row;
            } else {
                sheet.rows.push(row);
            }
        }
        Ok(())
    }

    async fn delete_rows(
        &self,
        token: &AccessToken,
        resource_id: &str,
        _sheet_id: i64,
        start: usize,
        end: usize,
    ) -> Result<(), BackendError> {
        self.admit(token)?;

        let mut state = self.lock();
        state.delete_calls += 1;
        let sheet = state
            .resources
            .iter_mut()
            .find(|r| r.id == resource_id)
            .ok_or_else(|| Self::not_found(resource_id))?;

        let len = sheet.rows.len();
        sheet.rows.drain(start.min(len)..end.min(len));
        Ok(())
    }

    async fn read_range(
        &self,
        token: &AccessToken,
        resource_id: &str,
        _range: &str,
    ) -> Result<Vec<Row>, BackendError> {
        self.admit(token)?;

        self.lock()
            .resources
            .iter()
            .find(|r| r.id == resource_id)
            .map(|r| r.rows.clone())
            .ok_or_else(|| Self::not_found(resource_id))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_write_then_delete_trailing_rows() {
        let backend = InMemoryBackend::new();
        let token = AccessToken::bearer("t");
        let id = backend.seed_spreadsheet(
            "folder-1",
            "Alice",
            vec![vec![json!("h")], vec![json!("a")], vec![json!("b")], vec![json!("c")]],
        );

        backend
            .write_range(&token, &id, "Sheet1!A1:F2", vec![vec![json!("h")], vec![json!("b")]])
            .await
            .unwrap();
        backend.delete_rows(&token, &id, 0, 2, 4).await.unwrap();

        assert_eq!(backend.rows(&id), vec![vec![json!("h")], vec![json!("b")]]);
    }

    #[tokio::test]
    async fn test_rejects_other_tokens() {
        let backend = InMemoryBackend::new();
        backend.accept_only("good");

        let err = backend
            .search(&AccessToken::bearer("bad"), &ResourceQuery::folder("x"))
            .await
            .unwrap_err();
        assert!(err.is_auth_failure());
        assert!(backend
            .search(&AccessToken::bearer("good"), &ResourceQuery::folder("x"))
            .await
            .unwrap()
            .is_empty());
    }
}
