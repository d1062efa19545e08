//! Tabular backend port (driven/secondary port)
//!
//! This module defines the interface to the remote store ledgers are mirrored
//! to: a container folder holding one spreadsheet per ledger. The primary
//! implementation targets Google Drive and Google Sheets.
//!
//! ## Design Notes
//!
//! - Unlike the other ports this one returns a typed [`BackendError`]. The
//!   sync engine must tell authorization failures apart from everything else,
//!   and that decision is made once, by the HTTP adapter, rather than by
//!   inspecting error strings.
//! - Every call takes the bearer credential explicitly so that the
//!   auth-aware client can retry a call with a refreshed token.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::token_provider::AccessToken;
use crate::domain::{RemoteResourceRef, ResourceKind};

/// One spreadsheet row; cells are raw JSON values (strings, numbers, blanks)
pub type Row = Vec<serde_json::Value>;

// ============================================================================
// BackendError
// ============================================================================

/// Errors returned by a tabular backend
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The credential was rejected (HTTP 401, or 403 `PERMISSION_DENIED`)
    #[error("Authorization failed ({status}): {message}")]
    AuthFailure {
        /// HTTP status code
        status: u16,
        /// Message reported by the backend
        message: String,
    },

    /// The backend answered with a non-success status
    #[error("Backend error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Message reported by the backend
        message: String,
    },

    /// The backend asked us to slow down
    #[error("Rate limited by backend")]
    TooManyRequests {
        /// Delay suggested by the `Retry-After` header, if any
        retry_after: Option<Duration>,
    },

    /// The request never got an answer
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with something we could not understand
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// Returns true if refreshing the credential might fix this error
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, BackendError::AuthFailure { .. })
    }
}

// ============================================================================
// ResourceQuery
// ============================================================================

/// Exact-name search for a folder or spreadsheet
///
/// Trashed resources are never returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceQuery {
    /// Exact name to match; `None` matches every resource of `kind`
    pub name: Option<String>,
    /// Kind of resource to look for
    pub kind: ResourceKind,
    /// Restrict the search to children of this container; `None` is global
    pub parent: Option<String>,
}

impl ResourceQuery {
    /// Global search for a folder named `name`
    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            kind: ResourceKind::Folder,
            parent: None,
        }
    }

    /// Search for a spreadsheet named `name` inside `parent`
    pub fn spreadsheet(parent: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            kind: ResourceKind::Spreadsheet,
            parent: Some(parent.into()),
        }
    }

    /// Every spreadsheet inside `parent`
    pub fn spreadsheets_in(parent: impl Into<String>) -> Self {
        Self {
            name: None,
            kind: ResourceKind::Spreadsheet,
            parent: Some(parent.into()),
        }
    }
}

// ============================================================================
// ITabularBackend
// ============================================================================

/// Port trait for the remote spreadsheet store
#[async_trait::async_trait]
pub trait ITabularBackend: Send + Sync {
    /// Finds non-trashed resources matching `query`
    async fn search(
        &self,
        token: &AccessToken,
        query: &ResourceQuery,
    ) -> Result<Vec<RemoteResourceRef>, BackendError>;

    /// Creates an empty resource of `kind` named `name`
    ///
    /// # Arguments
    /// * `parent` - Container to create the resource in; `None` for the root
    async fn create_resource(
        &self,
        token: &AccessToken,
        parent: Option<&str>,
        name: &str,
        kind: ResourceKind,
    ) -> Result<RemoteResourceRef, BackendError>;

    /// Uploads a small text document into `parent`
    async fn upload_document(
        &self,
        token: &AccessToken,
        parent: &str,
        name: &str,
        content: &str,
    ) -> Result<RemoteResourceRef, BackendError>;

    /// Overwrites `range` (A1 notation) of a spreadsheet with `rows`
    async fn write_range(
        &self,
        token: &AccessToken,
        resource_id: &str,
        range: &str,
        rows: Vec<Row>,
    ) -> Result<(), BackendError>;

    /// Deletes rows `[start, end)` (zero-based) from sheet `sheet_id`
    async fn delete_rows(
        &self,
        token: &AccessToken,
        resource_id: &str,
        sheet_id: i64,
        start: usize,
        end: usize,
    ) -> Result<(), BackendError>;

    /// Reads `range` (A1 notation) as unformatted values
    ///
    /// Trailing empty rows and cells are omitted by the backend, so rows may
    /// be shorter than the range is wide.
    async fn read_range(
        &self,
        token: &AccessToken,
        resource_id: &str,
        range: &str,
    ) -> Result<Vec<Row>, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failure_classification() {
        let auth = BackendError::AuthFailure {
            status: 401,
            message: "expired".into(),
        };
        let api = BackendError::Api {
            status: 500,
            message: "boom".into(),
        };
        assert!(auth.is_auth_failure());
        assert!(!api.is_auth_failure());
        assert!(!BackendError::Network("reset".into()).is_auth_failure());
    }

    #[test]
    fn test_query_constructors() {
        let q = ResourceQuery::folder("Entire.Life");
        assert_eq!(q.kind, ResourceKind::Folder);
        assert!(q.parent.is_none());

        let q = ResourceQuery::spreadsheet("folder-1", "Alice");
        assert_eq!(q.parent.as_deref(), Some("folder-1"));
        assert_eq!(q.name.as_deref(), Some("Alice"));

        let q = ResourceQuery::spreadsheets_in("folder-1");
        assert!(q.name.is_none());
    }
}
