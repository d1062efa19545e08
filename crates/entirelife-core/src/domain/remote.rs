//! References to remote backend resources

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Kind of remote resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// The single container holding every ledger's resource
    Folder,
    /// One per ledger
    Spreadsheet,
    /// Plain document, e.g. the README written into a new container
    Document,
}

impl ResourceKind {
    /// MIME type the Drive API uses for this kind
    pub fn mime_type(&self) -> &'static str {
        match self {
            ResourceKind::Folder => "application/vnd.google-apps.folder",
            ResourceKind::Spreadsheet => "application/vnd.google-apps.spreadsheet",
            ResourceKind::Document => "text/plain; charset=utf-8",
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Folder => "folder",
            ResourceKind::Spreadsheet => "spreadsheet",
            ResourceKind::Document => "document",
        };
        f.write_str(s)
    }
}

/// A remote container or per-ledger resource
///
/// Only ever cached in memory for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteResourceRef {
    /// Backend identifier
    pub id: String,
    /// Display name, matched exactly when searching
    pub name: String,
}

impl RemoteResourceRef {
    /// Creates a new reference
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}
