//! Remote resource resolver
//!
//! Finds or creates the remote container folder and the per-ledger
//! spreadsheets inside it.
//!
//! ## Policy
//!
//! - Zero matches: create (a new container also gets a `README.md`)
//! - One match: use it
//! - More matches: [`SyncError::AmbiguousRemoteResource`], nothing is guessed
//!
//! Each lookup runs at most once per resolver. Concurrent callers asking for
//! the same name await the single in-flight attempt; a failed attempt leaves
//! the slot empty so the next caller tries again.

use std::sync::Arc;

use dashmap::DashMap;
use entirelife_core::domain::{RemoteResourceRef, ResourceKind};
use entirelife_core::ports::{ITabularBackend, ResourceQuery};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::auth_client::AuthAwareClient;
use crate::SyncError;

/// Name of the explanatory document written into a new container
pub const README_NAME: &str = "README.md";

/// Content of the explanatory document written into a new container
pub const README_CONTENT: &str = "\
DO NOT DELETE OR RENAME THIS FOLDER
===================================

Entire.Life created this folder to keep a copy of your journal. Every
ledger you keep in Entire.Life is mirrored into its own spreadsheet here.

Entire.Life finds your data by this folder's name. Renaming or moving it
breaks syncing, and Entire.Life will behave as if you had no remote data.


YOU MAY EDIT THE SPREADSHEETS
=============================

Keep the first sheet of each spreadsheet in the same shape: the header row
and the column order must not change. Never edit the 'created' column of an
existing row, because that value is how Entire.Life recognises the row.
Apart from that, add, edit and delete rows as you like; the changes show up
in Entire.Life on the next sync.
";

/// Finds or creates remote resources, caching references for its lifetime
///
/// One resolver is created per execution context and shared by `Arc`.
pub struct RemoteResourceResolver {
    backend: Arc<dyn ITabularBackend>,
    client: Arc<AuthAwareClient>,
    folder_name: String,
    container: OnceCell<RemoteResourceRef>,
    resources: DashMap<String, Arc<OnceCell<RemoteResourceRef>>>,
}

impl RemoteResourceResolver {
    /// Creates a resolver
    ///
    /// # Arguments
    /// * `backend` - Remote backend
    /// * `client` - Auth-aware wrapper used for every call
    /// * `folder_name` - Name of the container folder, e.g. `Entire.Life`
    pub fn new(
        backend: Arc<dyn ITabularBackend>,
        client: Arc<AuthAwareClient>,
        folder_name: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            client,
            folder_name: folder_name.into(),
            container: OnceCell::new(),
            resources: DashMap::new(),
        }
    }

    /// Returns the container folder, creating it on first use
    pub async fn find_or_create_container(&self) -> Result<RemoteResourceRef, SyncError> {
        self.container
            .get_or_try_init(|| self.resolve_container())
            .await
            .cloned()
    }

    /// Returns the spreadsheet for ledger `name`, creating it on first use
    pub async fn find_or_create_resource(&self, name: &str) -> Result<RemoteResourceRef, SyncError> {
        let container = self.find_or_create_container().await?;
        let cell = self.resources.entry(name.to_string()).or_default().clone();
        cell.get_or_try_init(|| self.resolve_spreadsheet(&container, name))
            .await
            .cloned()
    }

    /// Lists every spreadsheet inside the container
    pub async fn list_resources(&self) -> Result<Vec<RemoteResourceRef>, SyncError> {
        let container = self.find_or_create_container().await?;
        let backend = &self.backend;
        let query = &ResourceQuery::spreadsheets_in(container.id);

        self.client
            .call("list_spreadsheets", |token| async move {
                backend.search(&token, query).await
            })
            .await
    }

    // ========================================================================
    // Uncached lookups
    // ========================================================================

    async fn resolve_container(&self) -> Result<RemoteResourceRef, SyncError> {
        let query = ResourceQuery::folder(&self.folder_name);
        if let Some(folder) = self.find_unique(&query, &self.folder_name).await? {
            debug!(id = %folder.id, "Found container folder");
            return Ok(folder);
        }

        let backend = &self.backend;
        let name = self.folder_name.as_str();
        let folder = self
            .client
            .call("create_folder", |token| async move {
                backend
                    .create_resource(&token, None, name, ResourceKind::Folder)
                    .await
            })
            .await?;
        info!(id = %folder.id, name, "Created container folder");

        let parent = folder.id.as_str();
        let uploaded = self
            .client
            .call("upload_readme", |token| async move {
                backend
                    .upload_document(&token, parent, README_NAME, README_CONTENT)
                    .await
            })
            .await;
        if let Err(e) = uploaded {
            warn!(error = %e, "Failed to upload README to the container folder");
        }

        Ok(folder)
    }

    async fn resolve_spreadsheet(
        &self,
        container: &RemoteResourceRef,
        name: &str,
    ) -> Result<RemoteResourceRef, SyncError> {
        let query = ResourceQuery::spreadsheet(&container.id, name);
        if let Some(sheet) = self.find_unique(&query, name).await? {
            debug!(id = %sheet.id, ledger = name, "Found spreadsheet");
            return Ok(sheet);
        }

        let backend = &self.backend;
        let parent = container.id.as_str();
        let sheet = self
            .client
            .call("create_spreadsheet", |token| async move {
                backend
                    .create_resource(&token, Some(parent), name, ResourceKind::Spreadsheet)
                    .await
            })
            .await?;
        info!(id = %sheet.id, ledger = name, "Created spreadsheet");
        Ok(sheet)
    }

    async fn find_unique(
        &self,
        query: &ResourceQuery,
        name: &str,
    ) -> Result<Option<RemoteResourceRef>, SyncError> {
        let backend = &self.backend;
        let mut found = self
            .client
            .call("search", |token| async move { backend.search(&token, query).await })
            .await?;

        match found.len() {
            0 | 1 => Ok(found.pop()),
            count => Err(SyncError::AmbiguousRemoteResource {
                name: name.to_string(),
                count,
            }),
        }
    }
}
