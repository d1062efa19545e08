//! Entire.Life Sync - Ledger synchronization engine
//!
//! Provides:
//! - Bidirectional pull/push reconciliation keyed by entry `created` timestamps
//! - Find-or-create of the remote folder and per-ledger spreadsheets, at most
//!   once per name even under concurrent callers
//! - Transparent recovery from expired credentials (one refresh, one retry)
//! - Tombstone retention so deletions are not resurrected by a stale remote copy
//! - A background worker driven by `sync` signals
//!
//! ## Modules
//!
//! - [`auth_client`] - Auth-aware wrapper around every remote call
//! - [`resolver`] - Remote folder/spreadsheet discovery and creation
//! - [`rows`] - Spreadsheet row encoding and decoding
//! - [`reconciler`] - Per-ledger pull then push
//! - [`orchestrator`] - One full sync cycle over every ledger
//! - [`retention`] - Oldest-first tombstone purging
//! - [`worker`] - Background sync worker and worker registry
//! - [`journal`] - Host facade for user mutations

pub mod auth_client;
pub mod journal;
pub mod orchestrator;
pub mod reconciler;
pub mod resolver;
pub mod retention;
pub mod rows;
pub mod worker;

#[cfg(test)]
mod memory;
#[cfg(test)]
mod test_support;

pub use auth_client::AuthAwareClient;
pub use journal::Journal;
pub use orchestrator::{SyncOrchestrator, SyncOutcome, SyncSummary};
pub use reconciler::{ReconcileReport, Reconciler};
pub use resolver::RemoteResourceResolver;
pub use retention::TombstoneJanitor;
pub use worker::{ChannelSignalSink, SyncWorker, WorkerHandle, WorkerRegistry};

use entirelife_core::domain::StoreError;
use entirelife_core::ports::BackendError;
use thiserror::Error;

/// Errors that can occur during synchronization
#[derive(Debug, Error)]
pub enum SyncError {
    /// The backend rejected a freshly refreshed credential as well
    #[error("Google access token is probably stale; it is being refreshed, try again soon")]
    StaleAuthToken,

    /// No credential has been stored yet
    #[error("Not signed in to Google; run `entirelife auth login` first")]
    NotAuthenticated,

    /// The token provider could not produce a new credential
    #[error("Failed to refresh the access token: {0:#}")]
    RefreshFailed(#[source] anyhow::Error),

    /// The stored credential could not be read
    #[error("Failed to read the stored credential: {0:#}")]
    Credential(#[source] anyhow::Error),

    /// More than one remote resource matches a name that must be unique
    #[error(
        "You have {count} \"{name}\" items in your Google Drive; rename the ones \
         that do not hold Entire.Life data"
    )]
    AmbiguousRemoteResource {
        /// The name searched for
        name: String,
        /// How many matches were found
        count: usize,
    },

    /// A spreadsheet row could not be decoded
    #[error("Row {row} of ledger \"{ledger}\" is invalid: {reason}")]
    InvalidRow {
        /// Ledger being pulled
        ledger: String,
        /// One-based sheet row number
        row: usize,
        /// What was wrong with it
        reason: String,
    },

    /// A remote call failed for a reason other than authorization
    #[error("Remote backend error: {0}")]
    Backend(#[from] BackendError),

    /// The local store failed or rejected a mutation
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Returns true for credential problems that end a cycle quietly
    ///
    /// A deferred cycle is retried on the next `sync` signal, after the
    /// interactive side has had a chance to sign in again.
    pub fn is_deferrable(&self) -> bool {
        matches!(
            self,
            SyncError::StaleAuthToken | SyncError::NotAuthenticated | SyncError::RefreshFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deferrable_classification() {
        assert!(SyncError::StaleAuthToken.is_deferrable());
        assert!(SyncError::NotAuthenticated.is_deferrable());
        assert!(SyncError::RefreshFailed(anyhow::anyhow!("declined")).is_deferrable());
        assert!(!SyncError::AmbiguousRemoteResource {
            name: "Entire.Life".into(),
            count: 2
        }
        .is_deferrable());
        assert!(!SyncError::Backend(BackendError::Network("reset".into())).is_deferrable());
    }

    #[test]
    fn test_ambiguous_message_names_resource() {
        let err = SyncError::AmbiguousRemoteResource {
            name: "Alice".into(),
            count: 2,
        };
        assert!(err.to_string().contains("2 \"Alice\" items"));
    }
}
