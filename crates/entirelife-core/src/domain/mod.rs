//! Domain entities and business logic
//!
//! This module contains the core domain types for Entire.Life:
//! - Journal entries and their user-facing content
//! - Validated ledger names and the reserved storage keys
//! - Tombstones (recent deletions) that block remote resurrection
//! - References to remote containers and per-ledger resources
//! - Domain-specific error types

pub mod entry;
pub mod errors;
pub mod newtypes;
pub mod remote;
pub mod tombstone;

// Re-export commonly used types
pub use entry::{Entry, EntryContent, ENTRY_FIELDS, WELCOME_EMOJI, WELCOME_TITLE};
pub use errors::{DomainError, StoreError};
pub use newtypes::{
    is_reserved_key, LedgerName, Timestamp, ACCESS_TOKEN_KEY, RECENTLY_DELETED_KEY, RESERVED_KEYS,
};
pub use remote::{RemoteResourceRef, ResourceKind};
pub use tombstone::Tombstone;
