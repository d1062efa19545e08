//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including validation failures and local store failures.

use thiserror::Error;

use super::newtypes::Timestamp;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Ledger name is empty after trimming
    #[error("Invalid ledger name: {0:?}")]
    InvalidLedgerName(String),

    /// Ledger name collides with a key reserved for internal use
    #[error("The name \"{0}\" is reserved for internal use; please pick something else.")]
    ReservedName(String),

    /// Date is not an ISO-8601 calendar date
    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

/// Errors returned by the local store use cases
///
/// Validation errors (`NameCollision`, `Validation`) are always raised before
/// anything is written, so they never leave partial state behind.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another ledger already uses this name
    #[error("You already have a ledger for {0}; please name this one something unique.")]
    NameCollision(String),

    /// A domain validation rule rejected the input
    #[error(transparent)]
    Validation(#[from] DomainError),

    /// No ledger with this name exists
    #[error("No ledger named \"{0}\"!")]
    LedgerNotFound(String),

    /// No entry with this `created` timestamp exists in the ledger
    #[error("Cannot find existing entry with created=\"{created}\" in ledger \"{ledger}\"")]
    EntryNotFound {
        /// Ledger that was searched
        ledger: String,
        /// Identity of the missing entry
        created: Timestamp,
    },

    /// An entry with this `created` timestamp already exists in the ledger
    #[error("Ledger \"{ledger}\" already has an entry with created=\"{created}\"")]
    DuplicateEntry {
        /// Ledger that was written to
        ledger: String,
        /// Identity that collided
        created: Timestamp,
    },

    /// The underlying key/value adapter failed
    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl StoreError {
    /// Returns true for errors caused by invalid user input rather than I/O
    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::NameCollision(_) | StoreError::Validation(_))
    }

    /// Returns true if the error reports a missing ledger or entry
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::LedgerNotFound(_) | StoreError::EntryNotFound { .. }
        )
    }
}
