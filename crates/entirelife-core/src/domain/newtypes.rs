//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers and values.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Milliseconds since the Unix epoch, as produced by [`IClock`](crate::ports::IClock)
pub type Timestamp = i64;

/// Storage key holding the global tombstone list
pub const RECENTLY_DELETED_KEY: &str = "recently-deleted";

/// Storage key holding the remote backend credential
pub const ACCESS_TOKEN_KEY: &str = "google-access-token";

/// Keys that can never be used as ledger names
pub const RESERVED_KEYS: &[&str] = &[RECENTLY_DELETED_KEY, ACCESS_TOKEN_KEY];

/// Returns true if `key` is reserved for internal use
pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

// ============================================================================
// LedgerName
// ============================================================================

/// A validated ledger name
///
/// The name is trimmed of surrounding whitespace, must not be empty and must
/// not equal any of the [`RESERVED_KEYS`]. Uniqueness across the store is
/// checked by the store itself, since it needs I/O.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LedgerName(String);

impl LedgerName {
    /// Normalizes and validates a raw ledger name
    pub fn new(raw: impl AsRef<str>) -> Result<Self, DomainError> {
        let normalized = raw.as_ref().trim();

        if normalized.is_empty() {
            return Err(DomainError::InvalidLedgerName(raw.as_ref().to_string()));
        }

        if is_reserved_key(normalized) {
            return Err(DomainError::ReservedName(normalized.to_string()));
        }

        Ok(Self(normalized.to_string()))
    }

    /// Returns the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the name and returns the inner string
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for LedgerName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LedgerName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LedgerName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LedgerName> for String {
    fn from(name: LedgerName) -> Self {
        name.0
    }
}

impl AsRef<str> for LedgerName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
