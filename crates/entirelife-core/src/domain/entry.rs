//! Journal entries
//!
//! An [`Entry`] is one dated record in a ledger. Its `created` timestamp is
//! immutable and unique within the ledger, and doubles as the entry's
//! primary key both locally and in the remote spreadsheet.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::Timestamp;

/// Column order used for the header row and every data row
pub const ENTRY_FIELDS: [&str; 6] = ["date", "emoji", "title", "body", "created", "updated"];

/// Title of the entry seeded into every new ledger
pub const WELCOME_TITLE: &str = "Hello World!";

/// Emoji of the entry seeded into every new ledger
pub const WELCOME_EMOJI: &str = "\u{1f423}";

/// The user-facing fields of an entry
///
/// These are the only fields a user (or a remote spreadsheet editor) may
/// change; `created` and `updated` are managed by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryContent {
    /// Calendar date the entry is about
    pub date: NaiveDate,
    /// Optional single emoji shown on the chart
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    /// Short title
    pub title: String,
    /// Optional free-form body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl EntryContent {
    /// Creates content with just a date and a title
    pub fn new(date: NaiveDate, title: impl Into<String>) -> Self {
        Self {
            date,
            emoji: None,
            title: title.into(),
            body: None,
        }
    }

    /// Sets the emoji (empty strings clear it)
    pub fn with_emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = non_empty(emoji.into());
        self
    }

    /// Sets the body (empty strings clear it)
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = non_empty(body.into());
        self
    }

    /// Parses an ISO-8601 calendar date such as `1990-12-31`
    pub fn parse_date(raw: &str) -> Result<NaiveDate, DomainError> {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|e| DomainError::InvalidDate(format!("{raw}: {e}")))
    }
}

/// A journal entry as stored locally and in the remote backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Calendar date the entry is about
    pub date: NaiveDate,
    /// Optional single emoji shown on the chart
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    /// Short title
    pub title: String,
    /// Optional free-form body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Creation time in ms; immutable primary key within the ledger
    pub created: Timestamp,
    /// Last modification time in ms
    pub updated: Timestamp,
}

impl Entry {
    /// Builds an entry from content and explicit timestamps
    pub fn from_content(content: EntryContent, created: Timestamp, updated: Timestamp) -> Self {
        Self {
            date: content.date,
            emoji: content.emoji,
            title: content.title,
            body: content.body,
            created,
            updated,
        }
    }

    /// The entry seeded into a freshly created ledger
    pub fn welcome(date_of_birth: NaiveDate, now: Timestamp) -> Self {
        let content = EntryContent::new(date_of_birth, WELCOME_TITLE).with_emoji(WELCOME_EMOJI);
        Self::from_content(content, now, now)
    }

    /// Returns a copy of the user-facing fields
    pub fn content(&self) -> EntryContent {
        EntryContent {
            date: self.date,
            emoji: self.emoji.clone(),
            title: self.title.clone(),
            body: self.body.clone(),
        }
    }

    /// Returns true if any user-facing field differs from `content`
    pub fn differs_from(&self, content: &EntryContent) -> bool {
        self.date != content.date
            || self.emoji != content.emoji
            || self.title != content.title
            || self.body != content.body
    }

    /// Replaces the user-facing fields and bumps `updated`
    pub fn apply(&mut self, content: EntryContent, now: Timestamp) {
        self.date = content.date;
        self.emoji = content.emoji;
        self.title = content.title;
        self.body = content.body;
        self.updated = now;
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
