//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IKeyValueStore`] - Durable string-keyed JSON storage (SQLite, memory)
//! - [`ITabularBackend`] - Remote folder/spreadsheet operations (Google Drive and Sheets)
//! - [`ITokenProvider`] - Access to the backend credential and its renewal
//! - [`IInteractiveAuth`] - Interactive sign-in flow driven by a user
//! - [`ISignalSink`] - Outbound engine signals (synced, auth error, data updated)
//! - [`ILedgerNamePrompt`] - Asks for an alternative ledger name on collisions
//! - [`IClock`] - Millisecond wall clock

pub mod clock;
pub mod key_value_store;
pub mod prompt;
pub mod signals;
pub mod tabular_backend;
pub mod token_provider;

pub use clock::{IClock, ManualClock, SystemClock};
pub use key_value_store::IKeyValueStore;
pub use prompt::{ILedgerNamePrompt, NoPrompt};
pub use signals::{EngineSignal, ISignalSink, NullSignalSink, SyncSignal};
pub use tabular_backend::{BackendError, ITabularBackend, ResourceQuery, Row};
pub use token_provider::{AccessToken, IInteractiveAuth, ITokenProvider};
