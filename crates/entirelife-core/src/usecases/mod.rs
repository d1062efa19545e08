//! Use cases (interactors) for Entire.Life
//!
//! This module contains the application use cases that orchestrate
//! domain entities and port interfaces. Use cases are thin coordinators
//! that delegate business rules to domain methods and I/O to ports.
//!
//! ## Use Cases
//!
//! - [`LocalStore`] - Ledger, entry, tombstone and credential storage

pub mod local_store;

pub use local_store::LocalStore;
