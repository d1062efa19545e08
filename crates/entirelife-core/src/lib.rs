//! Entire.Life Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `Entry`, `LedgerName`, `Tombstone`, `RemoteResourceRef`
//! - **Use cases** - `LocalStore`, the typed offline store for ledgers,
//!   tombstones and the credential
//! - **Port definitions** - Traits for adapters: `IKeyValueStore`,
//!   `ITabularBackend`, `ITokenProvider`, `ISignalSink`, `IClock`
//! - **Configuration** - YAML-backed settings shared by every binary
//!
//! # Architecture
//!
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases orchestrate domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
