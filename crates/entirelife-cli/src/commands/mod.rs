//! CLI subcommands

pub mod auth;
pub mod config;
pub mod entry;
pub mod ledger;
pub mod sync;
