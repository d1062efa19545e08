//! Engine signals
//!
//! The sync worker is driven by inbound [`SyncSignal`]s and reports back
//! through [`EngineSignal`]s delivered to an [`ISignalSink`]. Hosts decide
//! what a signal means to them (refresh a view, show a sign-in prompt).

use serde::{Deserialize, Serialize};

/// Inbound signal accepted by a sync worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncSignal {
    /// Run one full sync cycle
    Sync,
}

/// Outbound signal emitted by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EngineSignal {
    /// A sync cycle completed
    Synced,
    /// A remote call was rejected for authorization reasons
    AuthError,
    /// A pull changed local data
    DataUpdated,
}

impl std::fmt::Display for EngineSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EngineSignal::Synced => "synced",
            EngineSignal::AuthError => "authError",
            EngineSignal::DataUpdated => "dataUpdated",
        };
        f.write_str(s)
    }
}

/// Port trait for delivering engine signals to the host
///
/// Delivery is fire-and-forget; a sink must never block the engine.
pub trait ISignalSink: Send + Sync {
    /// Delivers one signal
    fn emit(&self, signal: EngineSignal);
}

/// Sink that drops every signal
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSignalSink;

impl ISignalSink for NullSignalSink {
    fn emit(&self, _signal: EngineSignal) {}
}
