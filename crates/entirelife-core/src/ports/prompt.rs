//! Ledger name prompt port (driving side callback)
//!
//! When sync discovers a remote spreadsheet whose name cannot be used
//! locally (it is reserved, or the store rejects it), the host is asked for
//! an alternative. A non-interactive host simply declines.

/// Port trait for asking the user to rename a discovered ledger
#[async_trait::async_trait]
pub trait ILedgerNamePrompt: Send + Sync {
    /// Asks for a replacement for `remote_name`
    ///
    /// # Arguments
    /// * `remote_name` - Name of the remote resource as found
    /// * `reason` - Human-readable reason the previous name was rejected
    ///
    /// # Returns
    /// `None` if the user declined or the host cannot ask.
    async fn alternative_name(&self, remote_name: &str, reason: &str) -> Option<String>;
}

/// Prompt that always declines
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrompt;

#[async_trait::async_trait]
impl ILedgerNamePrompt for NoPrompt {
    async fn alternative_name(&self, _remote_name: &str, _reason: &str) -> Option<String> {
        None
    }
}
