//! Ledger commands - create, list, rename and remove ledgers
//!
//! Every new ledger starts with a single entry on the date of birth. Ledger
//! names must be unique, non-blank and must not collide with the keys the
//! store reserves for itself.

use anyhow::{Context, Result};
use clap::Subcommand;
use entirelife_core::domain::EntryContent;
use tracing::info;

use crate::context::AppContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum LedgerCommand {
    /// Create a ledger
    Add {
        /// Name of the person the ledger is about
        name: String,
        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        born: String,
    },
    /// List ledgers
    List,
    /// Rename a ledger
    Rename {
        /// Current name
        old: String,
        /// New name
        new: String,
    },
    /// Remove a ledger and all of its entries from this device
    Remove {
        /// Ledger to remove
        name: String,
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
}

impl LedgerCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format);
        let journal = ctx.journal().await?;

        match self {
            LedgerCommand::Add { name, born } => {
                let date_of_birth = EntryContent::parse_date(born)?;
                let name = journal.add_ledger(name, date_of_birth).await?;
                info!(ledger = %name, "Ledger created");

                if format.is_json() {
                    fmt.print_json(&serde_json::json!({
                        "success": true,
                        "ledger": name.as_str(),
                    }));
                } else {
                    fmt.success(&format!("Created ledger {name}"));
                }
            }
            LedgerCommand::List => {
                let names = journal.ledgers().await?;
                if format.is_json() {
                    let mut ledgers = Vec::with_capacity(names.len());
                    for name in &names {
                        let count = journal.entries(name).await?.len();
                        ledgers.push(serde_json::json!({"name": name, "entries": count}));
                    }
                    fmt.print_json(&serde_json::json!({ "ledgers": ledgers }));
                } else if names.is_empty() {
                    fmt.info("No ledgers yet. Create one with 'entirelife ledger add'.");
                } else {
                    for name in &names {
                        let count = journal.entries(name).await?.len();
                        println!("{name} ({count} entries)");
                    }
                }
            }
            LedgerCommand::Rename { old, new } => {
                let name = journal.rename_ledger(old, new).await?;
                if format.is_json() {
                    fmt.print_json(&serde_json::json!({
                        "success": true,
                        "from": old,
                        "to": name.as_str(),
                    }));
                } else {
                    fmt.success(&format!("Renamed {old} to {name}"));
                    fmt.info("The spreadsheet under the old name is left in Google Drive.");
                }
            }
            LedgerCommand::Remove { name, yes } => {
                if !yes && !confirm(&format!("Remove ledger {name} and all of its entries?"))? {
                    fmt.info("Cancelled");
                    return Ok(());
                }
                journal.remove_ledger(name).await?;
                if format.is_json() {
                    fmt.print_json(&serde_json::json!({"success": true, "removed": name}));
                } else {
                    fmt.success(&format!("Removed ledger {name}"));
                }
            }
        }

        Ok(())
    }
}

/// Asks a yes/no question on the terminal; anything but `y`/`yes` is no
fn confirm(question: &str) -> Result<bool> {
    use std::io::Write;

    print!("{question} [y/N] ");
    std::io::stdout().flush().context("Failed to write prompt")?;

    let mut answer = String::new();
    std::io::stdin()
        .read_line(&mut answer)
        .context("Failed to read answer")?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
