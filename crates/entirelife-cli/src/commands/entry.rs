//! Entry commands - add, list, edit and delete journal entries
//!
//! Entries are addressed by their `created` timestamp, shown in brackets by
//! `entry list`.

use anyhow::Result;
use clap::Subcommand;
use entirelife_core::domain::{Entry, EntryContent, StoreError, Timestamp};

use crate::context::AppContext;
use crate::output::{entry_line, get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum EntryCommand {
    /// Add an entry to a ledger
    Add {
        /// Ledger to add to
        ledger: String,
        /// Title of the entry
        title: String,
        /// Date the entry is about (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        /// Emoji shown next to the title
        #[arg(long)]
        emoji: Option<String>,
        /// Longer description
        #[arg(long)]
        body: Option<String>,
    },
    /// List the entries of a ledger by date
    List {
        /// Ledger to list
        ledger: String,
    },
    /// Change fields of an entry; omitted fields are kept
    Edit {
        /// Ledger holding the entry
        ledger: String,
        /// Identity of the entry, as shown by `entry list`
        created: Timestamp,
        #[arg(long)]
        title: Option<String>,
        /// New date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        /// New emoji; an empty value removes it
        #[arg(long)]
        emoji: Option<String>,
        /// New body; an empty value removes it
        #[arg(long)]
        body: Option<String>,
    },
    /// Delete an entry
    Delete {
        /// Ledger holding the entry
        ledger: String,
        /// Identity of the entry, as shown by `entry list`
        created: Timestamp,
    },
}

impl EntryCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format);
        let journal = ctx.journal().await?;

        match self {
            EntryCommand::Add {
                ledger,
                title,
                date,
                emoji,
                body,
            } => {
                let mut content = EntryContent::new(EntryContent::parse_date(date)?, title.clone());
                if let Some(emoji) = emoji {
                    content = content.with_emoji(emoji.clone());
                }
                if let Some(body) = body {
                    content = content.with_body(body.clone());
                }

                let entry = journal.add_entry(ledger, content).await?;
                print_entry(&*fmt, format, "Added", &entry)?;
            }
            EntryCommand::List { ledger } => {
                let entries = journal.entries(ledger).await?;
                if format.is_json() {
                    fmt.print_json(&serde_json::to_value(&entries)?);
                } else if entries.is_empty() {
                    fmt.info(&format!("{ledger} has no entries"));
                } else {
                    for entry in &entries {
                        println!("{}", entry_line(entry));
                    }
                }
            }
            EntryCommand::Edit {
                ledger,
                created,
                title,
                date,
                emoji,
                body,
            } => {
                let current = journal
                    .entries(ledger)
                    .await?
                    .into_iter()
                    .find(|e| e.created == *created)
                    .ok_or_else(|| StoreError::EntryNotFound {
                        ledger: ledger.clone(),
                        created: *created,
                    })?;

                let content = edited_content(
                    &current,
                    title.as_deref(),
                    date.as_deref(),
                    emoji.as_deref(),
                    body.as_deref(),
                )?;
                if !current.differs_from(&content) {
                    fmt.info("Nothing to change");
                    return Ok(());
                }

                let entry = journal.update_entry(ledger, *created, content).await?;
                print_entry(&*fmt, format, "Updated", &entry)?;
            }
            EntryCommand::Delete { ledger, created } => {
                let tombstone = journal.delete_entry(ledger, *created).await?;
                if format.is_json() {
                    fmt.print_json(&serde_json::to_value(&tombstone)?);
                } else {
                    fmt.success(&format!("Deleted {}", entry_line(&tombstone.entry)));
                }
            }
        }

        Ok(())
    }
}

fn print_entry(
    fmt: &dyn crate::output::OutputFormatter,
    format: OutputFormat,
    verb: &str,
    entry: &Entry,
) -> Result<()> {
    if format.is_json() {
        fmt.print_json(&serde_json::to_value(entry)?);
    } else {
        fmt.success(&format!("{verb} {}", entry_line(entry)));
    }
    Ok(())
}

/// Applies the given overrides to the content of `current`
fn edited_content(
    current: &Entry,
    title: Option<&str>,
    date: Option<&str>,
    emoji: Option<&str>,
    body: Option<&str>,
) -> Result<EntryContent> {
    let mut content = current.content();
    if let Some(title) = title {
        content.title = title.to_string();
    }
    if let Some(date) = date {
        content.date = EntryContent::parse_date(date)?;
    }
    if let Some(emoji) = emoji {
        content = content.with_emoji(emoji);
    }
    if let Some(body) = body {
        content = content.with_body(body);
    }
    Ok(content)
}
