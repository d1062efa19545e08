//! Entire.Life CLI - Command-line interface for Entire.Life
//!
//! Provides commands for:
//! - Managing ledgers and their entries offline
//! - Signing in to Google
//! - Synchronizing ledgers with Google Sheets, once or continuously
//! - Viewing and initializing the configuration

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod output;

use commands::{
    auth::AuthCommand, config::ConfigCommand, entry::EntryCommand, ledger::LedgerCommand,
    sync::SyncCommand,
};
use context::AppContext;
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(
    name = "entirelife",
    version,
    about = "Offline life journal synchronized with Google Sheets"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage ledgers
    #[command(subcommand)]
    Ledger(LedgerCommand),
    /// Manage entries of a ledger
    #[command(subcommand)]
    Entry(EntryCommand),
    /// Synchronize ledgers with Google Sheets
    Sync(SyncCommand),
    /// Authentication commands
    #[command(subcommand)]
    Auth(AuthCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Log filter for the configured level raised by `-v` flags
///
/// `RUST_LOG` takes precedence over both.
fn default_filter(configured: &str, verbose: u8) -> &str {
    match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let ctx = AppContext::load(cli.config.as_deref());

    let filter = default_filter(&ctx.config.logging.level, cli.verbose);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = OutputFormat::from_flag(cli.json);

    let result = match &cli.command {
        Commands::Ledger(cmd) => cmd.execute(&ctx, format).await,
        Commands::Entry(cmd) => cmd.execute(&ctx, format).await,
        Commands::Sync(cmd) => cmd.execute(&ctx, format).await,
        Commands::Auth(cmd) => cmd.execute(&ctx, format).await,
        Commands::Config(cmd) => cmd.execute(&ctx, format).await,
    };

    if let Err(e) = &result {
        get_formatter(format).error(&format!("{e:#}"));
        std::process::exit(1);
    }
    Ok(())
}
