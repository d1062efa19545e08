//! Config command - View and manage Entire.Life configuration
//!
//! Provides the `entirelife config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Writes a default configuration file to start from
//! 3. Prints where the configuration file is looked up
//! 4. Validates the configuration file and reports errors

use anyhow::{Context, Result};
use clap::Subcommand;
use entirelife_core::config::Config;
use tracing::info;

use crate::context::AppContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the configuration file path
    Path,
    /// Validate configuration file
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(ctx, format),
            ConfigCommand::Init { force } => self.execute_init(ctx, *force, format),
            ConfigCommand::Path => {
                let path = ctx.config_path.display().to_string();
                if format.is_json() {
                    get_formatter(format).print_json(&serde_json::json!({
                        "path": path,
                        "exists": ctx.config_path.exists(),
                    }));
                } else {
                    println!("{path}");
                }
                Ok(())
            }
            ConfigCommand::Validate => self.execute_validate(ctx, format),
        }
    }

    fn execute_show(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        info!(config_path = %ctx.config_path.display(), "Showing configuration");

        if format.is_json() {
            let json = serde_json::to_value(&ctx.config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
            formatter.info("");

            let yaml = serde_yaml::to_string(&ctx.config)
                .context("Failed to serialize configuration to YAML")?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }

        Ok(())
    }

    fn execute_init(&self, ctx: &AppContext, force: bool, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let path = &ctx.config_path;

        if path.exists() && !force {
            formatter.error(&format!(
                "{} already exists; use --force to overwrite it",
                path.display()
            ));
            return Ok(());
        }

        Config::default().save(path)?;
        info!(config_path = %path.display(), "Wrote default configuration");

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "config_path": path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Wrote {}", path.display()));
            formatter.info("Set google.client_id before running 'entirelife auth login'.");
        }
        Ok(())
    }

    fn execute_validate(&self, ctx: &AppContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let path = &ctx.config_path;

        // Load explicitly so parse errors are reported instead of defaulted
        let config = match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                if format.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "valid": false,
                        "errors": [format!("{e:#}")],
                    }));
                } else {
                    formatter.error(&format!("{e:#}"));
                }
                return Ok(());
            }
        };

        let errors: Vec<String> = config.validate().iter().map(ToString::to_string).collect();
        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "errors": errors,
            }));
        } else if errors.is_empty() {
            formatter.success(&format!("{} is valid", path.display()));
        } else {
            formatter.error(&format!("{} has {} problem(s):", path.display(), errors.len()));
            for error in &errors {
                formatter.info(error);
            }
        }
        Ok(())
    }
}
