use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Common CLI arguments shared by every mediasweep job
#[derive(Parser, Debug, Clone, Default)]
pub struct CommonArgs {
    #[arg(long, global = true, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Enable quiet mode (minimal output)")]
    pub quiet: bool,
}

/// Common subcommands
#[derive(Subcommand, Debug, Clone, Default, PartialEq, Eq)]
pub enum CommonCommands {
    /// Run the job (default behavior)
    #[default]
    Run,
    /// Show current configuration and exit
    Config {
        #[arg(long, help = "Show configuration in JSON format")]
        json: bool,
    },
    /// Validate configuration and exit
    Validate,
    /// Show version information and exit
    Version,
}

/// Utility functions for CLI operations
pub mod utils {
    use super::*;
    use crate::config::Configuration;
    use anyhow::{Context, Result};
    use tracing_subscriber::EnvFilter;

    /// Initialize logging based on CLI arguments. An explicit `RUST_LOG`
    /// wins over the flags.
    pub fn init_logging(args: &CommonArgs) {
        let level = if args.quiet {
            "warn"
        } else if args.verbose {
            "debug"
        } else {
            "info"
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    /// Load configuration with optional override from CLI
    pub fn load_config(config_path: Option<&PathBuf>) -> Result<Configuration> {
        match config_path {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path.display());
                Configuration::load_from_path(path).context("Failed to load configuration")
            }
            None => Configuration::load().context("Failed to load configuration"),
        }
    }

    /// Display configuration in human-readable or JSON format, credentials redacted
    pub fn display_config(config: &Configuration, json: bool) -> Result<()> {
        let config = config.redacted();
        if json {
            let json = serde_json::to_string_pretty(&config)
                .context("Failed to serialize configuration to JSON")?;
            println!("{json}");
        } else {
            println!("mediasweep configuration:");
            println!("=========================");
            println!("Firestore project: {}", config.firestore.project_id);
            println!("Firestore database: {}", config.firestore.database);
            println!("Firestore endpoint: {}", config.firestore.base_url);
            println!("Cloudinary cloud: {}", config.cloudinary.cloud_name);
            println!("Cloudinary endpoint: {}", config.cloudinary.base_url);
            println!("Cloudinary resource type: {}", config.cloudinary.resource_type);
            println!("Cleanup folder: {}", config.cleanup.folder);
            println!("Search page size: {}", config.cleanup.search_page_size);
            println!("Delete batch size: {}", config.cleanup.batch_size);
            println!("Dry run: {}", config.cleanup.dry_run);
            println!("Batch pause: {:?}", config.cleanup.batch_pause);
        }
        Ok(())
    }

    /// Validate configuration and report any issues
    pub fn validate_config(config: &Configuration) -> Result<()> {
        tracing::info!("Validating configuration...");

        if config.firestore.project_id.is_empty() {
            anyhow::bail!("Firestore project id cannot be empty");
        }

        if config.cloudinary.cloud_name.is_empty() {
            anyhow::bail!("Cloudinary cloud name cannot be empty");
        }

        config.validate()?;

        tracing::info!("Configuration validation passed");
        Ok(())
    }

    /// Handle commands that don't run the job. Returns `true` when the
    /// command was handled here. `version` is the line printed by `version`.
    pub fn handle_common_command(
        command: &CommonCommands,
        config: &Configuration,
        version: &str,
    ) -> Result<bool> {
        match command {
            CommonCommands::Config { json } => {
                display_config(config, *json)?;
                Ok(true)
            }
            CommonCommands::Validate => {
                validate_config(config)?;
                Ok(true)
            }
            CommonCommands::Version => {
                println!("{version}");
                Ok(true)
            }
            CommonCommands::Run => Ok(false),
        }
    }

    /// Standard version line for a binary, from its own package metadata:
    /// `version_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))`
    pub fn version_info(name: &str, version: &str) -> String {
        format!("{name} {version}")
    }
}
