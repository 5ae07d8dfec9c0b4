use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::assetstore::CloudinaryAssetStore;
use common::cli::{CommonArgs, CommonCommands, utils};
use common::docstore::FirestoreDocumentStore;
use janitor::{CleanupError, CleanupJob, CleanupSummary, OrphanCleanupConfig};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "mediasweep")]
#[command(about = "Deletes stored images that no document references")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Option<SweepCommands>,

    #[arg(long, global = true, help = "Log orphans without deleting them")]
    dry_run: bool,

    #[arg(long, global = true, help = "Exit non-zero when enumeration or any batch fails")]
    fail_on_error: bool,
}

#[derive(Subcommand)]
enum SweepCommands {
    #[command(flatten)]
    Common(CommonCommands),
}

impl Default for SweepCommands {
    fn default() -> Self {
        Self::Common(CommonCommands::Run)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging based on CLI arguments
    utils::init_logging(&cli.common);

    // Load application configuration
    let mut config = utils::load_config(cli.common.config.as_ref())?;
    if cli.dry_run {
        config.cleanup.dry_run = true;
    }

    // Handle common commands that don't run the job
    let command = cli.command.unwrap_or_default();
    let SweepCommands::Common(ref common_cmd) = command;
    let version = utils::version_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    if utils::handle_common_command(common_cmd, &config, &version)? {
        return Ok(ExitCode::SUCCESS);
    }

    let documents = FirestoreDocumentStore::new(&config.firestore)
        .context("Failed to create Firestore client")?;
    let assets = CloudinaryAssetStore::new(&config.cloudinary)
        .context("Failed to create Cloudinary client")?;

    let job = CleanupJob::new(
        OrphanCleanupConfig::from(&config),
        Arc::new(documents),
        Arc::new(assets),
    );

    let outcome = job.run().await;
    Ok(exit_code(&outcome, cli.fail_on_error))
}

/// Enumeration and batch failures only change the exit status when asked
/// to. An invalid configuration always does.
fn exit_code(outcome: &Result<CleanupSummary, CleanupError>, fail_on_error: bool) -> ExitCode {
    if let Err(e) = outcome {
        tracing::error!(error = %e, "Cleanup aborted");
    }
    if run_failed(outcome, fail_on_error) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run_failed(outcome: &Result<CleanupSummary, CleanupError>, fail_on_error: bool) -> bool {
    match outcome {
        Ok(summary) => fail_on_error && !summary.deletion.is_complete(),
        Err(CleanupError::Config(_)) => true,
        Err(CleanupError::Enumeration(_)) => fail_on_error,
    }
}
