//! # Stereo Conditioner CLI
//!
//! Command-line entry point.
//!
//! - Configuration loading and validation
//! - Synthetic rig run through the conditioner
//! - Graceful shutdown on Ctrl+C / SIGTERM

mod cli;
mod commands;
mod error;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_info, run_pipeline, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli)?;

    let command = cli.command.name();
    info!(version = env!("CARGO_PKG_VERSION"), command, "stereo-conditioner starting");

    let result = match &cli.command {
        Commands::Run(args) => run_pipeline(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    // `{:#}` keeps the whole context chain on one line for log scrapers.
    if let Err(e) = &result {
        tracing::error!(command, error = format!("{e:#}"), "command failed");
    }
    result
}

/// Logging setup from CLI options; `RUST_LOG` still takes precedence.
/// Metrics are installed by `run` on demand.
fn init_logging(cli: &Cli) -> Result<()> {
    let default_log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    observability::init_with_config(ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port: None,
        default_log_level: default_log_level.to_string(),
    })
}
