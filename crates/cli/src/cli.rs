//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Stereo Conditioner - input conditioning for stereo visual odometry
#[derive(Parser, Debug)]
#[command(
    name = "stereo-conditioner",
    author,
    version,
    about = "Stereo odometry input conditioner",
    long_about = "Correlates left/right images and camera descriptors, derives the stereo \n\
                  geometry, normalizes encodings and hands conditioned frames to an \n\
                  odometry estimator. `run` drives a synthetic stereo rig."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "STEREO_CONDITIONER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "STEREO_CONDITIONER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the conditioner against the synthetic stereo rig
    Run(RunArgs),

    /// Validate a configuration file without running
    Validate(ValidateArgs),

    /// Display the effective configuration
    Info(InfoArgs),
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Run(_) => "run",
            Commands::Validate(_) => "validate",
            Commands::Info(_) => "info",
        }
    }
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "conditioner.toml",
        env = "STEREO_CONDITIONER_CONFIG"
    )]
    pub config: PathBuf,

    /// Stop after this many dispatched frames (0 = unlimited)
    #[arg(long, default_value = "0", env = "STEREO_CONDITIONER_MAX_FRAMES")]
    pub max_frames: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "STEREO_CONDITIONER_TIMEOUT")]
    pub timeout: u64,

    /// Rig capture rate, Hz
    #[arg(long, default_value = "20")]
    pub rate: f64,

    /// Rig baseline in meters
    #[arg(long, default_value = "0.12")]
    pub baseline: f64,

    /// Wire encoding of the synthetic images
    #[arg(long, default_value = "mono8")]
    pub encoding: String,

    /// Image width in pixels
    #[arg(long, default_value = "64")]
    pub width: u32,

    /// Image height in pixels
    #[arg(long, default_value = "48")]
    pub height: u32,

    /// Largest per-stream stamp jitter, seconds
    #[arg(long, default_value = "0")]
    pub jitter: f64,

    /// Probability of losing any single stream message
    #[arg(long, default_value = "0")]
    pub loss: f64,

    /// RNG seed of the synthetic rig
    #[arg(long, default_value = "0")]
    pub seed: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Channel buffer size between rig and conditioner
    #[arg(long, default_value = "64", env = "STEREO_CONDITIONER_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "STEREO_CONDITIONER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "conditioner.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "conditioner.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show static transforms
    #[arg(long)]
    pub transforms: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_overrides_parse() {
        let cli = Cli::try_parse_from([
            "stereo-conditioner",
            "-v",
            "run",
            "--config",
            "rig.toml",
            "--max-frames",
            "10",
            "--encoding",
            "rgb8",
            "--baseline",
            "0.3",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.config, PathBuf::from("rig.toml"));
                assert_eq!(args.max_frames, 10);
                assert_eq!(args.encoding, "rgb8");
                assert!((args.baseline - 0.3).abs() < 1e-12);
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["stereo-conditioner", "-q", "-v", "info"]).is_err());
    }
}
