//! `run` command implementation.

use anyhow::{Context, Result};
use ingestion::MockRigConfig;
use std::time::Duration;
use tracing::{error, info};

use super::load_config;
use crate::cli::RunArgs;
use crate::pipeline::{rig_for, Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        strategy = config.sync.strategy.as_str(),
        queue_size = config.sync.queue_size,
        composite = config.sync.subscribe_composite,
        transforms = config.transforms.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        return Ok(());
    }

    let rig = rig_for(
        &config,
        MockRigConfig {
            rate_hz: args.rate,
            width: args.width,
            height: args.height,
            encoding: args.encoding.clone(),
            baseline_m: args.baseline,
            jitter_sec: args.jitter,
            loss_probability: args.loss,
            seed: args.seed,
            ..MockRigConfig::default()
        },
    );

    let pipeline = Pipeline::new(PipelineConfig {
        conditioner: config,
        rig,
        max_frames: (args.max_frames > 0).then_some(args.max_frames),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        buffer_size: args.buffer_size,
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    });

    info!("Starting pipeline...");
    let stats = pipeline
        .run_until(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        frames_dispatched = stats.metrics.dispatched,
        frames_dropped = stats.metrics.dropped,
        duration_secs = stats.duration.as_secs_f64(),
        fps = format!("{:.2}", stats.fps()),
        "Pipeline completed"
    );
    stats.print_summary();

    info!("Stereo conditioner finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
