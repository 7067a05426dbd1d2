//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use contracts::ConditionerConfig;
use serde::Serialize;
use tracing::info;

use super::load_config;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    base_frame_id: String,
    subscribed_streams: Vec<&'static str>,
    sync: SyncInfo,
    stereo: StereoInfo,
    start_paused: bool,
    watchdog_warn_after_sec: f64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    estimator: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    transforms: Vec<TransformInfo>,
}

#[derive(Serialize)]
struct SyncInfo {
    strategy: &'static str,
    queue_size: usize,
    max_interval_sec: f64,
    composite: bool,
}

#[derive(Serialize)]
struct StereoInfo {
    keep_color: bool,
    images_already_rectified: bool,
    max_plausible_baseline_m: f64,
}

#[derive(Serialize)]
struct TransformInfo {
    parent: String,
    child: String,
    translation: [f64; 3],
    rotation_rpy: [f64; 3],
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&config, args.transforms);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config, args.transforms);
    }

    Ok(())
}

fn build_config_info(config: &ConditionerConfig, with_transforms: bool) -> ConfigInfo {
    let transforms = if with_transforms {
        config
            .transforms
            .iter()
            .map(|t| TransformInfo {
                parent: t.parent.clone(),
                child: t.child.clone(),
                translation: t.translation,
                rotation_rpy: t.rotation_rpy,
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", config.version),
        base_frame_id: config.frames.base_frame_id.clone(),
        subscribed_streams: config.subscribed_streams(),
        sync: SyncInfo {
            strategy: config.sync.strategy.as_str(),
            queue_size: config.sync.queue_size,
            max_interval_sec: config.sync.max_interval_sec,
            composite: config.sync.subscribe_composite,
        },
        stereo: StereoInfo {
            keep_color: config.stereo.keep_color,
            images_already_rectified: config.stereo.images_already_rectified,
            max_plausible_baseline_m: config.stereo.max_plausible_baseline_m,
        },
        start_paused: config.gate.start_paused,
        watchdog_warn_after_sec: config.watchdog.warn_after_sec,
        estimator: config.estimator.clone(),
        transforms,
    }
}

fn print_config_info(config: &ConditionerConfig, with_transforms: bool) {
    println!("\n=== Stereo Conditioner Configuration ===\n");

    println!("Frames");
    println!("   Base frame: {}", config.frames.base_frame_id);
    println!("   Subscribed streams:");
    for stream in config.subscribed_streams() {
        println!("      {}", stream);
    }

    println!("\nSync");
    println!("   Strategy: {}", config.sync.strategy.as_str());
    println!("   Queue size: {}", config.sync.queue_size);
    println!("   Max interval: {:.3}s", config.sync.max_interval_sec);
    println!("   Composite input: {}", config.sync.subscribe_composite);

    println!("\nStereo");
    println!("   Keep color: {}", config.stereo.keep_color);
    println!(
        "   Already rectified: {}",
        config.stereo.images_already_rectified
    );
    println!(
        "   Max plausible baseline: {} m",
        config.stereo.max_plausible_baseline_m
    );

    println!("\nGate");
    println!("   Start paused: {}", config.gate.start_paused);
    println!(
        "   Watchdog: warn after {:.1}s",
        config.watchdog.warn_after_sec
    );

    if !config.estimator.is_empty() {
        println!("\nEstimator parameters");
        for (key, value) in &config.estimator {
            println!("   {} = {}", key, value);
        }
    }

    if with_transforms {
        println!("\nStatic transforms ({})", config.transforms.len());
        for t in &config.transforms {
            println!(
                "   {} -> {}  xyz={:?} rpy={:?}",
                t.parent, t.child, t.translation, t.rotation_rpy
            );
        }
    } else if !config.transforms.is_empty() {
        println!(
            "\nStatic transforms: {} (use --transforms for details)",
            config.transforms.len()
        );
    }

    println!();
}
