//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{ConditionerConfig, SyncStrategy, REG_STRATEGY_KEY};
use serde::Serialize;
use tracing::info;

use super::load_config;
use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    strategy: String,
    queue_size: usize,
    composite: bool,
    keep_color: bool,
    rectified: bool,
    transform_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = match load_config(&args.config) {
        Ok(config) => valid_result(args.config.display().to_string(), &config),
        Err(e) => ValidationResult {
            valid: false,
            config_path: args.config.display().to_string(),
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    };

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn valid_result(config_path: String, config: &ConditionerConfig) -> ValidationResult {
    let warnings = collect_warnings(config);
    ValidationResult {
        valid: true,
        config_path,
        error: None,
        warnings: (!warnings.is_empty()).then_some(warnings),
        summary: Some(ConfigSummary {
            version: format!("{:?}", config.version),
            strategy: config.sync.strategy.as_str().to_string(),
            queue_size: config.sync.queue_size,
            composite: config.sync.subscribe_composite,
            keep_color: config.stereo.keep_color,
            rectified: config.stereo.images_already_rectified,
            transform_count: config.transforms.len(),
        }),
    }
}

/// Non-fatal issues worth pointing out
fn collect_warnings(config: &ConditionerConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if let Some(value) = config.estimator.get(REG_STRATEGY_KEY) {
        if value != "0" {
            warnings.push(format!(
                "estimator.\"{REG_STRATEGY_KEY}\" = \"{value}\" will be forced to \"0\" \
                 (stereo odometry only supports visual registration)"
            ));
        }
    }

    if config.transforms.is_empty() {
        warnings.push(
            "No static transforms configured - frames are dropped unless the body \
             transform is provided elsewhere"
                .to_string(),
        );
    }

    if config.sync.subscribe_composite && config.sync.strategy == SyncStrategy::Approximate {
        warnings.push(
            "sync.strategy is ignored when subscribe_composite is set - bundles are \
             already paired"
                .to_string(),
        );
    }

    if config.watchdog.warn_after_sec == 0.0 {
        warnings.push("watchdog.warn_after_sec = 0 disables the input watchdog".to_string());
    }

    if !config.stereo.images_already_rectified && config.transforms.len() < 2 {
        warnings.push(
            "stereo.images_already_rectified = false needs a transform between the two \
             camera frames"
                .to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("OK  Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Strategy: {}", summary.strategy);
            println!("  Queue size: {}", summary.queue_size);
            println!("  Composite input: {}", summary.composite);
            println!("  Keep color: {}", summary.keep_color);
            println!("  Already rectified: {}", summary.rectified);
            println!("  Static transforms: {}", summary.transform_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\nWarnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("ERR Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
