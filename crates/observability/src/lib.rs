//! # Observability
//!
//! Tracing and Prometheus metrics for the stereo conditioner.
//!
//! - tracing subscriber setup (JSON, pretty or compact output)
//! - Prometheus exporter with descriptions for every conditioner metric
//! - per-run aggregation of tuple and dispatch statistics
//!
//! ```ignore
//! observability::init()?;
//!
//! if let Some(tuple) = engine.push(message) {
//!     observability::record_tuple(&tuple);
//! }
//! ```

pub mod metrics;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    record_dispatch_outcome, record_message_received, record_pending, record_processing_ms,
    record_tuple, tuple_spread_ms, ConditionerMetricsAggregator, MetricsSummary, RunningStats,
    StatsSummary,
};

/// Per-message synchronizer spans are far too chatty at `trace`; keep them
/// out unless `RUST_LOG` asks for them explicitly.
const QUIET_DIRECTIVES: &[&str] = &["sync_engine=debug"];

/// Initialize tracing (JSON, honoring `RUST_LOG`) and the Prometheus
/// exporter on `0.0.0.0:9000`.
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// `None` disables the exporter
    pub metrics_port: Option<u16>,
    /// Used when `RUST_LOG` is unset
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: Some(9000),
            default_log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
    Compact,
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        QUIET_DIRECTIVES
            .iter()
            .filter_map(|d| d.parse().ok())
            .fold(EnvFilter::new(default_level), EnvFilter::add_directive)
    })
}

fn fmt_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .with_current_span(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_thread_names(true).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
    }
}

pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    tracing_subscriber::registry()
        .with(env_filter(&config.default_log_level))
        .with(fmt_layer(config.log_format))
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::info!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );
    Ok(())
}

/// Install only the Prometheus exporter, for hosts that already own the
/// tracing subscriber.
pub fn init_metrics_only(port: u16) -> Result<()> {
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("Failed to install Prometheus recorder on {addr}"))?;
    describe_metrics();

    tracing::info!(%addr, "Prometheus metrics endpoint initialized");
    Ok(())
}

/// Register help text for every metric the conditioner crates emit.
fn describe_metrics() {
    use ::metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

    describe_counter!("stereo_messages_received_total", "Stream messages received, by stream");
    describe_counter!("stereo_sync_received_total", "Messages pushed into the synchronizer");
    describe_counter!("stereo_sync_tuples_total", "Correlated tuples emitted by the synchronizer");
    describe_counter!(
        "stereo_sync_discarded_total",
        "Messages discarded by the synchronizer, by reason"
    );
    describe_gauge!("stereo_sync_pending", "Messages waiting in the synchronizer");
    describe_counter!("stereo_tuples_total", "Correlated tuples observed by the host");
    describe_histogram!(
        "stereo_tuple_spread_ms",
        Unit::Milliseconds,
        "Largest stamp difference inside a correlated tuple"
    );
    describe_counter!("stereo_frames_dispatched_total", "Frames handed to the estimator");
    describe_counter!("stereo_frames_paused_total", "Tuples dropped while paused");
    describe_counter!("stereo_frames_dropped_total", "Tuples dropped before dispatch, by reason");
    describe_counter!("stereo_estimator_failures_total", "Estimator calls that returned an error");
    describe_histogram!(
        "stereo_estimator_duration_seconds",
        Unit::Seconds,
        "Time spent inside the estimator"
    );
    describe_histogram!(
        "stereo_processing_ms",
        Unit::Milliseconds,
        "Time from message receipt to estimator return"
    );
    describe_counter!(
        "stereo_dispatch_outcomes_total",
        "Dispatch outcomes (dispatched, paused, dropped, estimator_failed)"
    );
    describe_counter!(
        "stereo_fallback_baseline_total",
        "Frames whose baseline came from the rig transform"
    );
    describe_counter!("stereo_rig_messages_total", "Messages produced by the synthetic rig");
    describe_counter!("stereo_rig_dropped_total", "Rig messages dropped on a full channel");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.metrics_port, Some(9000));
        assert_eq!(config.default_log_level, "info");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_quiet_directives_parse() {
        for directive in QUIET_DIRECTIVES {
            assert!(directive.parse::<tracing_subscriber::filter::Directive>().is_ok());
        }
    }

    #[test]
    fn test_describe_without_recorder_is_noop() {
        describe_metrics();
    }
}
