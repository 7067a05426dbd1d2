//! Pipeline orchestrator - wires the synthetic rig into the conditioner.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use contracts::{ConditionerConfig, RigidTransform, StreamMessage, StreamSlot, TransformProvider};
use dispatcher::{DispatchOutcome, StereoConditioner};
use geometry::StaticTransformTree;
use ingestion::{BackpressureConfig, DropPolicy, IngestionMetrics, MockRigConfig, MockStereoRig};
use observability::{
    record_dispatch_outcome, record_message_received, record_pending, record_processing_ms,
    record_tuple, ConditionerMetricsAggregator,
};
use tracing::{info, warn};

use super::{LogEstimator, PipelineStats};
use crate::error::CliError;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub conditioner: ConditionerConfig,

    /// Synthetic input parameters
    pub rig: MockRigConfig,

    /// Stop after this many dispatched frames (None = unlimited)
    pub max_frames: Option<u64>,

    /// Run timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Channel buffer size between rig and conditioner
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Static transform tree from configuration.
    ///
    /// Without a configured `base -> left camera` path the body offset is
    /// taken as identity, otherwise every frame would be dropped.
    pub fn build_transforms(
        config: &ConditionerConfig,
        left_frame: &str,
    ) -> Result<StaticTransformTree, CliError> {
        let mut tree = StaticTransformTree::from_config(&config.transforms)?;
        let base = config.frames.base_frame_id.as_str();
        if tree
            .lookup(&base.into(), &left_frame.into(), contracts::Timestamp::ZERO)
            .is_none()
        {
            warn!(
                base,
                left_frame, "no body transform configured for the left camera; assuming identity"
            );
            tree.insert(base, left_frame, RigidTransform::identity())?;
        }
        Ok(tree)
    }

    /// Run until the rig finishes, a limit is hit or `shutdown` resolves.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let mut conditioner_config = self.config.conditioner.clone();

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let mut rig_config = self.config.rig.clone();
        rig_config.composite = conditioner_config.sync.subscribe_composite;

        let transforms = Self::build_transforms(&conditioner_config, &rig_config.left_frame_id)?;
        let transforms: Arc<dyn TransformProvider> = Arc::new(transforms);
        let conditioner = StereoConditioner::new(
            &mut conditioner_config,
            transforms,
            Box::new(LogEstimator::new(100)),
        );

        let rig = MockStereoRig::with_backpressure(
            rig_config,
            BackpressureConfig::new(self.config.buffer_size, DropPolicy::DropNewest),
        )
        .map_err(CliError::from)?;
        let ingestion_metrics = Arc::new(IngestionMetrics::new());
        let rx = rig
            .start(Some(Arc::clone(&ingestion_metrics)))
            .map_err(CliError::from)?;

        let warn_after = Duration::try_from_secs_f64(conditioner_config.watchdog.warn_after_sec)
            .unwrap_or(Duration::ZERO);
        let watchdog = conditioner.spawn_watchdog(warn_after);

        let max_frames = self.config.max_frames;
        info!(max_frames = ?max_frames, "Pipeline running");

        let mut stats = PipelineStats::default();
        let mut aggregator = ConditionerMetricsAggregator::new();

        let processing = async {
            tokio::pin!(shutdown);
            loop {
                let message = tokio::select! {
                    received = rx.recv() => match received {
                        Ok(message) => message,
                        Err(_) => {
                            info!("Stereo rig finished");
                            break;
                        }
                    },
                    () = &mut shutdown => {
                        warn!("Received shutdown signal, stopping pipeline...");
                        break;
                    }
                };

                stats.messages_received += 1;
                record_message_received(stream_name(&message));

                let started = Instant::now();
                let outcome = conditioner.on_message_observed(message, |tuple| {
                    record_tuple(tuple);
                    aggregator.observe_tuple(tuple);
                });
                record_pending(conditioner.pending());

                let Some(outcome) = outcome else { continue };
                record_dispatch_outcome(outcome.label());
                match outcome {
                    DispatchOutcome::Dispatched { .. } => {
                        let ms = started.elapsed().as_secs_f64() * 1e3;
                        record_processing_ms(ms);
                        aggregator.observe_dispatched(ms);
                    }
                    DispatchOutcome::Paused => aggregator.observe_paused(),
                    DispatchOutcome::Dropped(error) => aggregator.observe_dropped(error.kind()),
                    DispatchOutcome::EstimatorFailed { .. } => {
                        aggregator.observe_estimator_failure();
                    }
                }

                if let Some(max) = max_frames {
                    if aggregator.dispatched >= max {
                        info!(frames = aggregator.dispatched, "Reached max frames limit");
                        break;
                    }
                }
            }
        };

        if let Some(timeout) = self.config.timeout {
            if tokio::time::timeout(timeout, processing).await.is_err() {
                warn!(timeout_secs = timeout.as_secs_f64(), "Pipeline timed out");
            }
        } else {
            processing.await;
        }

        info!("Shutting down pipeline...");
        rig.stop();
        if let Some(watchdog) = watchdog {
            stats.watchdog_warnings = watchdog.warnings();
            watchdog.shutdown().await;
        }

        stats.duration = start_time.elapsed();
        stats.sync = conditioner.sync_stats();
        stats.assembler = conditioner.metrics();
        stats.diagnostics = conditioner.fired_diagnostics();
        stats.ingestion = ingestion_metrics.snapshot();
        stats.metrics = aggregator;

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            fps = format!("{:.2}", stats.fps()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }

    #[allow(dead_code)]
    pub async fn run(self) -> Result<PipelineStats> {
        self.run_until(std::future::pending()).await
    }
}

fn stream_name(message: &StreamMessage) -> &'static str {
    message.slot().map_or("stereo_bundle", StreamSlot::name)
}

/// Rig parameters that match the conditioner's configured frames.
pub fn rig_for(config: &ConditionerConfig, base: MockRigConfig) -> MockRigConfig {
    let left = config
        .transforms
        .iter()
        .find(|t| t.parent == config.frames.base_frame_id)
        .map(|t| t.child.clone());
    MockRigConfig {
        left_frame_id: left.clone().unwrap_or(base.left_frame_id),
        bundle_frame_id: left.unwrap_or(base.bundle_frame_id),
        composite: config.sync.subscribe_composite,
        ..base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{StaticTransformConfig, SyncStrategy};

    fn pipeline(conditioner: ConditionerConfig, rig: MockRigConfig) -> Pipeline {
        Pipeline::new(PipelineConfig {
            conditioner,
            rig: MockRigConfig {
                rate_hz: 500.0,
                ..rig
            },
            max_frames: None,
            timeout: Some(Duration::from_secs(10)),
            buffer_size: 256,
            metrics_port: None,
        })
    }

    #[test]
    fn test_identity_body_transform_when_unconfigured() {
        let tree = Pipeline::build_transforms(&ConditionerConfig::default(), "left_camera").unwrap();
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_configured_body_transform_kept() {
        let mut config = ConditionerConfig::default();
        config.transforms.push(StaticTransformConfig {
            parent: "base_link".into(),
            child: "left_camera".into(),
            translation: [0.1, 0.0, 1.0],
            rotation_rpy: [0.0; 3],
        });
        let tree = Pipeline::build_transforms(&config, "left_camera").unwrap();
        let t = tree
            .lookup(
                &"base_link".into(),
                &"left_camera".into(),
                contracts::Timestamp::ZERO,
            )
            .unwrap();
        assert!((t.z() - 1.0).abs() < 1e-12);
        assert_eq!(rig_for(&config, MockRigConfig::default()).left_frame_id, "left_camera");
    }

    #[tokio::test]
    async fn test_exact_run_dispatches_every_instant() {
        let stats = pipeline(
            ConditionerConfig::default(),
            MockRigConfig {
                max_frames: Some(10),
                ..MockRigConfig::default()
            },
        )
        .run()
        .await
        .unwrap();
        assert_eq!(stats.messages_received, 40);
        assert_eq!(stats.metrics.dispatched, 10);
        assert_eq!(stats.sync.emitted, 10);
        assert!(stats.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_approximate_run_with_jitter() {
        let mut config = ConditionerConfig::default();
        config.sync.strategy = SyncStrategy::Approximate;
        config.sync.max_interval_sec = 0.01;
        let stats = pipeline(
            config,
            MockRigConfig {
                max_frames: Some(20),
                jitter_sec: 0.001,
                seed: 3,
                ..MockRigConfig::default()
            },
        )
        .run()
        .await
        .unwrap();
        assert!(stats.metrics.dispatched >= 1);
        assert!(stats.metrics.spread_stats.max() <= 10.0);
    }

    #[tokio::test]
    async fn test_composite_run() {
        let mut config = ConditionerConfig::default();
        config.sync.subscribe_composite = true;
        let stats = pipeline(
            config,
            MockRigConfig {
                max_frames: Some(5),
                ..MockRigConfig::default()
            },
        )
        .run()
        .await
        .unwrap();
        assert_eq!(stats.messages_received, 5);
        assert_eq!(stats.metrics.dispatched, 5);
    }

    #[tokio::test]
    async fn test_zero_baseline_reported_in_stats() {
        let stats = pipeline(
            ConditionerConfig::default(),
            MockRigConfig {
                baseline_m: 0.0,
                max_frames: Some(3),
                ..MockRigConfig::default()
            },
        )
        .run()
        .await
        .unwrap();
        assert_eq!(stats.metrics.dispatched, 0);
        assert_eq!(stats.metrics.dropped, 3);
        assert_eq!(
            stats.diagnostics,
            vec![geometry::DiagnosticKind::DegenerateBaseline]
        );
    }

    #[tokio::test]
    async fn test_max_frames_stops_early() {
        let mut p = pipeline(ConditionerConfig::default(), MockRigConfig::default());
        p.config.max_frames = Some(3);
        let stats = p.run().await.unwrap();
        assert_eq!(stats.metrics.dispatched, 3);
    }
}
