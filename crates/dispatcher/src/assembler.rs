//! Frame Assembler / Dispatcher.
//!
//! Turns one correlated tuple into a [`NormalizedFrame`] and hands it to the
//! estimator. Every per-frame failure drops only that frame.

use std::sync::Arc;
use std::time::Instant;

use contracts::{
    CanonicalFormat, CorrelatedTuple, Estimator, FrameContext, FrameError, FrameId,
    NormalizedFrame, RigidTransform, TransformProvider,
};
use geometry::StereoResolver;
use tracing::{debug, error, info, instrument, warn};

use crate::encoding::{normalize_as, PixelEncoding};
use crate::gate::PauseGate;
use crate::metrics::AssemblerMetrics;

/// Result of one dispatch attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Frame reached the estimator, which returned a pose
    Dispatched { sequence: u64, pose: RigidTransform },
    /// Gate closed; the estimator was not called
    Paused,
    /// Frame could not be built
    Dropped(FrameError),
    /// Frame reached the estimator, which failed
    EstimatorFailed { sequence: u64, message: String },
}

impl DispatchOutcome {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, DispatchOutcome::Dispatched { .. })
    }

    /// Metric label of the outcome.
    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Dispatched { .. } => "dispatched",
            DispatchOutcome::Paused => "paused",
            DispatchOutcome::Dropped(_) => "dropped",
            DispatchOutcome::EstimatorFailed { .. } => "estimator_failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssemblerOptions {
    /// Body frame the pose is expressed in
    pub base_frame_id: FrameId,
    /// Keep the left image in color when the source has color
    pub keep_color: bool,
}

pub struct FrameAssembler {
    options: AssemblerOptions,
    resolver: StereoResolver,
    transforms: Arc<dyn TransformProvider>,
    estimator: Box<dyn Estimator>,
    gate: PauseGate,
    metrics: Arc<AssemblerMetrics>,
    sequence: u64,
}

impl std::fmt::Debug for FrameAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameAssembler")
            .field("options", &self.options)
            .field("paused", &self.gate.is_paused())
            .field("sequence", &self.sequence)
            .finish()
    }
}

impl FrameAssembler {
    pub fn new(
        options: AssemblerOptions,
        resolver: StereoResolver,
        transforms: Arc<dyn TransformProvider>,
        estimator: Box<dyn Estimator>,
    ) -> Self {
        Self {
            options,
            resolver,
            transforms,
            estimator,
            gate: PauseGate::default(),
            metrics: Arc::new(AssemblerMetrics::new()),
            sequence: 0,
        }
    }

    /// Use an externally owned gate.
    pub fn with_gate(mut self, gate: PauseGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<AssemblerMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn gate(&self) -> &PauseGate {
        &self.gate
    }

    pub fn metrics(&self) -> &Arc<AssemblerMetrics> {
        &self.metrics
    }

    pub fn options(&self) -> &AssemblerOptions {
        &self.options
    }

    /// Build the frame for `tuple` without dispatching it.
    ///
    /// # Errors
    /// Any [`FrameError`]; nothing is retained on failure.
    pub fn assemble(&self, tuple: CorrelatedTuple) -> Result<NormalizedFrame, FrameError> {
        let left_encoding = PixelEncoding::parse(&tuple.left_image.encoding)?;
        let right_encoding = PixelEncoding::parse(&tuple.right_image.encoding)?;

        let left_empty = tuple.left_image.is_empty();
        let right_empty = tuple.right_image.is_empty();
        if left_empty || right_empty {
            return Err(FrameError::EmptyImage {
                left_empty,
                right_empty,
            });
        }

        // Never earlier than either image.
        let stamp = tuple.image_stamp();

        let sensor_frame = &tuple.left_image.header.frame_id;
        let local_transform = self
            .transforms
            .lookup(&self.options.base_frame_id, sensor_frame, stamp)
            .ok_or_else(|| FrameError::MissingBodyTransform {
                base_frame: self.options.base_frame_id.clone(),
                sensor_frame: sensor_frame.clone(),
            })?;

        let model = self.resolver.resolve(
            &tuple.left_info,
            &tuple.right_info,
            local_transform,
            self.transforms.as_ref(),
        )?;

        let left = normalize_as(
            &tuple.left_image,
            left_encoding,
            left_encoding.target(self.options.keep_color),
        )?;
        let right = normalize_as(&tuple.right_image, right_encoding, CanonicalFormat::Mono8)?;

        Ok(NormalizedFrame {
            left,
            right,
            model,
            stamp,
            frame_id: tuple.output_frame_id,
        })
    }

    /// Gate, assemble and hand the frame to the estimator.
    #[instrument(
        level = "debug",
        name = "frame_dispatch",
        skip(self, tuple),
        fields(stamp = %tuple.image_stamp(), frame = %tuple.output_frame_id)
    )]
    pub fn dispatch(&mut self, tuple: CorrelatedTuple) -> DispatchOutcome {
        self.metrics.inc_tuples();

        if self.gate.is_paused() {
            self.metrics.inc_paused();
            metrics::counter!("stereo_frames_paused_total").increment(1);
            return DispatchOutcome::Paused;
        }

        let frame = match self.assemble(tuple) {
            Ok(frame) => frame,
            Err(e) => {
                self.record_drop(&e);
                return DispatchOutcome::Dropped(e);
            }
        };

        self.sequence += 1;
        let context = FrameContext {
            sequence: self.sequence,
            stamp: frame.stamp,
            frame_id: frame.frame_id.clone(),
        };

        let started = Instant::now();
        let result = self.estimator.process(frame, &context);
        let elapsed = started.elapsed();
        self.metrics.add_estimator_time(elapsed.as_micros() as u64);
        metrics::histogram!("stereo_estimator_duration_seconds").record(elapsed.as_secs_f64());

        match result {
            Ok(pose) => {
                self.metrics.inc_dispatched();
                metrics::counter!("stereo_frames_dispatched_total").increment(1);
                if self.sequence == 1 {
                    info!(stamp = %context.stamp, frame = %context.frame_id, "first frame dispatched");
                }
                DispatchOutcome::Dispatched {
                    sequence: context.sequence,
                    pose,
                }
            }
            Err(e) => {
                self.metrics.inc_estimator_failures();
                metrics::counter!("stereo_estimator_failures_total").increment(1);
                warn!(sequence = context.sequence, error = %e, "estimator failed");
                DispatchOutcome::EstimatorFailed {
                    sequence: context.sequence,
                    message: e.to_string(),
                }
            }
        }
    }

    fn record_drop(&self, error: &FrameError) {
        self.metrics.inc_dropped();
        metrics::counter!("stereo_frames_dropped_total", "reason" => error.kind()).increment(1);
        match error {
            // Expected while transforms are still being published.
            FrameError::MissingBodyTransform { .. } => debug!(error = %error, "frame dropped"),
            // Already reported by the resolver.
            FrameError::InvalidBaseline { .. } => {}
            FrameError::EmptyImage { .. } => warn!(error = %error, "input images empty, frame dropped"),
            FrameError::MissingCalibrationTransform {
                target,
                source_frame,
            }
            | FrameError::DegenerateCalibrationTransform {
                target,
                source_frame,
            } => error!(
                kind = error.kind(),
                error = %error,
                "images are not rectified, so the rig transform between '{source_frame}' and \
                 '{target}' is required and must not be identity. Check the static transform \
                 between the two camera frames, or set images_already_rectified if they are."
            ),
            _ => warn!(kind = error.kind(), error = %error, "frame dropped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::FnEstimator;
    use bytes::Bytes;
    use contracts::{CameraDescriptor, Header, ImageMessage, Timestamp};
    use geometry::{ResolverOptions, StaticTransformTree};
    use std::sync::atomic::{AtomicU64, Ordering};

    fn image(nanos: u64, frame: &str, encoding: &str, data: Vec<u8>) -> ImageMessage {
        let bpp = data.len() as u32 / 2;
        ImageMessage {
            header: Header::new(Timestamp::from_nanos(nanos), frame),
            width: 2,
            height: 1,
            encoding: encoding.into(),
            is_bigendian: false,
            step: 2 * bpp,
            data: Bytes::from(data),
        }
    }

    fn info(nanos: u64, frame: &str, tx: f64) -> CameraDescriptor {
        let p = [
            500.0, 0.0, 1.0, tx, //
            0.0, 500.0, 0.5, 0.0, //
            0.0, 0.0, 1.0, 0.0,
        ];
        CameraDescriptor::from_projection(Header::new(Timestamp::from_nanos(nanos), frame), 2, 1, &p)
    }

    fn tuple(left_stamp: u64, right_stamp: u64) -> CorrelatedTuple {
        CorrelatedTuple::new(
            image(left_stamp, "left", "rgb8", vec![255, 0, 0, 0, 0, 255]),
            image(right_stamp, "right", "mono8", vec![7, 8]),
            info(left_stamp, "left", 0.0),
            info(right_stamp, "right", -60.0),
        )
    }

    fn transforms() -> Arc<dyn TransformProvider> {
        let mut tree = StaticTransformTree::new();
        tree.insert("base_link", "left", RigidTransform::from_translation(0.1, 0.0, 0.5))
            .unwrap();
        Arc::new(tree)
    }

    fn assembler(keep_color: bool, calls: Arc<AtomicU64>) -> FrameAssembler {
        let estimator = FnEstimator::new(move |frame: NormalizedFrame, _ctx: &FrameContext| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(frame.model.local_transform)
        });
        FrameAssembler::new(
            AssemblerOptions {
                base_frame_id: "base_link".into(),
                keep_color,
            },
            StereoResolver::new(ResolverOptions::default()),
            transforms(),
            Box::new(estimator),
        )
    }

    #[test]
    fn test_frame_built_from_tuple() {
        let assembler = assembler(false, Arc::default());
        let frame = assembler.assemble(tuple(100, 120)).unwrap();

        assert_eq!(frame.stamp, Timestamp::from_nanos(120));
        assert_eq!(frame.frame_id, "left");
        assert_eq!(frame.left.format, CanonicalFormat::Mono8);
        assert_eq!(frame.right.format, CanonicalFormat::Mono8);
        assert_eq!(&frame.right.data[..], &[7, 8]);
        assert!((frame.model.baseline - 0.12).abs() < 1e-12);
        assert!((frame.model.local_transform.z() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_keep_color_applies_to_left_only() {
        let assembler = assembler(true, Arc::default());
        let mut t = tuple(100, 100);
        t.right_image = image(100, "right", "bgr8", vec![1, 2, 3, 4, 5, 6]);
        let frame = assembler.assemble(t).unwrap();

        assert_eq!(frame.left.format, CanonicalFormat::Bgr8);
        assert_eq!(&frame.left.data[..], &[0, 0, 255, 255, 0, 0]);
        assert_eq!(frame.right.format, CanonicalFormat::Mono8);
    }

    #[test]
    fn test_unsupported_encoding_dropped() {
        let calls = Arc::new(AtomicU64::new(0));
        let mut assembler = assembler(false, Arc::clone(&calls));
        let mut t = tuple(100, 100);
        t.left_image.encoding = "yuv422".into();

        let outcome = assembler.dispatch(t);
        assert_eq!(
            outcome,
            DispatchOutcome::Dropped(FrameError::unsupported_encoding("yuv422"))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(assembler.metrics().snapshot().dropped, 1);
    }

    #[test]
    fn test_empty_image_dropped() {
        let assembler = assembler(false, Arc::default());
        let mut t = tuple(100, 100);
        t.right_image.data = Bytes::new();
        assert_eq!(
            assembler.assemble(t).unwrap_err(),
            FrameError::EmptyImage {
                left_empty: false,
                right_empty: true
            }
        );
    }

    #[test]
    fn test_missing_body_transform_dropped() {
        let mut assembler = assembler(false, Arc::default());
        assembler.options.base_frame_id = "odom".into();
        assert!(matches!(
            assembler.assemble(tuple(1, 1)),
            Err(FrameError::MissingBodyTransform { .. })
        ));
    }

    #[test]
    fn test_unrectified_without_rig_transform_dropped() {
        let calls = Arc::new(AtomicU64::new(0));
        let mut assembler = assembler(false, Arc::clone(&calls));
        assembler.resolver = StereoResolver::new(ResolverOptions {
            already_rectified: false,
            ..ResolverOptions::default()
        });

        let outcome = assembler.dispatch(tuple(5, 5));
        assert!(matches!(
            outcome,
            DispatchOutcome::Dropped(FrameError::MissingCalibrationTransform { .. })
        ));
        assert_eq!(outcome.label(), "dropped");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(assembler.metrics().snapshot().dropped, 1);
    }

    #[test]
    fn test_pause_gate_blocks_estimator() {
        let calls = Arc::new(AtomicU64::new(0));
        let mut assembler = assembler(false, Arc::clone(&calls));

        assembler.gate().pause();
        for i in 0..3 {
            assert_eq!(assembler.dispatch(tuple(i, i)), DispatchOutcome::Paused);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assembler.gate().resume();
        let outcome = assembler.dispatch(tuple(10, 10));
        assert!(matches!(outcome, DispatchOutcome::Dispatched { sequence: 1, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let snapshot = assembler.metrics().snapshot();
        assert_eq!(snapshot.paused, 3);
        assert_eq!(snapshot.dispatched, 1);
        assert_eq!(snapshot.tuples, 4);
    }

    #[test]
    fn test_estimator_failure_reported() {
        let estimator = FnEstimator::new(|_frame: NormalizedFrame, _ctx: &FrameContext| {
            Err(contracts::ContractError::estimator("lost track"))
        });
        let mut assembler = FrameAssembler::new(
            AssemblerOptions {
                base_frame_id: "base_link".into(),
                keep_color: false,
            },
            StereoResolver::new(ResolverOptions::default()),
            transforms(),
            Box::new(estimator),
        );
        match assembler.dispatch(tuple(5, 5)) {
            DispatchOutcome::EstimatorFailed { sequence, message } => {
                assert_eq!(sequence, 1);
                assert!(message.contains("lost track"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(assembler.metrics().snapshot().estimator_failures, 1);
    }
}
