//! # Integration Tests
//!
//! End-to-end tests across crates:
//! - configuration contract (TOML in, conditioner wired from it)
//! - stream messages through synchronizer, resolver, normalizer and estimator
//! - synthetic rig driving the conditioner on a runtime

#[cfg(test)]
mod support {
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;
    use contracts::{
        CameraDescriptor, ConditionerConfig, FrameContext, Header, ImageMessage, NormalizedFrame,
        RigidTransform, StreamMessage, Timestamp,
    };
    use dispatcher::{FnEstimator, StereoConditioner};
    use geometry::StaticTransformTree;

    pub const LEFT: &str = "left_camera";
    pub const RIGHT: &str = "right_camera";

    pub fn image(nanos: u64, frame: &str, encoding: &str, step: u32, data: Vec<u8>) -> ImageMessage {
        let bpp = match encoding {
            "mono16" => 2,
            "bgr8" | "rgb8" => 3,
            "bgra8" | "rgba8" => 4,
            _ => 1,
        };
        ImageMessage {
            header: Header::new(Timestamp::from_nanos(nanos), frame),
            width: step / bpp,
            height: (data.len() as u32) / step.max(1),
            encoding: encoding.into(),
            is_bigendian: false,
            step,
            data: Bytes::from(data),
        }
    }

    pub fn mono(nanos: u64, frame: &str) -> ImageMessage {
        image(nanos, frame, "mono8", 4, vec![10, 20, 30, 40, 50, 60, 70, 80])
    }

    /// `tx = -fx * baseline` with fx = 500.
    pub fn info(nanos: u64, frame: &str, tx: f64) -> CameraDescriptor {
        let p = [
            500.0, 0.0, 2.0, tx, //
            0.0, 500.0, 1.0, 0.0, //
            0.0, 0.0, 1.0, 0.0,
        ];
        CameraDescriptor::from_projection(Header::new(Timestamp::from_nanos(nanos), frame), 4, 2, &p)
    }

    /// Four messages of one instant with a 0.12 m baseline.
    pub fn quad(nanos: u64) -> [StreamMessage; 4] {
        [
            StreamMessage::LeftImage(mono(nanos, LEFT)),
            StreamMessage::RightImage(mono(nanos, RIGHT)),
            StreamMessage::LeftInfo(info(nanos, LEFT, 0.0)),
            StreamMessage::RightInfo(info(nanos, RIGHT, -60.0)),
        ]
    }

    /// `base_link -> left_camera -> right_camera`, right 0.12 m along +x.
    pub fn rig_tree() -> StaticTransformTree {
        let mut tree = StaticTransformTree::new();
        tree.insert("base_link", LEFT, RigidTransform::from_translation(0.1, 0.0, 1.0))
            .unwrap();
        tree.insert(LEFT, RIGHT, RigidTransform::from_translation(0.12, 0.0, 0.0))
            .unwrap();
        tree
    }

    pub struct Harness {
        pub conditioner: StereoConditioner,
        pub frames: Arc<Mutex<Vec<NormalizedFrame>>>,
    }

    impl Harness {
        pub fn new(mut config: ConditionerConfig, tree: StaticTransformTree) -> Self {
            let frames = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&frames);
            let estimator = FnEstimator::new(move |frame: NormalizedFrame, _ctx: &FrameContext| {
                sink.lock().unwrap().push(frame);
                Ok(RigidTransform::identity())
            });
            let conditioner = StereoConditioner::new(&mut config, Arc::new(tree), Box::new(estimator));
            Self {
                conditioner,
                frames,
            }
        }

        pub fn feed(&self, messages: impl IntoIterator<Item = StreamMessage>) {
            for m in messages {
                self.conditioner.on_message(m);
            }
        }

        pub fn calls(&self) -> usize {
            self.frames.lock().unwrap().len()
        }

        pub fn stamps(&self) -> Vec<Timestamp> {
            self.frames.lock().unwrap().iter().map(|f| f.stamp).collect()
        }
    }
}

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{SyncStrategy, REG_STRATEGY_KEY};

    use crate::support::{quad, Harness};

    const SAMPLE: &str = r#"
version = "V1"
[frames]
base_frame_id = "base_link"
[sync]
strategy = "approximate"
queue_size = 5
max_interval_sec = 0.05
subscribe_composite = false
[stereo]
keep_color = false
images_already_rectified = true
max_plausible_baseline_m = 10.0
[gate]
start_paused = false
[watchdog]
warn_after_sec = 5.0
[estimator]
"Reg/Strategy" = "1"
[[transforms]]
parent = "base_link"
child = "left_camera"
translation = [0.1, 0.0, 1.0]
rotation_rpy = [0.0, 0.0, 0.0]
"#;

    #[test]
    fn test_sample_config_wires_a_working_conditioner() {
        let config = ConfigLoader::load_from_str(SAMPLE, ConfigFormat::Toml).unwrap();
        assert_eq!(config.sync.strategy, SyncStrategy::Approximate);

        let tree = geometry::StaticTransformTree::from_config(&config.transforms).unwrap();
        let mut applied = config.clone();
        dispatcher::enforce_estimator_parameters(&mut applied.estimator);
        assert_eq!(applied.estimator[REG_STRATEGY_KEY], "0");

        let harness = Harness::new(config, tree);
        harness.feed(quad(1_000));
        assert_eq!(harness.calls(), 1);
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = ConfigLoader::load_from_str(SAMPLE, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&config).unwrap();
        let back = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(back.sync.queue_size, 5);
        assert_eq!(back.transforms.len(), 1);
    }
}

#[cfg(test)]
mod e2e_tests {
    use contracts::{
        CanonicalFormat, ConditionerConfig, StreamMessage, SyncStrategy, Timestamp,
    };
    use dispatcher::DispatchOutcome;
    use geometry::StaticTransformTree;

    use crate::support::*;

    fn approximate(max_interval_sec: f64) -> ConditionerConfig {
        let mut config = ConditionerConfig::default();
        config.sync.strategy = SyncStrategy::Approximate;
        config.sync.max_interval_sec = max_interval_sec;
        config
    }

    #[test]
    fn test_normalization_through_the_pipeline() {
        let mut config = ConditionerConfig::default();
        config.stereo.keep_color = true;
        let harness = Harness::new(config, rig_tree());

        // Left is 16-bit gray, right is color: both must come out mono8.
        let mut left16 = Vec::new();
        for v in [0u16, 65535, 0, 65535, 0, 65535, 0, 65535] {
            left16.extend_from_slice(&v.to_le_bytes());
        }
        harness.feed([
            StreamMessage::LeftImage(image(5, LEFT, "mono16", 8, left16)),
            StreamMessage::RightImage(image(5, RIGHT, "rgb8", 12, vec![200; 24])),
            StreamMessage::LeftInfo(info(5, LEFT, 0.0)),
            StreamMessage::RightInfo(info(5, RIGHT, -60.0)),
        ]);

        let frames = harness.frames.lock().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].left.format, CanonicalFormat::Mono8);
        assert_eq!(&frames[0].left.data[..4], &[0, 255, 0, 255]);
        assert_eq!(frames[0].right.format, CanonicalFormat::Mono8);
        assert_eq!(frames[0].right.data.len(), 8);
    }

    #[test]
    fn test_color_kept_for_left_only() {
        let mut config = ConditionerConfig::default();
        config.stereo.keep_color = true;
        let harness = Harness::new(config, rig_tree());
        harness.feed([
            StreamMessage::LeftImage(image(5, LEFT, "bgr8", 12, vec![1; 24])),
            StreamMessage::RightImage(image(5, RIGHT, "bgr8", 12, vec![1; 24])),
            StreamMessage::LeftInfo(info(5, LEFT, 0.0)),
            StreamMessage::RightInfo(info(5, RIGHT, -60.0)),
        ]);
        let frames = harness.frames.lock().unwrap();
        assert_eq!(frames[0].left.format, CanonicalFormat::Bgr8);
        assert_eq!(frames[0].right.format, CanonicalFormat::Mono8);
    }

    #[test]
    fn test_unsupported_encoding_drops_frame() {
        let harness = Harness::new(ConditionerConfig::default(), rig_tree());
        let mut outcome = None;
        for m in [
            StreamMessage::LeftImage(image(5, LEFT, "yuv422", 8, vec![0; 16])),
            StreamMessage::RightImage(mono(5, RIGHT)),
            StreamMessage::LeftInfo(info(5, LEFT, 0.0)),
            StreamMessage::RightInfo(info(5, RIGHT, -60.0)),
        ] {
            outcome = harness.conditioner.on_message(m).or(outcome);
        }
        assert!(matches!(
            outcome,
            Some(DispatchOutcome::Dropped(contracts::FrameError::UnsupportedEncoding { .. }))
        ));
        assert_eq!(harness.calls(), 0);
    }

    #[test]
    fn test_fallback_baseline_from_rig_transform() {
        let harness = Harness::new(ConditionerConfig::default(), rig_tree());
        for t in 1..=3u64 {
            harness.feed([
                StreamMessage::LeftImage(mono(t, LEFT)),
                StreamMessage::RightImage(mono(t, RIGHT)),
                StreamMessage::LeftInfo(info(t, LEFT, 0.0)),
                StreamMessage::RightInfo(info(t, RIGHT, 0.0)),
            ]);
        }
        let frames = harness.frames.lock().unwrap();
        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(|f| (f.model.baseline - 0.12).abs() < 1e-12));
    }

    #[test]
    fn test_invalid_baseline_without_fallback() {
        let mut tree = StaticTransformTree::new();
        tree.insert("base_link", LEFT, contracts::RigidTransform::identity())
            .unwrap();
        let harness = Harness::new(ConditionerConfig::default(), tree);
        harness.feed([
            StreamMessage::LeftImage(mono(9, LEFT)),
            StreamMessage::RightImage(mono(9, RIGHT)),
            StreamMessage::LeftInfo(info(9, LEFT, 0.0)),
            StreamMessage::RightInfo(info(9, RIGHT, 30.0)),
        ]);
        assert_eq!(harness.calls(), 0);
        assert_eq!(harness.conditioner.metrics().dropped, 1);
    }

    #[test]
    fn test_unrectified_without_calibration_is_dropped() {
        let mut config = ConditionerConfig::default();
        config.stereo.images_already_rectified = false;
        let mut tree = StaticTransformTree::new();
        tree.insert("base_link", LEFT, contracts::RigidTransform::identity())
            .unwrap();
        let harness = Harness::new(config, tree);

        let mut outcome = None;
        for m in quad(11) {
            outcome = harness.conditioner.on_message(m).or(outcome);
        }
        assert!(matches!(
            outcome,
            Some(DispatchOutcome::Dropped(
                contracts::FrameError::MissingCalibrationTransform { .. }
            ))
        ));
    }

    #[test]
    fn test_unrectified_with_calibration_carries_rig_transform() {
        let mut config = ConditionerConfig::default();
        config.stereo.images_already_rectified = false;
        let harness = Harness::new(config, rig_tree());
        harness.feed(quad(11));
        let frames = harness.frames.lock().unwrap();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].model.stereo_transform.is_some());
    }

    #[test]
    fn test_missing_body_transform_drops_quietly() {
        let harness = Harness::new(ConditionerConfig::default(), StaticTransformTree::new());
        harness.feed(quad(3));
        assert_eq!(harness.calls(), 0);
        assert_eq!(harness.conditioner.metrics().dropped, 1);
    }

    #[test]
    fn test_approximate_emits_one_tuple_per_round_in_order() {
        let harness = Harness::new(approximate(0.01), rig_tree());
        for round in 1..=5u64 {
            let base = round * 100_000_000;
            // Within 3 ms of each other, delivered in a scrambled order.
            harness.feed([
                StreamMessage::RightInfo(info(base + 3_000_000, RIGHT, -60.0)),
                StreamMessage::LeftImage(mono(base, LEFT)),
                StreamMessage::LeftInfo(info(base + 1_000_000, LEFT, 0.0)),
                StreamMessage::RightImage(mono(base + 2_000_000, RIGHT)),
            ]);
            assert_eq!(harness.calls() as u64, round);
        }
        let stamps = harness.stamps();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
        // Frame stamp is the later image stamp.
        assert_eq!(stamps[0], Timestamp::from_nanos(100_000_000 + 2_000_000));
    }

    #[test]
    fn test_exact_never_correlates_mismatched_stamps() {
        let harness = Harness::new(ConditionerConfig::default(), rig_tree());
        let [li, _, lc, rc] = quad(1_000);
        harness.feed([
            li,
            StreamMessage::RightImage(mono(1_001, RIGHT)),
            lc,
            rc,
        ]);
        assert_eq!(harness.calls(), 0);
        assert_eq!(harness.conditioner.pending(), 4);

        // The counterpart for 1_001 completes that instant; 1_000 never does.
        let [li, _, lc, rc] = quad(1_001);
        harness.feed([li, lc, rc]);
        assert_eq!(harness.stamps(), vec![Timestamp::from_nanos(1_001)]);
        assert_eq!(harness.conditioner.pending(), 0);
    }

    #[test]
    fn test_exact_pending_is_bounded_by_queue_size() {
        let mut config = ConditionerConfig::default();
        config.sync.queue_size = 2;
        let harness = Harness::new(config, rig_tree());
        for t in 1..=5u64 {
            harness.feed([StreamMessage::LeftImage(mono(t, LEFT))]);
        }
        assert_eq!(harness.conditioner.pending(), 2);
        assert_eq!(harness.conditioner.sync_stats().overflow, 3);
    }

    #[test]
    fn test_pause_blocks_estimator_and_resume_restores() {
        let harness = Harness::new(ConditionerConfig::default(), rig_tree());
        assert!(harness.conditioner.pause());
        for t in 1..=3u64 {
            harness.feed(quad(t * 10));
        }
        assert_eq!(harness.calls(), 0);
        assert_eq!(harness.conditioner.metrics().paused, 3);

        assert!(harness.conditioner.resume());
        harness.feed(quad(40));
        let frames = harness.frames.lock().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].stamp, Timestamp::from_nanos(40));
        assert_eq!(&frames[0].left.data[..], &[10, 20, 30, 40, 50, 60, 70, 80]);
    }

    #[test]
    fn test_flush_separates_pre_and_post_messages() {
        let harness = Harness::new(approximate(0.05), rig_tree());
        let [li, ri, lc, rc] = quad(500);
        harness.feed([li, ri]);
        harness.conditioner.flush();
        assert_eq!(harness.conditioner.pending(), 0);
        harness.feed([lc, rc]);
        assert_eq!(harness.calls(), 0);

        // A complete later instant still goes through.
        harness.feed(quad(900));
        assert_eq!(harness.stamps(), vec![Timestamp::from_nanos(900)]);
    }

    #[test]
    fn test_queue_size_change_rebuilds_synchronizer() {
        let harness = Harness::new(approximate(0.05), rig_tree());
        let [li, ri, ..] = quad(500);
        harness.feed([li, ri]);
        assert!(!harness.conditioner.set_queue_size(5));
        assert_eq!(harness.conditioner.pending(), 2);
        assert!(harness.conditioner.set_queue_size(8));
        assert_eq!(harness.conditioner.pending(), 0);
    }

    #[test]
    fn test_composite_stream() {
        let mut config = ConditionerConfig::default();
        config.sync.subscribe_composite = true;
        let harness = Harness::new(config, rig_tree());

        let mut generator = ingestion::RigGenerator::new(
            ingestion::MockRigConfig {
                composite: true,
                max_frames: Some(4),
                ..ingestion::MockRigConfig::default()
            },
            Timestamp::from_nanos(1_000),
        )
        .unwrap();
        while let Some(messages) = generator.next_tick() {
            harness.feed(messages);
        }
        assert_eq!(harness.calls(), 4);
        // Four-stream input is not accepted in composite mode.
        harness.feed(quad(u64::MAX / 2));
        assert_eq!(harness.calls(), 4);
        assert_eq!(harness.conditioner.sync_stats().misrouted, 4);
    }
}

#[cfg(test)]
mod rig_tests {
    use std::sync::Arc;
    use std::thread;

    use contracts::{ConditionerConfig, SyncStrategy};
    use ingestion::{MockRigConfig, MockStereoRig, RigGenerator};
    use observability::ConditionerMetricsAggregator;

    use crate::support::{rig_tree, Harness};

    #[tokio::test]
    async fn test_jittered_rig_through_approximate_sync() {
        let mut config = ConditionerConfig::default();
        config.sync.strategy = SyncStrategy::Approximate;
        config.sync.max_interval_sec = 0.01;
        let harness = Harness::new(config, rig_tree());

        let rig = MockStereoRig::new(MockRigConfig {
            rate_hz: 100.0,
            jitter_sec: 0.002,
            max_frames: Some(30),
            seed: 11,
            ..MockRigConfig::default()
        })
        .unwrap();
        let rx = rig.start(None).unwrap();

        let mut aggregator = ConditionerMetricsAggregator::new();
        while let Ok(message) = rx.recv().await {
            harness
                .conditioner
                .on_message_observed(message, |tuple| aggregator.observe_tuple(tuple));
        }

        assert!(harness.calls() >= 1);
        assert!(aggregator.spread_stats.max() <= 10.0);
        let stamps = harness.stamps();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(aggregator.total_tuples, harness.calls() as u64);
    }

    #[test]
    fn test_streams_on_separate_threads() {
        let harness = Arc::new(Harness::new(ConditionerConfig::default(), rig_tree()));

        let mut generator = RigGenerator::new(
            MockRigConfig {
                max_frames: Some(40),
                ..MockRigConfig::default()
            },
            contracts::Timestamp::from_nanos(1_000_000),
        )
        .unwrap();
        // Split the ticks by stream so each thread delivers one stream in order.
        let mut per_stream: [Vec<contracts::StreamMessage>; 4] = Default::default();
        while let Some(messages) = generator.next_tick() {
            for m in messages {
                if let Some(slot) = m.slot() {
                    per_stream[slot.index()].push(m);
                }
            }
        }

        let handles: Vec<_> = per_stream
            .into_iter()
            .map(|messages| {
                let harness = Arc::clone(&harness);
                thread::spawn(move || harness.feed(messages))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let stats = harness.conditioner.sync_stats();
        assert_eq!(stats.received, 160);
        assert_eq!(stats.emitted as usize, harness.calls());
        let stamps = harness.stamps();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }
}
