//! 模拟相机组配置、背压策略与指标

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::error::{IngestionError, Result};

/// 输出通道已满时的处理策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DropPolicy {
    /// 丢弃放不下的消息
    #[default]
    DropNewest,
    /// 等待消费者
    Block,
}

#[derive(Debug, Clone)]
pub struct BackpressureConfig {
    pub channel_capacity: usize,
    pub drop_policy: DropPolicy,
}

impl Default for BackpressureConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            drop_policy: DropPolicy::DropNewest,
        }
    }
}

impl BackpressureConfig {
    pub fn new(channel_capacity: usize, drop_policy: DropPolicy) -> Self {
        Self {
            channel_capacity,
            drop_policy,
        }
    }
}

/// 模拟双目相机组参数
#[derive(Debug, Clone)]
pub struct MockRigConfig {
    /// Used in log fields and errors
    pub name: String,
    /// Capture rate, Hz
    pub rate_hz: f64,
    pub width: u32,
    pub height: u32,
    /// Wire encoding tag of both images
    pub encoding: String,
    /// Extra bytes at the end of every image row
    pub row_padding: u32,
    /// Focal length in pixels, both axes
    pub focal_px: f64,
    /// Distance between the optical centers, meters
    pub baseline_m: f64,
    /// Largest per-stream stamp offset, seconds; zero gives exact stamps
    pub jitter_sec: f64,
    /// Probability that any single stream message is lost
    pub loss_probability: f64,
    /// Emit pre-paired bundles instead of four streams
    pub composite: bool,
    pub left_frame_id: String,
    pub right_frame_id: String,
    /// Frame named by composite bundles
    pub bundle_frame_id: String,
    /// Stop after this many capture instants
    pub max_frames: Option<u64>,
    /// RNG seed; fixed seeds make runs repeatable
    pub seed: u64,
}

impl Default for MockRigConfig {
    fn default() -> Self {
        Self {
            name: "mock_stereo".to_string(),
            rate_hz: 20.0,
            width: 64,
            height: 48,
            encoding: "mono8".to_string(),
            row_padding: 0,
            focal_px: 500.0,
            baseline_m: 0.12,
            jitter_sec: 0.0,
            loss_probability: 0.0,
            composite: false,
            left_frame_id: "left_camera".to_string(),
            right_frame_id: "right_camera".to_string(),
            bundle_frame_id: "left_camera".to_string(),
            max_frames: None,
            seed: 0,
        }
    }
}

impl MockRigConfig {
    /// Reject parameters that cannot produce a stream.
    pub fn validate(&self) -> Result<()> {
        if !(self.rate_hz.is_finite() && self.rate_hz > 0.0) {
            return Err(IngestionError::invalid("rate_hz", "must be positive"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(IngestionError::invalid("size", "width and height must be non-zero"));
        }
        bytes_per_pixel(&self.encoding)?;
        if !(self.focal_px.is_finite() && self.focal_px > 0.0) {
            return Err(IngestionError::invalid("focal_px", "must be positive"));
        }
        if !self.baseline_m.is_finite() {
            return Err(IngestionError::invalid("baseline_m", "must be finite"));
        }
        if !(self.jitter_sec.is_finite() && self.jitter_sec >= 0.0) {
            return Err(IngestionError::invalid("jitter_sec", "must be >= 0"));
        }
        if !(0.0..=1.0).contains(&self.loss_probability) {
            return Err(IngestionError::invalid("loss_probability", "must be within [0, 1]"));
        }
        Ok(())
    }

    pub fn period_nanos(&self) -> u64 {
        (1e9 / self.rate_hz).round() as u64
    }
}

/// Bytes per pixel for the encodings the rig can synthesize.
pub fn bytes_per_pixel(encoding: &str) -> Result<u32> {
    match encoding {
        "mono8" | "8UC1" => Ok(1),
        "mono16" => Ok(2),
        "bgr8" | "rgb8" => Ok(3),
        "bgra8" | "rgba8" => Ok(4),
        other => Err(IngestionError::invalid(
            "encoding",
            format!("cannot synthesize '{other}'"),
        )),
    }
}

#[derive(Debug, Default)]
pub struct IngestionMetrics {
    pub frames_generated: AtomicU64,
    pub messages_sent: AtomicU64,
    /// Lost on purpose (`loss_probability`)
    pub messages_lost: AtomicU64,
    /// Dropped because the channel was full
    pub messages_dropped: AtomicU64,
    pub queue_len: AtomicUsize,
}

impl IngestionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame(&self) {
        self.frames_generated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lost(&self) {
        self.messages_lost.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_generated: self.frames_generated.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_lost: self.messages_lost.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            queue_len: self.queue_len.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_generated: u64,
    pub messages_sent: u64,
    pub messages_lost: u64,
    pub messages_dropped: u64,
    pub queue_len: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = MockRigConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.period_nanos(), 50_000_000);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let cases: Vec<Box<dyn Fn(&mut MockRigConfig)>> = vec![
            Box::new(|c| c.rate_hz = 0.0),
            Box::new(|c| c.width = 0),
            Box::new(|c| c.encoding = "yuv422".into()),
            Box::new(|c| c.focal_px = -1.0),
            Box::new(|c| c.jitter_sec = f64::NAN),
            Box::new(|c| c.loss_probability = 1.5),
        ];
        for mutate in cases {
            let mut config = MockRigConfig::default();
            mutate(&mut config);
            assert!(config.validate().is_err(), "{config:?}");
        }
    }

    #[test]
    fn test_metrics_snapshot() {
        let metrics = IngestionMetrics::new();
        metrics.record_frame();
        metrics.record_sent();
        metrics.record_sent();
        metrics.record_dropped();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.frames_generated, 1);
        assert_eq!(snapshot.messages_sent, 2);
        assert_eq!(snapshot.messages_dropped, 1);
        assert_eq!(snapshot.messages_lost, 0);
    }
}
