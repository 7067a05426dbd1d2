//! ConditionerConfig - Config Loader output
//!
//! Describes how the conditioner subscribes (four streams or one composite
//! stream), how it correlates them, how it interprets stereo geometry, and
//! which static transforms and estimator parameters it starts with.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use crate::RigidTransform;

/// Registration strategy key understood by the estimator.
pub const REG_STRATEGY_KEY: &str = "Reg/Strategy";

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete conditioner configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ConditionerConfig {
    #[serde(default)]
    pub version: ConfigVersion,

    #[serde(default)]
    #[validate(nested)]
    pub frames: FrameConfig,

    #[serde(default)]
    #[validate(nested)]
    pub sync: SyncConfig,

    #[serde(default)]
    #[validate(nested)]
    pub stereo: StereoConfig,

    #[serde(default)]
    pub gate: GateConfig,

    #[serde(default)]
    #[validate(nested)]
    pub watchdog: WatchdogConfig,

    /// Parameters forwarded to the estimator (`"Reg/Strategy" = "0"`, ...)
    #[serde(default)]
    pub estimator: BTreeMap<String, String>,

    /// Static transforms known at startup
    #[serde(default)]
    pub transforms: Vec<StaticTransformConfig>,
}

/// Frame naming
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FrameConfig {
    /// Body frame the estimator reports motion in
    #[serde(default = "default_base_frame")]
    #[validate(length(min = 1, message = "base_frame_id cannot be empty"))]
    pub base_frame_id: String,
}

fn default_base_frame() -> String {
    "base_link".to_string()
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            base_frame_id: default_base_frame(),
        }
    }
}

/// Correlation strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStrategy {
    /// Bit-identical stamps only
    #[default]
    Exact,
    /// Stamps within `max_interval_sec`
    Approximate,
}

impl SyncStrategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            SyncStrategy::Exact => "exact",
            SyncStrategy::Approximate => "approx",
        }
    }
}

/// Synchronizer configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SyncConfig {
    #[serde(default)]
    pub strategy: SyncStrategy,

    /// Pending messages retained per stream before the oldest is dropped
    #[serde(default = "default_queue_size")]
    #[validate(range(min = 1, max = 10000))]
    pub queue_size: usize,

    /// Largest stamp spread accepted by the approximate strategy (seconds)
    #[serde(default = "default_max_interval")]
    #[validate(range(exclusive_min = 0.0))]
    pub max_interval_sec: f64,

    /// Subscribe to the pre-paired composite stream instead of four streams
    #[serde(default)]
    pub subscribe_composite: bool,
}

fn default_queue_size() -> usize {
    5
}

fn default_max_interval() -> f64 {
    0.05
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            strategy: SyncStrategy::default(),
            queue_size: default_queue_size(),
            max_interval_sec: default_max_interval(),
            subscribe_composite: false,
        }
    }
}

/// Stereo interpretation
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StereoConfig {
    /// Keep the left image in color (bgr8) when the source has color
    #[serde(default)]
    pub keep_color: bool,

    /// Input images are already rectified
    #[serde(default = "default_true")]
    pub images_already_rectified: bool,

    /// Baselines above this are accepted with a one-time warning (meters)
    #[serde(default = "default_max_baseline")]
    #[validate(range(exclusive_min = 0.0))]
    pub max_plausible_baseline_m: f64,
}

fn default_true() -> bool {
    true
}

fn default_max_baseline() -> f64 {
    10.0
}

impl Default for StereoConfig {
    fn default() -> Self {
        Self {
            keep_color: false,
            images_already_rectified: true,
            max_plausible_baseline_m: default_max_baseline(),
        }
    }
}

/// Pause gate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default)]
    pub start_paused: bool,
}

/// Input watchdog
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WatchdogConfig {
    /// Warn when no synchronized tuple arrived for this long (0 = disabled)
    #[serde(default = "default_warn_after")]
    #[validate(range(min = 0.0))]
    pub warn_after_sec: f64,
}

fn default_warn_after() -> f64 {
    5.0
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            warn_after_sec: default_warn_after(),
        }
    }
}

/// Static transform `parent -> child`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticTransformConfig {
    pub parent: String,
    pub child: String,
    /// Meters
    pub translation: [f64; 3],
    /// Roll, pitch, yaw in radians
    #[serde(default)]
    pub rotation_rpy: [f64; 3],
}

impl StaticTransformConfig {
    pub fn to_rigid_transform(&self) -> RigidTransform {
        RigidTransform::from_xyz_rpy(self.translation, self.rotation_rpy)
    }
}

impl ConditionerConfig {
    /// Stream names this configuration subscribes to.
    pub fn subscribed_streams(&self) -> Vec<&'static str> {
        if self.sync.subscribe_composite {
            vec!["stereo_bundle"]
        } else {
            crate::StreamSlot::ALL.iter().map(|s| s.name()).collect()
        }
    }
}
