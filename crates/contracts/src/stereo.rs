//! StereoModel and NormalizedFrame - Frame Assembler output
//!
//! What the estimator receives: two canonical images plus the validated
//! stereo geometry for this one frame.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{CameraDescriptor, ContractError, FrameId, RigidTransform, Timestamp};

/// Validated stereo camera geometry for a single frame.
///
/// Built fresh for every correlated tuple and dropped after dispatch;
/// descriptors may change between frames after a recalibration.
#[derive(Debug, Clone)]
pub struct StereoModel {
    /// Left camera intrinsics (shared by both cameras once rectified)
    pub left: CameraDescriptor,

    /// Distance between optical centers, meters
    pub baseline: f64,

    /// Body frame -> left camera frame
    pub local_transform: RigidTransform,

    /// Right -> left rig transform, only for non-rectified input
    pub stereo_transform: Option<RigidTransform>,
}

impl StereoModel {
    pub fn new(
        left: CameraDescriptor,
        baseline: f64,
        local_transform: RigidTransform,
        stereo_transform: Option<RigidTransform>,
    ) -> Self {
        Self {
            left,
            baseline,
            local_transform,
            stereo_transform,
        }
    }

    /// Same camera and offsets, different baseline.
    pub fn with_baseline(self, baseline: f64) -> Self {
        Self { baseline, ..self }
    }

    pub fn fx(&self) -> f64 {
        self.left.fx
    }

    pub fn fy(&self) -> f64 {
        self.left.fy
    }

    pub fn cx(&self) -> f64 {
        self.left.cx
    }

    pub fn cy(&self) -> f64 {
        self.left.cy
    }

    pub fn image_size(&self) -> (u32, u32) {
        self.left.image_size()
    }
}

/// Canonical pixel layouts produced by the encoding normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalFormat {
    /// Single channel, 8 bit
    Mono8,
    /// Three channels, 8 bit, blue first
    Bgr8,
}

impl CanonicalFormat {
    pub const fn channels(self) -> usize {
        match self {
            CanonicalFormat::Mono8 => 1,
            CanonicalFormat::Bgr8 => 3,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            CanonicalFormat::Mono8 => "mono8",
            CanonicalFormat::Bgr8 => "bgr8",
        }
    }
}

impl fmt::Display for CanonicalFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tightly packed image in a canonical format.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    pub width: u32,
    pub height: u32,
    pub format: CanonicalFormat,
    /// `width * height * channels` bytes, no row padding
    pub data: Bytes,
}

impl NormalizedImage {
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.format.channels()
    }
}

/// Fully conditioned stereo frame handed to the estimator.
#[derive(Debug, Clone)]
pub struct NormalizedFrame {
    pub left: NormalizedImage,
    pub right: NormalizedImage,
    pub model: StereoModel,
    /// Later of the two image stamps
    pub stamp: Timestamp,
    /// Frame the estimate is expressed in
    pub frame_id: FrameId,
}

/// Per-dispatch context passed alongside the frame.
#[derive(Debug, Clone)]
pub struct FrameContext {
    /// Sequence number of dispatched frames, starting at 1
    pub sequence: u64,
    pub stamp: Timestamp,
    pub frame_id: FrameId,
}

/// External odometry estimator.
///
/// Invoked synchronously with a complete frame; the frame is moved in and
/// not retained by the conditioner.
pub trait Estimator: Send {
    /// Estimate the body pose for this frame.
    ///
    /// # Errors
    /// Implementation-defined; the conditioner logs and carries on.
    fn process(
        &mut self,
        frame: NormalizedFrame,
        context: &FrameContext,
    ) -> Result<RigidTransform, ContractError>;
}

impl<E: Estimator + ?Sized> Estimator for Box<E> {
    fn process(
        &mut self,
        frame: NormalizedFrame,
        context: &FrameContext,
    ) -> Result<RigidTransform, ContractError> {
        (**self).process(frame, context)
    }
}
