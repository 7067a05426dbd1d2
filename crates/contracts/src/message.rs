//! Stream messages - Frame Synchronizer input
//!
//! Raw samples as delivered by the four stereo streams (or the single
//! pre-paired composite stream), and the correlated tuple the synchronizer
//! hands to the assembler.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{FrameId, Header, Timestamp};

/// Raw image sample.
///
/// `encoding` is kept as the tag string received on the wire; it is only
/// interpreted by the encoding normalizer so unsupported tags survive up to
/// the point where they are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageMessage {
    pub header: Header,

    pub width: u32,

    pub height: u32,

    /// Encoding tag (`mono8`, `bgr8`, `16UC1`, ...)
    pub encoding: String,

    /// Byte order of multi-byte pixels
    #[serde(default)]
    pub is_bigendian: bool,

    /// Row length in bytes (may include padding)
    pub step: u32,

    /// Pixel buffer, shared and never mutated
    pub data: Bytes,
}

impl ImageMessage {
    /// An image carries no pixels when its buffer or either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() || self.width == 0 || self.height == 0
    }
}

/// Camera intrinsics plus the projection offset of one camera of the rig.
///
/// Built from the 3x4 projection matrix `P` of a calibrated camera:
/// `fx = P[0]`, `cx = P[2]`, `tx = P[3]`, `fy = P[5]`, `cy = P[6]`.
/// For the right camera of a rectified rig `tx = -fx * baseline`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraDescriptor {
    pub header: Header,
    pub width: u32,
    pub height: u32,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    /// P(0,3); zero when the calibration carries no stereo offset
    #[serde(default)]
    pub tx: f64,
}

impl CameraDescriptor {
    /// Extract intrinsics from a row-major 3x4 projection matrix.
    pub fn from_projection(header: Header, width: u32, height: u32, p: &[f64; 12]) -> Self {
        Self {
            header,
            width,
            height,
            fx: p[0],
            fy: p[5],
            cx: p[2],
            cy: p[6],
            tx: p[3],
        }
    }

    /// Baseline encoded in the projection offset: `-tx / fx`.
    ///
    /// Returns `0.0` when `fx` is zero (uncalibrated descriptor). Non-finite
    /// `tx` or `fx` yield a non-finite baseline, which rectified input rejects.
    pub fn baseline(&self) -> f64 {
        if self.fx == 0.0 {
            0.0
        } else {
            -self.tx / self.fx
        }
    }

    pub fn image_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Which of the four synchronized streams a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamSlot {
    LeftImage,
    RightImage,
    LeftInfo,
    RightInfo,
}

impl StreamSlot {
    pub const ALL: [StreamSlot; 4] = [
        StreamSlot::LeftImage,
        StreamSlot::RightImage,
        StreamSlot::LeftInfo,
        StreamSlot::RightInfo,
    ];

    /// Dense index, used for per-stream arrays.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            StreamSlot::LeftImage => 0,
            StreamSlot::RightImage => 1,
            StreamSlot::LeftInfo => 2,
            StreamSlot::RightInfo => 3,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            StreamSlot::LeftImage => "left/image_rect",
            StreamSlot::RightImage => "right/image_rect",
            StreamSlot::LeftInfo => "left/camera_info",
            StreamSlot::RightInfo => "right/camera_info",
        }
    }
}

impl fmt::Display for StreamSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pre-paired stereo sample delivered on the composite stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StereoBundle {
    /// Bundle header; its frame names the output frame
    pub header: Header,
    pub left_image: ImageMessage,
    pub right_image: ImageMessage,
    pub left_info: CameraDescriptor,
    pub right_info: CameraDescriptor,
}

/// One sample from any input stream.
#[derive(Debug, Clone)]
pub enum StreamMessage {
    LeftImage(ImageMessage),
    RightImage(ImageMessage),
    LeftInfo(CameraDescriptor),
    RightInfo(CameraDescriptor),
    Composite(Box<StereoBundle>),
}

impl StreamMessage {
    /// Stream slot, `None` for the composite stream.
    pub fn slot(&self) -> Option<StreamSlot> {
        match self {
            StreamMessage::LeftImage(_) => Some(StreamSlot::LeftImage),
            StreamMessage::RightImage(_) => Some(StreamSlot::RightImage),
            StreamMessage::LeftInfo(_) => Some(StreamSlot::LeftInfo),
            StreamMessage::RightInfo(_) => Some(StreamSlot::RightInfo),
            StreamMessage::Composite(_) => None,
        }
    }

    pub fn stamp(&self) -> Timestamp {
        match self {
            StreamMessage::LeftImage(m) | StreamMessage::RightImage(m) => m.header.stamp,
            StreamMessage::LeftInfo(c) | StreamMessage::RightInfo(c) => c.header.stamp,
            StreamMessage::Composite(b) => b.header.stamp,
        }
    }
}

/// Messages judged to represent the same instant, one per stream.
#[derive(Debug, Clone)]
pub struct CorrelatedTuple {
    pub left_image: ImageMessage,
    pub right_image: ImageMessage,
    pub left_info: CameraDescriptor,
    pub right_info: CameraDescriptor,
    /// Frame the conditioned output is expressed in
    pub output_frame_id: FrameId,
}

impl CorrelatedTuple {
    /// Tuple of four synchronized messages; output frame is the left image's.
    pub fn new(
        left_image: ImageMessage,
        right_image: ImageMessage,
        left_info: CameraDescriptor,
        right_info: CameraDescriptor,
    ) -> Self {
        let output_frame_id = left_image.header.frame_id.clone();
        Self {
            left_image,
            right_image,
            left_info,
            right_info,
            output_frame_id,
        }
    }

    /// Latest stamp among the members.
    pub fn stamp(&self) -> Timestamp {
        self.left_image
            .header
            .stamp
            .max(self.right_image.header.stamp)
            .max(self.left_info.header.stamp)
            .max(self.right_info.header.stamp)
    }

    /// Later of the two image stamps.
    pub fn image_stamp(&self) -> Timestamp {
        self.left_image.header.stamp.max(self.right_image.header.stamp)
    }
}

impl From<StereoBundle> for CorrelatedTuple {
    fn from(bundle: StereoBundle) -> Self {
        let output_frame_id = if bundle.header.frame_id.is_empty() {
            bundle.left_image.header.frame_id.clone()
        } else {
            bundle.header.frame_id
        };
        Self {
            left_image: bundle.left_image,
            right_image: bundle.right_image,
            left_info: bundle.left_info,
            right_info: bundle.right_info,
            output_frame_id,
        }
    }
}
