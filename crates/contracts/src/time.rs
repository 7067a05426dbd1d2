//! Capture timestamps and message headers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::FrameId;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Capture time in integer nanoseconds.
///
/// Integer storage keeps equality exact: two stamps are "the same instant"
/// only when every bit matches, which is what exact synchronization needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    #[inline]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Build from a `(sec, nsec)` pair as carried by message headers.
    #[inline]
    pub const fn new(sec: u32, nsec: u32) -> Self {
        Self(sec as u64 * NANOS_PER_SEC + nsec as u64)
    }

    /// Negative or non-finite inputs clamp to zero.
    pub fn from_secs_f64(secs: f64) -> Self {
        if !secs.is_finite() || secs <= 0.0 {
            return Self::ZERO;
        }
        Self((secs * NANOS_PER_SEC as f64).round() as u64)
    }

    #[inline]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / NANOS_PER_SEC as f64
    }

    /// Absolute distance between two stamps, in seconds.
    #[inline]
    pub fn abs_diff_secs(self, other: Timestamp) -> f64 {
        self.0.abs_diff(other.0) as f64 / NANOS_PER_SEC as f64
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:09}",
            self.0 / NANOS_PER_SEC,
            self.0 % NANOS_PER_SEC
        )
    }
}

/// Stamp and frame name attached to every stream message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub stamp: Timestamp,
    pub frame_id: FrameId,
}

impl Header {
    pub fn new(stamp: Timestamp, frame_id: impl Into<FrameId>) -> Self {
        Self {
            stamp,
            frame_id: frame_id.into(),
        }
    }
}
