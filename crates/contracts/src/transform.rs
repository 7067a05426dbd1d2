//! RigidTransform and the transform provider boundary.

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use std::fmt;

use crate::{FrameId, Timestamp};

/// Tolerance used when deciding whether a looked-up transform is identity.
const IDENTITY_EPSILON: f64 = 1e-9;

/// 6-DoF rigid transform between two frames.
///
/// Only ever produced by a [`TransformProvider`] or by configuration; the
/// conditioner itself never invents one.
#[derive(Clone, Copy, PartialEq)]
pub struct RigidTransform(Isometry3<f64>);

impl RigidTransform {
    pub fn identity() -> Self {
        Self(Isometry3::identity())
    }

    pub fn from_isometry(iso: Isometry3<f64>) -> Self {
        Self(iso)
    }

    /// Pure translation.
    pub fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self(Isometry3::from_parts(
            Translation3::new(x, y, z),
            UnitQuaternion::identity(),
        ))
    }

    /// Translation plus roll/pitch/yaw rotation (radians).
    pub fn from_xyz_rpy(xyz: [f64; 3], rpy: [f64; 3]) -> Self {
        Self(Isometry3::from_parts(
            Translation3::new(xyz[0], xyz[1], xyz[2]),
            UnitQuaternion::from_euler_angles(rpy[0], rpy[1], rpy[2]),
        ))
    }

    pub fn isometry(&self) -> &Isometry3<f64> {
        &self.0
    }

    pub fn translation(&self) -> Vector3<f64> {
        self.0.translation.vector
    }

    /// Translation along the stereo (x) axis.
    pub fn x(&self) -> f64 {
        self.0.translation.vector.x
    }

    pub fn y(&self) -> f64 {
        self.0.translation.vector.y
    }

    pub fn z(&self) -> f64 {
        self.0.translation.vector.z
    }

    /// True when both rotation and translation are (numerically) identity.
    pub fn is_identity(&self) -> bool {
        self.0.translation.vector.norm() <= IDENTITY_EPSILON
            && self.0.rotation.angle() <= IDENTITY_EPSILON
    }

    pub fn inverse(&self) -> Self {
        Self(self.0.inverse())
    }

    /// `self * other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &RigidTransform) -> Self {
        Self(self.0 * other.0)
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for RigidTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = self.translation();
        let (roll, pitch, yaw) = self.0.rotation.euler_angles();
        write!(
            f,
            "xyz=({:.4}, {:.4}, {:.4}) rpy=({:.4}, {:.4}, {:.4})",
            t.x, t.y, t.z, roll, pitch, yaw
        )
    }
}

/// Source of transforms between named frames.
///
/// `lookup(target, source, stamp)` returns the pose of `source` expressed in
/// `target` at `stamp`, or `None` when it is unavailable. Implementations
/// must return promptly (bounded wait at most) and never block the caller
/// indefinitely. Identity is a valid answer and is distinct from `None`.
pub trait TransformProvider: Send + Sync {
    fn lookup(&self, target: &FrameId, source: &FrameId, stamp: Timestamp)
        -> Option<RigidTransform>;
}

impl<T: TransformProvider + ?Sized> TransformProvider for std::sync::Arc<T> {
    fn lookup(
        &self,
        target: &FrameId,
        source: &FrameId,
        stamp: Timestamp,
    ) -> Option<RigidTransform> {
        (**self).lookup(target, source, stamp)
    }
}
