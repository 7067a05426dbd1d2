//! Static transform tree.
//!
//! A [`TransformProvider`] over a fixed set of `parent -> child` edges, used
//! when the rig's mounting offsets come from configuration rather than from
//! a live transform service. Stamps are ignored.

use std::collections::HashMap;

use contracts::{
    ContractError, FrameId, RigidTransform, StaticTransformConfig, Timestamp, TransformProvider,
};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct StaticTransformTree {
    /// child -> (parent, pose of child in parent)
    edges: HashMap<FrameId, (FrameId, RigidTransform)>,
}

impl StaticTransformTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from configured edges.
    ///
    /// # Errors
    /// Rejects self-edges and frames with more than one parent.
    pub fn from_config(edges: &[StaticTransformConfig]) -> Result<Self, ContractError> {
        let mut tree = Self::new();
        for edge in edges {
            tree.insert(
                edge.parent.as_str(),
                edge.child.as_str(),
                edge.to_rigid_transform(),
            )?;
        }
        debug!(edges = tree.len(), "static transform tree built");
        Ok(tree)
    }

    /// Add `parent -> child`, where `transform` is the child's pose in the parent.
    pub fn insert(
        &mut self,
        parent: impl Into<FrameId>,
        child: impl Into<FrameId>,
        transform: RigidTransform,
    ) -> Result<(), ContractError> {
        let parent = parent.into();
        let child = child.into();
        if parent == child {
            return Err(ContractError::config_validation(
                "transforms",
                format!("frame '{child}' cannot be its own parent"),
            ));
        }
        if let Some((existing, _)) = self.edges.get(&child) {
            return Err(ContractError::config_validation(
                "transforms",
                format!("frame '{child}' already has parent '{existing}'"),
            ));
        }
        self.edges.insert(child, (parent, transform));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    fn is_known(&self, frame: &FrameId) -> bool {
        self.edges.contains_key(frame) || self.edges.values().any(|(parent, _)| parent == frame)
    }

    /// Root of `frame` and the pose of `frame` in that root.
    fn to_root(&self, frame: &FrameId) -> Option<(FrameId, RigidTransform)> {
        let mut current = frame.clone();
        let mut pose = RigidTransform::identity();
        // A well-formed tree never has a chain longer than its edge count.
        for _ in 0..=self.edges.len() {
            match self.edges.get(&current) {
                Some((parent, edge)) => {
                    pose = edge.compose(&pose);
                    current = parent.clone();
                }
                None => return Some((current, pose)),
            }
        }
        None
    }
}

impl TransformProvider for StaticTransformTree {
    fn lookup(
        &self,
        target: &FrameId,
        source: &FrameId,
        _stamp: Timestamp,
    ) -> Option<RigidTransform> {
        if target == source {
            return Some(RigidTransform::identity());
        }
        if !self.is_known(target) || !self.is_known(source) {
            return None;
        }
        let (target_root, root_from_target) = self.to_root(target)?;
        let (source_root, root_from_source) = self.to_root(source)?;
        if target_root != source_root {
            return None;
        }
        Some(root_from_target.inverse().compose(&root_from_source))
    }
}
