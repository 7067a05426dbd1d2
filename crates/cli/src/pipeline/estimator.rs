//! Estimator stand-in that logs every conditioned frame.

use contracts::{
    ContractError, Estimator, FrameContext, NormalizedFrame, RigidTransform, Timestamp,
};
use tracing::{debug, info};

/// Logs conditioned frames and reports an identity pose.
#[derive(Debug, Default)]
pub struct LogEstimator {
    frames: u64,
    last_stamp: Option<Timestamp>,
    /// Emit an info line every `report_every` frames; 0 disables it
    report_every: u64,
}

impl LogEstimator {
    pub fn new(report_every: u64) -> Self {
        Self {
            report_every,
            ..Self::default()
        }
    }

    #[allow(dead_code)]
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Estimator for LogEstimator {
    fn process(
        &mut self,
        frame: NormalizedFrame,
        context: &FrameContext,
    ) -> Result<RigidTransform, ContractError> {
        self.frames += 1;
        let dt_ms = self
            .last_stamp
            .map(|last| frame.stamp.abs_diff_secs(last) * 1e3);
        self.last_stamp = Some(frame.stamp);

        debug!(
            sequence = context.sequence,
            stamp = %frame.stamp,
            frame_id = %frame.frame_id,
            width = frame.left.width,
            height = frame.left.height,
            left_format = %frame.left.format,
            baseline = frame.model.baseline,
            fx = frame.model.fx(),
            dt_ms = ?dt_ms,
            "conditioned frame"
        );
        if self.report_every > 0 && self.frames % self.report_every == 0 {
            info!(frames = self.frames, stamp = %frame.stamp, "estimator progress");
        }
        Ok(RigidTransform::identity())
    }
}
