//! Closure-backed estimator.

use std::fmt;

use contracts::{ContractError, Estimator, FrameContext, NormalizedFrame, RigidTransform};

/// Adapts any `FnMut(NormalizedFrame, &FrameContext) -> Result<..>` into an
/// [`Estimator`].
pub struct FnEstimator<F>(F);

impl<F> FnEstimator<F>
where
    F: FnMut(NormalizedFrame, &FrameContext) -> Result<RigidTransform, ContractError> + Send,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> fmt::Debug for FnEstimator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnEstimator")
    }
}

impl<F> Estimator for FnEstimator<F>
where
    F: FnMut(NormalizedFrame, &FrameContext) -> Result<RigidTransform, ContractError> + Send,
{
    fn process(
        &mut self,
        frame: NormalizedFrame,
        context: &FrameContext,
    ) -> Result<RigidTransform, ContractError> {
        (self.0)(frame, context)
    }
}
