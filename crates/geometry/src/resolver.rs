//! Stereo Geometry Resolver.
//!
//! Turns the two per-frame camera descriptors plus the body offset into a
//! validated [`StereoModel`]. Nothing is cached between frames; the only
//! state carried across calls is the set of one-shot diagnostic flags.

use std::sync::Arc;

use contracts::{
    CameraDescriptor, FrameError, RigidTransform, StereoConfig, StereoModel, TransformProvider,
};
use tracing::{error, instrument, warn};

use crate::diagnostics::{DiagnosticKind, OneShotDiagnostics};

/// Default plausibility bound for the baseline, meters.
pub const DEFAULT_MAX_PLAUSIBLE_BASELINE_M: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverOptions {
    pub already_rectified: bool,
    pub max_plausible_baseline_m: f64,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            already_rectified: true,
            max_plausible_baseline_m: DEFAULT_MAX_PLAUSIBLE_BASELINE_M,
        }
    }
}

impl From<&StereoConfig> for ResolverOptions {
    fn from(config: &StereoConfig) -> Self {
        Self {
            already_rectified: config.images_already_rectified,
            max_plausible_baseline_m: config.max_plausible_baseline_m,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StereoResolver {
    options: ResolverOptions,
    diagnostics: Arc<OneShotDiagnostics>,
}

impl StereoResolver {
    pub fn new(options: ResolverOptions) -> Self {
        Self::with_diagnostics(options, Arc::new(OneShotDiagnostics::new()))
    }

    /// Share one set of flags between several resolvers.
    pub fn with_diagnostics(options: ResolverOptions, diagnostics: Arc<OneShotDiagnostics>) -> Self {
        Self {
            options,
            diagnostics,
        }
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    pub fn diagnostics(&self) -> &Arc<OneShotDiagnostics> {
        &self.diagnostics
    }

    /// Derive the stereo model for one frame.
    ///
    /// Rig lookups use the left descriptor's stamp.
    ///
    /// # Errors
    /// - `MissingCalibrationTransform` / `DegenerateCalibrationTransform` for
    ///   non-rectified input without a usable right -> left transform
    /// - `InvalidBaseline` for rectified input whose baseline is not positive
    #[instrument(
        level = "debug",
        name = "stereo_resolve",
        skip_all,
        fields(left = %left.header.frame_id, right = %right.header.frame_id, stamp = %left.header.stamp)
    )]
    pub fn resolve(
        &self,
        left: &CameraDescriptor,
        right: &CameraDescriptor,
        local_transform: RigidTransform,
        provider: &dyn TransformProvider,
    ) -> Result<StereoModel, FrameError> {
        let rectified = self.options.already_rectified;
        let left_frame = &left.header.frame_id;
        let right_frame = &right.header.frame_id;
        let stamp = left.header.stamp;

        let stereo_transform = if rectified {
            None
        } else {
            let rig = provider.lookup(right_frame, left_frame, stamp).ok_or_else(|| {
                FrameError::MissingCalibrationTransform {
                    target: right_frame.clone(),
                    source_frame: left_frame.clone(),
                }
            })?;
            if rig.is_identity() {
                return Err(FrameError::DegenerateCalibrationTransform {
                    target: right_frame.clone(),
                    source_frame: left_frame.clone(),
                });
            }
            Some(rig)
        };

        let mut model = StereoModel::new(
            left.clone(),
            right.baseline(),
            local_transform,
            stereo_transform,
        );

        // Only an exactly-zero baseline means "offset row missing"; small
        // values are taken at face value.
        if model.baseline == 0.0 && rectified {
            if let Some(rig) = provider.lookup(left_frame, right_frame, stamp) {
                if rig.x() > 0.0 {
                    if self.diagnostics.fire(DiagnosticKind::FallbackBaseline) {
                        warn!(
                            left = %left_frame,
                            right = %right_frame,
                            baseline = rig.x(),
                            "right camera descriptor has no baseline (Tx = 0); using the \
                             left -> right transform instead. This message is shown once."
                        );
                    }
                    metrics::counter!("stereo_fallback_baseline_total").increment(1);
                    model = model.with_baseline(rig.x());
                }
            }
        }

        // NaN from a non-finite Tx or fx fails this check too.
        if rectified && !(model.baseline.is_finite() && model.baseline > 0.0) {
            if self.diagnostics.fire(DiagnosticKind::DegenerateBaseline) {
                error!(
                    baseline = model.baseline,
                    fx = right.fx,
                    tx = right.tx,
                    right = %right_frame,
                    "invalid stereo baseline; the images are flagged as rectified so the \
                     right descriptor must carry Tx = -fx * baseline with baseline > 0 \
                     (left camera on the left). Check the camera calibration."
                );
            } else {
                error!(baseline = model.baseline, "invalid stereo baseline");
            }
            return Err(FrameError::InvalidBaseline {
                baseline: model.baseline,
            });
        }

        if model.baseline > self.options.max_plausible_baseline_m
            && self.diagnostics.fire(DiagnosticKind::LargeBaseline)
        {
            warn!(
                baseline = model.baseline,
                limit = self.options.max_plausible_baseline_m,
                "stereo baseline is unusually large; check the calibration units and sign. \
                 This message is shown once."
            );
        }

        Ok(model)
    }
}
