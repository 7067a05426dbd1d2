//! # Geometry
//!
//! Stereo geometry for the conditioner:
//! - [`StereoResolver`]: validated [`contracts::StereoModel`] per frame,
//!   with baseline fallback and plausibility checks
//! - [`OneShotDiagnostics`]: process-lifetime warn-once flags
//! - [`StaticTransformTree`]: transform provider over configured edges

mod diagnostics;
mod resolver;
mod transforms;

pub use diagnostics::{DiagnosticKind, OneShotDiagnostics};
pub use resolver::{ResolverOptions, StereoResolver, DEFAULT_MAX_PLAUSIBLE_BASELINE_M};
pub use transforms::StaticTransformTree;
