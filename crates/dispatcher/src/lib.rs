//! # Dispatcher
//!
//! Frame assembly and dispatch for the stereo conditioner.
//!
//! Responsibilities:
//! - Normalize image encodings to `mono8` / `bgr8`
//! - Build the `NormalizedFrame` (geometry, body offset, stamp)
//! - Gate, then hand frames to the estimator synchronously
//! - Serialize stream callbacks against synchronizer state
//! - Warn when inputs go silent

pub mod assembler;
pub mod conditioner;
pub mod encoding;
pub mod estimator;
pub mod gate;
pub mod metrics;
pub mod params;
pub mod watchdog;

pub use assembler::{AssemblerOptions, DispatchOutcome, FrameAssembler};
pub use conditioner::StereoConditioner;
pub use encoding::{normalize, normalize_as, PixelEncoding};
pub use estimator::FnEstimator;
pub use gate::PauseGate;
pub use metrics::{AssemblerMetrics, MetricsSnapshot};
pub use params::enforce_estimator_parameters;
pub use watchdog::{Heartbeat, InputWatchdog};
