//! Pipeline orchestration module.

mod estimator;
mod orchestrator;
mod stats;

pub use estimator::LogEstimator;
pub use orchestrator::{rig_for, Pipeline, PipelineConfig};
pub use stats::PipelineStats;
