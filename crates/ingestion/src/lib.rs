//! # Ingestion
//!
//! Synthetic stereo input for running the conditioner without cameras.
//!
//! - [`MockStereoRig`] emits the four streams (or composite bundles) on a
//!   timer, with optional stamp jitter, message loss and row padding
//! - [`RigGenerator`] is the same message source without a runtime
//! - Output goes through a bounded async-channel; a full channel either
//!   drops the newest message or blocks, per [`DropPolicy`]
//!
//! ```ignore
//! use ingestion::{MockRigConfig, MockStereoRig};
//!
//! let rig = MockStereoRig::new(MockRigConfig::default())?;
//! let rx = rig.start(None)?;
//! while let Ok(message) = rx.recv().await {
//!     conditioner.on_message(message);
//! }
//! ```

mod config;
mod error;
mod mock;

pub use config::{
    bytes_per_pixel, BackpressureConfig, DropPolicy, IngestionMetrics, MetricsSnapshot,
    MockRigConfig,
};
pub use contracts::StreamMessage;
pub use error::{IngestionError, Result};
pub use mock::{MockStereoRig, RigGenerator};
