//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the conditioner:
//! stream messages, camera and transform types, the conditioned frame handed
//! to the estimator, the error taxonomy and the configuration model.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Capture stamps are integer nanoseconds (`Timestamp`); exact correlation
//!   compares them bit for bit
//! - Frame names travel as `FrameId` (`Arc<str>`)

mod config;
mod error;
mod frame_id;
mod message;
mod stereo;
mod time;
mod transform;

pub use config::*;
pub use error::*;
pub use frame_id::FrameId;
pub use message::*;
pub use stereo::*;
pub use time::*;
pub use transform::{RigidTransform, TransformProvider};
