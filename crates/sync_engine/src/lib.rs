//! # Sync Engine
//!
//! Frame synchronizer for a four-stream stereo rig.
//!
//! Correlates left/right images and left/right calibration descriptors into
//! [`CorrelatedTuple`]s using one of three strategies:
//! - exact: all stamps identical
//! - approximate: stamps within `max_interval_sec`
//! - composite: the source already delivers pre-paired bundles
//!
//! ```ignore
//! use sync_engine::SyncEngine;
//!
//! let mut engine = SyncEngine::from_config(&config.sync);
//! if let Some(tuple) = engine.push(message) {
//!     // hand to the assembler
//! }
//! ```

mod approximate;
mod buffer;
mod composite;
mod engine;
mod exact;
mod strategy;
mod tuple;

#[cfg(test)]
mod testing;

pub use approximate::ApproxTimeSync;
pub use buffer::StreamBuffer;
pub use composite::CompositePassThrough;
pub use engine::SyncEngine;
pub use exact::ExactTimeSync;
pub use strategy::{DiscardReason, SyncSettings, SyncStats, Synchronizer};

pub use contracts::{CorrelatedTuple, StreamMessage, SyncConfig, SyncStrategy};
