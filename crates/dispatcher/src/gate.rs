//! Pause gate toggled from outside the frame path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

/// Shared pause flag. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct PauseGate {
    paused: Arc<AtomicBool>,
}

impl PauseGate {
    pub fn new(start_paused: bool) -> Self {
        Self {
            paused: Arc::new(AtomicBool::new(start_paused)),
        }
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Returns `true` if the gate was running.
    pub fn pause(&self) -> bool {
        let was_paused = self.paused.swap(true, Ordering::AcqRel);
        if !was_paused {
            info!("conditioner paused");
        }
        !was_paused
    }

    /// Returns `true` if the gate was paused.
    pub fn resume(&self) -> bool {
        let was_paused = self.paused.swap(false, Ordering::AcqRel);
        if was_paused {
            info!("conditioner resumed");
        }
        was_paused
    }
}
