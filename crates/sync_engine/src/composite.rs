//! Composite stream: messages arrive already paired.

use contracts::{CorrelatedTuple, StreamMessage, Timestamp};
use tracing::trace;

use crate::strategy::{DiscardReason, SyncStats, Synchronizer};

/// Forwards each composite bundle as a tuple, enforcing increasing stamps.
#[derive(Debug, Default)]
pub struct CompositePassThrough {
    last_emitted: Option<Timestamp>,
    stats: SyncStats,
}

impl CompositePassThrough {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Synchronizer for CompositePassThrough {
    fn push(&mut self, message: StreamMessage) -> Option<CorrelatedTuple> {
        self.stats.received += 1;

        let StreamMessage::Composite(bundle) = message else {
            self.stats.record_discard(DiscardReason::Misrouted, 1);
            return None;
        };

        let stamp = bundle.header.stamp;
        if self.last_emitted.is_some_and(|last| stamp <= last) {
            trace!(%stamp, "composite bundle not newer than last emitted, dropping");
            self.stats.record_discard(DiscardReason::Stale, 1);
            return None;
        }

        self.last_emitted = Some(stamp);
        self.stats.emitted += 1;
        Some(CorrelatedTuple::from(*bundle))
    }

    fn pending(&self) -> usize {
        0
    }

    fn stats(&self) -> SyncStats {
        self.stats
    }

    fn label(&self) -> &'static str {
        "composite"
    }
}
