//! Correlation strategy abstraction.

use contracts::{CorrelatedTuple, StreamMessage, SyncStrategy};

/// Why a buffered or arriving message was discarded without being matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Per-stream queue bound exceeded
    Overflow,
    /// At or before a stamp that was already emitted / seen on the stream
    Stale,
    /// Could never fit in a tuple within the configured interval
    OutOfWindow,
    /// Superseded by a closer message on the same stream
    Superseded,
    /// Older than an emitted tuple (exact strategy cleanup)
    Expired,
    /// Delivered on a stream this strategy does not consume
    Misrouted,
}

impl DiscardReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            DiscardReason::Overflow => "overflow",
            DiscardReason::Stale => "stale",
            DiscardReason::OutOfWindow => "out_of_window",
            DiscardReason::Superseded => "superseded",
            DiscardReason::Expired => "expired",
            DiscardReason::Misrouted => "misrouted",
        }
    }
}

/// Counters kept by every strategy instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub received: u64,
    pub emitted: u64,
    pub overflow: u64,
    pub stale: u64,
    pub out_of_window: u64,
    pub superseded: u64,
    pub expired: u64,
    pub misrouted: u64,
}

impl SyncStats {
    pub(crate) fn record_discard(&mut self, reason: DiscardReason, count: u64) {
        if count == 0 {
            return;
        }
        match reason {
            DiscardReason::Overflow => self.overflow += count,
            DiscardReason::Stale => self.stale += count,
            DiscardReason::OutOfWindow => self.out_of_window += count,
            DiscardReason::Superseded => self.superseded += count,
            DiscardReason::Expired => self.expired += count,
            DiscardReason::Misrouted => self.misrouted += count,
        }
        metrics::counter!("stereo_sync_discarded_total", "reason" => reason.as_str())
            .increment(count);
    }

    pub fn discarded(&self) -> u64 {
        self.overflow + self.stale + self.out_of_window + self.superseded + self.expired
            + self.misrouted
    }
}

/// One way of turning independently arriving messages into tuples.
///
/// Implementations own all their pending state; the engine never resets
/// them in place, it constructs a fresh instance instead.
pub trait Synchronizer: Send {
    /// Feed one message; returns a tuple when this arrival completes one.
    fn push(&mut self, message: StreamMessage) -> Option<CorrelatedTuple>;

    /// Number of messages currently buffered.
    fn pending(&self) -> usize;

    fn stats(&self) -> SyncStats;

    /// Strategy label for logs (`exact`, `approx`, `composite`).
    fn label(&self) -> &'static str;
}

/// Which synchronizer to build.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncSettings {
    pub strategy: SyncStrategy,
    pub queue_size: usize,
    pub max_interval_sec: f64,
    pub composite: bool,
}

impl From<&contracts::SyncConfig> for SyncSettings {
    fn from(config: &contracts::SyncConfig) -> Self {
        Self {
            strategy: config.strategy,
            queue_size: config.queue_size,
            max_interval_sec: config.max_interval_sec,
            composite: config.subscribe_composite,
        }
    }
}
