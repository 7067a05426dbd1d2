//! Exact-time correlation: all four stamps must be bit-identical.

use std::collections::BTreeMap;

use contracts::{CorrelatedTuple, StreamMessage, Timestamp};
use tracing::{instrument, trace};

use crate::strategy::{DiscardReason, SyncStats, Synchronizer};
use crate::tuple::TupleBuilder;

/// Pending tuples keyed by stamp.
///
/// At most `queue_size` distinct stamps are pending; beyond that the oldest
/// key is discarded. Emitting a tuple discards every older key, since an
/// older tuple could no longer be emitted in order.
#[derive(Debug)]
pub struct ExactTimeSync {
    queue_size: usize,
    tuples: BTreeMap<Timestamp, TupleBuilder>,
    last_emitted: Option<Timestamp>,
    stats: SyncStats,
}

impl ExactTimeSync {
    pub fn new(queue_size: usize) -> Self {
        Self {
            queue_size: queue_size.max(1),
            tuples: BTreeMap::new(),
            last_emitted: None,
            stats: SyncStats::default(),
        }
    }

    fn discard_older_than(&mut self, stamp: Timestamp) {
        let newer = self.tuples.split_off(&stamp);
        let expired: usize = self.tuples.values().map(TupleBuilder::filled).sum();
        self.tuples = newer;
        self.stats.record_discard(DiscardReason::Expired, expired as u64);
    }

    fn enforce_bound(&mut self) {
        while self.tuples.len() > self.queue_size {
            if let Some((stamp, oldest)) = self.tuples.pop_first() {
                trace!(%stamp, filled = oldest.filled(), "exact sync queue full, dropping oldest stamp");
                self.stats
                    .record_discard(DiscardReason::Overflow, oldest.filled() as u64);
            }
        }
    }
}

impl Synchronizer for ExactTimeSync {
    #[instrument(
        level = "trace",
        name = "exact_sync_push",
        skip(self, message),
        fields(stamp = %message.stamp(), slot = ?message.slot())
    )]
    fn push(&mut self, message: StreamMessage) -> Option<CorrelatedTuple> {
        self.stats.received += 1;

        if message.slot().is_none() {
            self.stats.record_discard(DiscardReason::Misrouted, 1);
            return None;
        }

        let stamp = message.stamp();
        if self.last_emitted.is_some_and(|last| stamp <= last) {
            self.stats.record_discard(DiscardReason::Stale, 1);
            return None;
        }

        let entry = self.tuples.entry(stamp).or_default();
        if entry.insert(message) {
            // Same stream delivered twice for one stamp; the newer copy wins.
            self.stats.record_discard(DiscardReason::Superseded, 1);
        }

        if entry.is_complete() {
            let builder = self.tuples.remove(&stamp)?;
            self.discard_older_than(stamp);
            self.last_emitted = Some(stamp);
            self.stats.emitted += 1;
            return builder.build();
        }

        self.enforce_bound();
        None
    }

    fn pending(&self) -> usize {
        self.tuples.values().map(TupleBuilder::filled).sum()
    }

    fn stats(&self) -> SyncStats {
        self.stats
    }

    fn label(&self) -> &'static str {
        "exact"
    }
}
