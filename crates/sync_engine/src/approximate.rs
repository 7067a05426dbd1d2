//! Approximate-time correlation within a bounded interval.
//!
//! Each stream keeps its own bounded FIFO. Once every stream has a head
//! candidate the earliest (low) and latest (high) head stamps bracket the
//! candidate tuple:
//!
//! - spread above `max_interval`: the low head can never be matched, drop it
//! - otherwise every non-pivot stream is advanced while its next message is
//!   still at or before `high`, then the four heads are emitted

use contracts::{CorrelatedTuple, StreamMessage, StreamSlot, Timestamp};
use tracing::{instrument, trace};

use crate::buffer::StreamBuffer;
use crate::strategy::{DiscardReason, SyncStats, Synchronizer};
use crate::tuple::TupleBuilder;

#[derive(Debug)]
pub struct ApproxTimeSync {
    buffers: [StreamBuffer; 4],
    /// Stamp of the last message consumed into a tuple, per stream
    last_consumed: [Option<Timestamp>; 4],
    max_interval_nanos: u64,
    stats: SyncStats,
}

impl ApproxTimeSync {
    pub fn new(queue_size: usize, max_interval_sec: f64) -> Self {
        Self {
            buffers: std::array::from_fn(|_| StreamBuffer::new(queue_size)),
            last_consumed: [None; 4],
            max_interval_nanos: Timestamp::from_secs_f64(max_interval_sec).as_nanos(),
            stats: SyncStats::default(),
        }
    }

    pub fn max_interval_nanos(&self) -> u64 {
        self.max_interval_nanos
    }

    /// Arrivals must be newer than both the last consumed message and the
    /// newest buffered one, so each buffer stays sorted.
    fn is_stale(&self, index: usize, stamp: Timestamp) -> bool {
        let floor = self.last_consumed[index].max(self.buffers[index].back_stamp());
        floor.is_some_and(|floor| stamp <= floor)
    }

    /// (index, stamp) of the earliest and latest heads, if every stream has one.
    fn watermarks(&self) -> Option<((usize, Timestamp), (usize, Timestamp))> {
        let mut low: Option<(usize, Timestamp)> = None;
        let mut high: Option<(usize, Timestamp)> = None;
        for (index, buffer) in self.buffers.iter().enumerate() {
            let stamp = buffer.front_stamp()?;
            if low.is_none_or(|(_, s)| stamp < s) {
                low = Some((index, stamp));
            }
            if high.is_none_or(|(_, s)| stamp > s) {
                high = Some((index, stamp));
            }
        }
        Some((low?, high?))
    }

    fn try_emit(&mut self) -> Option<CorrelatedTuple> {
        loop {
            let ((low_index, low), (pivot, high)) = self.watermarks()?;

            if high.as_nanos() - low.as_nanos() > self.max_interval_nanos {
                trace!(
                    stream = %StreamSlot::ALL[low_index],
                    %low,
                    %high,
                    "head outside interval, discarding"
                );
                self.buffers[low_index].pop_front();
                self.stats.record_discard(DiscardReason::OutOfWindow, 1);
                continue;
            }

            for index in 0..self.buffers.len() {
                if index == pivot {
                    continue;
                }
                while self.buffers[index]
                    .second_stamp()
                    .is_some_and(|next| next <= high)
                {
                    self.buffers[index].pop_front();
                    self.stats.record_discard(DiscardReason::Superseded, 1);
                }
            }

            let mut builder = TupleBuilder::default();
            for (index, buffer) in self.buffers.iter_mut().enumerate() {
                let message = buffer.pop_front()?;
                self.last_consumed[index] = Some(message.stamp());
                builder.insert(message);
            }
            self.stats.emitted += 1;
            return builder.build();
        }
    }
}

impl Synchronizer for ApproxTimeSync {
    #[instrument(
        level = "trace",
        name = "approx_sync_push",
        skip(self, message),
        fields(stamp = %message.stamp(), slot = ?message.slot())
    )]
    fn push(&mut self, message: StreamMessage) -> Option<CorrelatedTuple> {
        self.stats.received += 1;

        let Some(slot) = message.slot() else {
            self.stats.record_discard(DiscardReason::Misrouted, 1);
            return None;
        };
        let index = slot.index();

        if self.is_stale(index, message.stamp()) {
            self.stats.record_discard(DiscardReason::Stale, 1);
            return None;
        }

        if self.buffers[index].push(message) {
            self.stats.record_discard(DiscardReason::Overflow, 1);
        }

        self.try_emit()
    }

    fn pending(&self) -> usize {
        self.buffers.iter().map(StreamBuffer::len).sum()
    }

    fn stats(&self) -> SyncStats {
        self.stats
    }

    fn label(&self) -> &'static str {
        "approx"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{composite, left_image, left_info, quad, right_image, right_info};

    const MS: u64 = 1_000_000;

    #[test]
    fn test_messages_within_interval_form_one_tuple() {
        let mut sync = ApproxTimeSync::new(5, 0.05);
        assert!(sync.push(left_image(100 * MS)).is_none());
        assert!(sync.push(right_image(110 * MS)).is_none());
        assert!(sync.push(left_info(105 * MS)).is_none());
        let tuple = sync.push(right_info(120 * MS)).expect("tuple");

        assert_eq!(tuple.stamp(), Timestamp::from_nanos(120 * MS));
        assert_eq!(tuple.image_stamp(), Timestamp::from_nanos(110 * MS));
        assert_eq!(sync.pending(), 0);
        assert_eq!(sync.stats().emitted, 1);
    }

    #[test]
    fn test_out_of_window_head_discarded() {
        let mut sync = ApproxTimeSync::new(5, 0.01);
        sync.push(left_image(0));
        sync.push(right_image(50 * MS));
        sync.push(left_info(50 * MS));
        let tuple = sync.push(right_info(50 * MS));

        // Left image is 50 ms off and has nothing newer buffered.
        assert!(tuple.is_none());
        assert_eq!(sync.stats().out_of_window, 1);
        assert_eq!(sync.pending(), 3);

        let tuple = sync.push(left_image(52 * MS)).expect("tuple");
        assert_eq!(tuple.left_image.header.stamp, Timestamp::from_nanos(52 * MS));
    }

    #[test]
    fn test_tightening_prefers_closest_message() {
        let mut sync = ApproxTimeSync::new(5, 0.05);
        sync.push(left_image(100 * MS));
        sync.push(left_image(110 * MS));
        sync.push(left_image(118 * MS));
        sync.push(right_image(120 * MS));
        sync.push(left_info(120 * MS));
        let tuple = sync.push(right_info(120 * MS)).expect("tuple");

        assert_eq!(tuple.left_image.header.stamp, Timestamp::from_nanos(118 * MS));
        assert_eq!(sync.stats().superseded, 2);
    }

    #[test]
    fn test_stale_arrivals_discarded() {
        let mut sync = ApproxTimeSync::new(5, 0.05);
        for message in quad(100 * MS) {
            sync.push(message);
        }
        assert!(sync.push(left_image(90 * MS)).is_none());
        assert!(sync.push(left_image(100 * MS)).is_none());
        assert_eq!(sync.stats().stale, 2);
        assert_eq!(sync.pending(), 0);
    }

    #[test]
    fn test_emitted_stamps_strictly_increase() {
        let mut sync = ApproxTimeSync::new(5, 0.02);
        let mut stamps = Vec::new();
        for round in 0..10u64 {
            let base = round * 33 * MS;
            let arrivals = [
                left_image(base),
                right_image(base + MS),
                left_info(base + 2 * MS),
                right_info(base + 3 * MS),
            ];
            for message in arrivals {
                if let Some(tuple) = sync.push(message) {
                    stamps.push(tuple.stamp());
                }
            }
        }
        assert_eq!(stamps.len(), 10);
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_queue_bound_and_composite_rejected() {
        let mut sync = ApproxTimeSync::new(2, 0.05);
        sync.push(left_image(1));
        sync.push(left_image(2));
        sync.push(left_image(3));
        assert_eq!(sync.pending(), 2);
        assert_eq!(sync.stats().overflow, 1);

        assert!(sync.push(composite(4)).is_none());
        assert_eq!(sync.stats().misrouted, 1);
    }
}
