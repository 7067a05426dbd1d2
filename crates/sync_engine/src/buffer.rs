//! 单路待匹配消息缓冲区
//!
//! 采用索引分离设计：
//! - HeapRb 按到达顺序存储轻量元数据（时间戳 + slab key）
//! - Slab 存储实际的 StreamMessage
//!
//! 各路消息时间戳单调递增，因此到达顺序即时间戳顺序，环形缓冲区队首
//! 始终是最早的待匹配消息。

use std::fmt;

use contracts::{StreamMessage, Timestamp};
use ringbuf::{traits::*, HeapRb};
use slab::Slab;

#[derive(Debug, Clone, Copy)]
struct MessageMeta {
    stamp: Timestamp,
    slab_key: usize,
}

/// Bounded FIFO of one stream's unmatched messages.
///
/// When full, pushing evicts the oldest message.
pub struct StreamBuffer {
    index: HeapRb<MessageMeta>,
    storage: Slab<StreamMessage>,
    capacity: usize,
    dropped_count: u64,
}

impl fmt::Debug for StreamBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamBuffer")
            .field("len", &self.index.occupied_len())
            .field("capacity", &self.capacity)
            .field("dropped", &self.dropped_count)
            .finish()
    }
}

impl StreamBuffer {
    /// `capacity` is clamped to at least one message.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            index: HeapRb::new(capacity),
            storage: Slab::with_capacity(capacity),
            capacity,
            dropped_count: 0,
        }
    }

    /// Append a message; returns `true` if the oldest one was evicted.
    #[inline]
    pub fn push(&mut self, message: StreamMessage) -> bool {
        let stamp = message.stamp();
        let mut evicted = false;

        if self.index.is_full() {
            if let Some(old) = self.index.try_pop() {
                self.storage.remove(old.slab_key);
            }
            self.dropped_count += 1;
            evicted = true;
        }

        let slab_key = self.storage.insert(message);
        let _ = self.index.try_push(MessageMeta { stamp, slab_key });
        evicted
    }

    #[inline]
    pub fn front_stamp(&self) -> Option<Timestamp> {
        self.index.iter().next().map(|m| m.stamp)
    }

    /// Stamp of the message right behind the front.
    #[inline]
    pub fn second_stamp(&self) -> Option<Timestamp> {
        self.index.iter().nth(1).map(|m| m.stamp)
    }

    #[inline]
    pub fn back_stamp(&self) -> Option<Timestamp> {
        self.index.iter().last().map(|m| m.stamp)
    }

    /// Remove and return the oldest message.
    #[inline]
    pub fn pop_front(&mut self) -> Option<StreamMessage> {
        let meta = self.index.try_pop()?;
        Some(self.storage.remove(meta.slab_key))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.occupied_len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Messages evicted because the buffer was full.
    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }
}
