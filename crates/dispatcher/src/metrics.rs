//! 帧组装器指标（进程内统计）

use std::sync::atomic::{AtomicU64, Ordering};

/// 每次分发尝试都会更新的计数器
#[derive(Debug, Default)]
pub struct AssemblerMetrics {
    /// Correlated tuples handed to the assembler
    tuples: AtomicU64,
    /// Frames delivered to the estimator
    dispatched: AtomicU64,
    /// Tuples dropped by the pause gate
    paused: AtomicU64,
    /// Tuples dropped for a frame error
    dropped: AtomicU64,
    /// Estimator calls that returned an error
    estimator_failures: AtomicU64,
    /// Sum of estimator call durations, microseconds
    estimator_micros: AtomicU64,
}

impl AssemblerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_tuples(&self) {
        self.tuples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_paused(&self) {
        self.paused.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_estimator_failures(&self) {
        self.estimator_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_estimator_time(&self, micros: u64) {
        self.estimator_micros.fetch_add(micros, Ordering::Relaxed);
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tuples: self.tuples.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            paused: self.paused.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            estimator_failures: self.estimator_failures.load(Ordering::Relaxed),
            estimator_micros: self.estimator_micros.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of assembler metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub tuples: u64,
    pub dispatched: u64,
    pub paused: u64,
    pub dropped: u64,
    pub estimator_failures: u64,
    pub estimator_micros: u64,
}

impl MetricsSnapshot {
    /// Mean estimator latency in milliseconds, `None` before the first call.
    pub fn mean_estimator_ms(&self) -> Option<f64> {
        let calls = self.dispatched + self.estimator_failures;
        (calls > 0).then(|| self.estimator_micros as f64 / calls as f64 / 1000.0)
    }
}
