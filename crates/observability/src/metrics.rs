//! 调理器指标收集
//!
//! 提供 Prometheus 导出的门面辅助函数，以及用于运行结束汇总的内存聚合器。

use std::collections::BTreeMap;

use contracts::CorrelatedTuple;
use metrics::{counter, gauge, histogram};

/// Record one raw stream message.
pub fn record_message_received(stream: &'static str) {
    counter!("stereo_messages_received_total", "stream" => stream).increment(1);
}

/// Record a correlated tuple and the stamp spread of its members.
pub fn record_tuple(tuple: &CorrelatedTuple) {
    counter!("stereo_tuples_total").increment(1);
    histogram!("stereo_tuple_spread_ms").record(tuple_spread_ms(tuple));
}

/// Record the outcome of one dispatch attempt (`dispatched`, `paused`, ...).
pub fn record_dispatch_outcome(outcome: &'static str) {
    counter!("stereo_dispatch_outcomes_total", "outcome" => outcome).increment(1);
}

/// Record time spent inside the conditioner for one message.
pub fn record_processing_ms(ms: f64) {
    histogram!("stereo_processing_ms").record(ms);
}

/// Record messages waiting in the synchronizer.
pub fn record_pending(depth: usize) {
    gauge!("stereo_sync_pending").set(depth as f64);
}

/// Largest stamp difference inside a tuple, milliseconds.
pub fn tuple_spread_ms(tuple: &CorrelatedTuple) -> f64 {
    let stamps = [
        tuple.left_image.header.stamp,
        tuple.right_image.header.stamp,
        tuple.left_info.header.stamp,
        tuple.right_info.header.stamp,
    ];
    let min = stamps.iter().min().map_or(0, |s| s.as_nanos());
    let max = stamps.iter().max().map_or(0, |s| s.as_nanos());
    (max - min) as f64 / 1e6
}

/// Conditioner metrics aggregator
///
/// Aggregates in memory for summaries printed at the end of a run.
#[derive(Debug, Clone, Default)]
pub struct ConditionerMetricsAggregator {
    pub total_tuples: u64,
    pub dispatched: u64,
    pub paused: u64,
    pub dropped: u64,
    pub estimator_failures: u64,

    /// Stamp spread inside tuples (ms)
    pub spread_stats: RunningStats,

    /// Time spent per completed tuple (ms)
    pub processing_stats: RunningStats,

    /// Dropped frames by reason
    pub drop_reasons: BTreeMap<String, u64>,
}

impl ConditionerMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_tuple(&mut self, tuple: &CorrelatedTuple) {
        self.total_tuples += 1;
        self.spread_stats.push(tuple_spread_ms(tuple));
    }

    pub fn observe_dispatched(&mut self, processing_ms: f64) {
        self.dispatched += 1;
        self.processing_stats.push(processing_ms);
    }

    pub fn observe_paused(&mut self) {
        self.paused += 1;
    }

    pub fn observe_dropped(&mut self, reason: &str) {
        self.dropped += 1;
        *self.drop_reasons.entry(reason.to_string()).or_insert(0) += 1;
    }

    pub fn observe_estimator_failure(&mut self) {
        self.estimator_failures += 1;
    }

    pub fn summary(&self) -> MetricsSummary {
        let rate = |n: u64| {
            if self.total_tuples > 0 {
                n as f64 / self.total_tuples as f64 * 100.0
            } else {
                0.0
            }
        };
        MetricsSummary {
            total_tuples: self.total_tuples,
            dispatched: self.dispatched,
            paused: self.paused,
            dropped: self.dropped,
            estimator_failures: self.estimator_failures,
            dispatch_rate: rate(self.dispatched),
            drop_rate: rate(self.dropped),
            spread_ms: StatsSummary::from(&self.spread_stats),
            processing_ms: StatsSummary::from(&self.processing_stats),
            drop_reasons: self.drop_reasons.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_tuples: u64,
    pub dispatched: u64,
    pub paused: u64,
    pub dropped: u64,
    pub estimator_failures: u64,
    pub dispatch_rate: f64,
    pub drop_rate: f64,
    pub spread_ms: StatsSummary,
    pub processing_ms: StatsSummary,
    pub drop_reasons: BTreeMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Stereo Conditioner Summary ===")?;
        writeln!(f, "Correlated tuples: {}", self.total_tuples)?;
        writeln!(
            f,
            "Dispatched frames: {} ({:.2}%)",
            self.dispatched, self.dispatch_rate
        )?;
        writeln!(f, "Dropped frames: {} ({:.2}%)", self.dropped, self.drop_rate)?;
        writeln!(f, "Paused frames: {}", self.paused)?;
        writeln!(f, "Estimator failures: {}", self.estimator_failures)?;
        writeln!(f, "Tuple spread (ms): {}", self.spread_ms)?;
        writeln!(f, "Processing (ms): {}", self.processing_ms)?;

        if !self.drop_reasons.is_empty() {
            writeln!(f, "Drop reasons:")?;
            for (reason, count) in &self.drop_reasons {
                writeln!(f, "  {}: {}", reason, count)?;
            }
        }

        Ok(())
    }
}

/// Summary of a [`RunningStats`]
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean/variance (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
