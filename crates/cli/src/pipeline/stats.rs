//! 流水线统计信息

use std::time::Duration;

use dispatcher::MetricsSnapshot;
use geometry::DiagnosticKind;
use observability::ConditionerMetricsAggregator;
use sync_engine::SyncStats;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Stream messages read from the rig
    pub messages_received: u64,

    pub duration: Duration,

    /// Synchronizer counters, including discards by reason
    pub sync: SyncStats,

    /// Assembler counters
    pub assembler: MetricsSnapshot,

    /// Rig counters
    pub ingestion: ingestion::MetricsSnapshot,

    /// Silent-input warnings raised by the watchdog
    pub watchdog_warnings: u64,

    /// One-shot geometry diagnostics raised during the run
    pub diagnostics: Vec<DiagnosticKind>,

    pub metrics: ConditionerMetricsAggregator,
}

impl PipelineStats {
    /// Dispatched frames per second
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.metrics.dispatched as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of received messages the synchronizer discarded, percent
    pub fn discard_rate(&self) -> f64 {
        if self.sync.received > 0 {
            self.sync.discarded() as f64 / self.sync.received as f64 * 100.0
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        println!("\n=== Pipeline Statistics ===\n");

        println!("Overview");
        println!("   Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   Messages received: {}", self.messages_received);
        println!("   Frames dispatched: {}", self.metrics.dispatched);
        println!("   FPS: {:.2}", self.fps());
        println!("   Watchdog warnings: {}", self.watchdog_warnings);

        println!("\nStereo Rig");
        println!("   Capture instants: {}", self.ingestion.frames_generated);
        println!("   Messages sent: {}", self.ingestion.messages_sent);
        println!("   Messages lost: {}", self.ingestion.messages_lost);
        println!("   Dropped (channel full): {}", self.ingestion.messages_dropped);

        println!("\nSynchronizer");
        println!("   Received: {}", self.sync.received);
        println!("   Tuples emitted: {}", self.sync.emitted);
        println!(
            "   Discarded: {} ({:.2}%)",
            self.sync.discarded(),
            self.discard_rate()
        );
        println!("      overflow: {}", self.sync.overflow);
        println!("      stale: {}", self.sync.stale);
        println!("      out of window: {}", self.sync.out_of_window);
        println!("      superseded: {}", self.sync.superseded);
        println!("      expired: {}", self.sync.expired);
        println!("      misrouted: {}", self.sync.misrouted);

        if !self.diagnostics.is_empty() {
            let names: Vec<&str> = self.diagnostics.iter().map(|d| d.as_str()).collect();
            println!("\nGeometry diagnostics: {}", names.join(", "));
        }

        if let Some(ms) = self.assembler.mean_estimator_ms() {
            println!("\nEstimator");
            println!("   Mean latency: {:.3} ms", ms);
        }

        println!("\n{}", self.metrics.summary());
    }
}
