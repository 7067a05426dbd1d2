//! 同步策略选择，以及通过重建实现的 flush。

use contracts::{CorrelatedTuple, StreamMessage, SyncConfig, SyncStrategy};
use tracing::{debug, info, instrument};

use crate::approximate::ApproxTimeSync;
use crate::composite::CompositePassThrough;
use crate::exact::ExactTimeSync;
use crate::strategy::{SyncSettings, SyncStats, Synchronizer};

fn build(settings: &SyncSettings) -> Box<dyn Synchronizer> {
    if settings.composite {
        return Box::new(CompositePassThrough::new());
    }
    match settings.strategy {
        SyncStrategy::Exact => Box::new(ExactTimeSync::new(settings.queue_size)),
        SyncStrategy::Approximate => Box::new(ApproxTimeSync::new(
            settings.queue_size,
            settings.max_interval_sec,
        )),
    }
}

/// Owns the active synchronizer.
///
/// Flushing discards the instance and builds a fresh one from the same
/// settings; no partially correlated state survives a flush. Counters of
/// retired instances are folded into [`SyncEngine::stats`].
pub struct SyncEngine {
    settings: SyncSettings,
    inner: Box<dyn Synchronizer>,
    generation: u64,
    retired: SyncStats,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("strategy", &self.inner.label())
            .field("generation", &self.generation)
            .field("pending", &self.inner.pending())
            .finish()
    }
}

impl SyncEngine {
    pub fn new(settings: SyncSettings) -> Self {
        let inner = build(&settings);
        info!(
            strategy = inner.label(),
            queue_size = settings.queue_size,
            max_interval_sec = settings.max_interval_sec,
            "synchronizer created"
        );
        Self {
            settings,
            inner,
            generation: 0,
            retired: SyncStats::default(),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(SyncSettings::from(config))
    }

    /// Feed one stream message.
    #[instrument(
        level = "trace",
        name = "sync_engine_push",
        skip(self, message),
        fields(generation = self.generation)
    )]
    pub fn push(&mut self, message: StreamMessage) -> Option<CorrelatedTuple> {
        metrics::counter!("stereo_sync_received_total").increment(1);
        let tuple = self.inner.push(message)?;
        metrics::counter!("stereo_sync_tuples_total", "strategy" => self.inner.label())
            .increment(1);
        Some(tuple)
    }

    /// Drop every pending message by replacing the synchronizer.
    pub fn flush(&mut self) {
        let discarded = self.inner.pending();
        self.rebuild();
        debug!(discarded, generation = self.generation, "synchronizer flushed");
    }

    /// Change the queue bound; rebuilds only when the value differs.
    pub fn set_queue_size(&mut self, queue_size: usize) -> bool {
        if queue_size == self.settings.queue_size {
            return false;
        }
        info!(
            from = self.settings.queue_size,
            to = queue_size,
            "synchronizer queue size changed"
        );
        self.settings.queue_size = queue_size;
        self.rebuild();
        true
    }

    fn rebuild(&mut self) {
        let previous = std::mem::replace(&mut self.inner, build(&self.settings));
        let old = previous.stats();
        self.retired.received += old.received;
        self.retired.emitted += old.emitted;
        self.retired.overflow += old.overflow;
        self.retired.stale += old.stale;
        self.retired.out_of_window += old.out_of_window;
        self.retired.superseded += old.superseded;
        self.retired.expired += old.expired;
        self.retired.misrouted += old.misrouted;
        self.generation += 1;
    }

    pub fn pending(&self) -> usize {
        self.inner.pending()
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn label(&self) -> &'static str {
        self.inner.label()
    }

    /// Number of rebuilds so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Totals across the active and every retired instance.
    pub fn stats(&self) -> SyncStats {
        let current = self.inner.stats();
        SyncStats {
            received: self.retired.received + current.received,
            emitted: self.retired.emitted + current.emitted,
            overflow: self.retired.overflow + current.overflow,
            stale: self.retired.stale + current.stale,
            out_of_window: self.retired.out_of_window + current.out_of_window,
            superseded: self.retired.superseded + current.superseded,
            expired: self.retired.expired + current.expired,
            misrouted: self.retired.misrouted + current.misrouted,
        }
    }
}
