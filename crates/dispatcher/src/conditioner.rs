//! StereoConditioner - synchronizer and assembler behind one entry point
//!
//! Stream callbacks may run on any thread. Correlation is a critical section
//! guarded by the synchronizer lock; when a tuple results, the assembler lock
//! is taken before the synchronizer lock is released so frames reach the
//! estimator in emission order. Lock order is always synchronizer, then
//! assembler.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use contracts::{
    ConditionerConfig, CorrelatedTuple, Estimator, StreamMessage, StreamSlot, TransformProvider,
};
use geometry::{DiagnosticKind, OneShotDiagnostics, ResolverOptions, StereoResolver};
use sync_engine::{SyncEngine, SyncStats};
use tracing::{info, instrument};

use crate::assembler::{AssemblerOptions, DispatchOutcome, FrameAssembler};
use crate::gate::PauseGate;
use crate::metrics::{AssemblerMetrics, MetricsSnapshot};
use crate::params::enforce_estimator_parameters;
use crate::watchdog::{Heartbeat, InputWatchdog};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct StereoConditioner {
    sync: Mutex<SyncEngine>,
    assembler: Mutex<FrameAssembler>,
    gate: PauseGate,
    heartbeat: Arc<Heartbeat>,
    metrics: Arc<AssemblerMetrics>,
    diagnostics: Arc<OneShotDiagnostics>,
    subscription: String,
}

impl std::fmt::Debug for StereoConditioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StereoConditioner")
            .field("paused", &self.gate.is_paused())
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}

impl StereoConditioner {
    /// Wire a conditioner from configuration.
    ///
    /// Estimator parameters in `config` are normalized in place first
    /// (`Reg/Strategy` is forced to `0`).
    #[instrument(name = "conditioner_new", skip_all)]
    pub fn new(
        config: &mut ConditionerConfig,
        transforms: Arc<dyn TransformProvider>,
        estimator: Box<dyn Estimator>,
    ) -> Self {
        enforce_estimator_parameters(&mut config.estimator);

        info!(strategy = config.sync.strategy.as_str(), "StereoConditioner: sync strategy");
        info!(queue_size = config.sync.queue_size, "StereoConditioner: queue size");
        info!(
            subscribe_composite = config.sync.subscribe_composite,
            "StereoConditioner: composite input"
        );
        info!(keep_color = config.stereo.keep_color, "StereoConditioner: keep color");

        let gate = PauseGate::new(config.gate.start_paused);
        let metrics = Arc::new(AssemblerMetrics::new());
        let resolver = StereoResolver::new(ResolverOptions::from(&config.stereo));
        let diagnostics = Arc::clone(resolver.diagnostics());
        let assembler = FrameAssembler::new(
            AssemblerOptions {
                base_frame_id: config.frames.base_frame_id.as_str().into(),
                keep_color: config.stereo.keep_color,
            },
            resolver,
            transforms,
            estimator,
        )
        .with_gate(gate.clone())
        .with_metrics(Arc::clone(&metrics));

        Self {
            sync: Mutex::new(SyncEngine::from_config(&config.sync)),
            assembler: Mutex::new(assembler),
            gate,
            heartbeat: Arc::new(Heartbeat::new()),
            metrics,
            diagnostics,
            subscription: subscription_summary(config),
        }
    }

    /// Feed one stream message; returns the dispatch outcome when it
    /// completed a tuple.
    pub fn on_message(&self, message: StreamMessage) -> Option<DispatchOutcome> {
        self.on_message_observed(message, |_| {})
    }

    /// Like [`on_message`](Self::on_message), showing the correlated tuple to
    /// `observe` before it is dispatched.
    pub fn on_message_observed(
        &self,
        message: StreamMessage,
        observe: impl FnOnce(&CorrelatedTuple),
    ) -> Option<DispatchOutcome> {
        let mut sync = lock(&self.sync);
        let tuple = sync.push(message)?;
        self.heartbeat.beat();
        observe(&tuple);
        let mut assembler = lock(&self.assembler);
        drop(sync);
        Some(assembler.dispatch(tuple))
    }

    /// Discard every pending message.
    pub fn flush(&self) {
        lock(&self.sync).flush();
    }

    /// Apply a new queue bound; pending state is discarded if it changed.
    pub fn set_queue_size(&self, queue_size: usize) -> bool {
        lock(&self.sync).set_queue_size(queue_size)
    }

    pub fn pause(&self) -> bool {
        self.gate.pause()
    }

    pub fn resume(&self) -> bool {
        self.gate.resume()
    }

    pub fn is_paused(&self) -> bool {
        self.gate.is_paused()
    }

    pub fn gate(&self) -> &PauseGate {
        &self.gate
    }

    pub fn heartbeat(&self) -> &Arc<Heartbeat> {
        &self.heartbeat
    }

    pub fn pending(&self) -> usize {
        lock(&self.sync).pending()
    }

    pub fn sync_stats(&self) -> SyncStats {
        lock(&self.sync).stats()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// One-shot geometry diagnostics reported so far.
    pub fn fired_diagnostics(&self) -> Vec<DiagnosticKind> {
        self.diagnostics.fired()
    }

    /// Human readable list of subscribed streams.
    pub fn subscription(&self) -> &str {
        &self.subscription
    }

    /// Start the input watchdog on the current tokio runtime.
    pub fn spawn_watchdog(&self, warn_after: Duration) -> Option<InputWatchdog> {
        InputWatchdog::spawn(
            Arc::clone(&self.heartbeat),
            warn_after,
            self.subscription.clone(),
        )
    }
}

fn subscription_summary(config: &ConditionerConfig) -> String {
    if config.sync.subscribe_composite {
        return format!("\nsubscribed to:\n   {}", config.subscribed_streams().join(""));
    }
    let streams: Vec<&str> = StreamSlot::ALL.iter().map(|s| s.name()).collect();
    format!(
        "\nsubscribed to ({} sync):\n   {}",
        config.sync.strategy.as_str(),
        streams.join(" \\\n   ")
    )
}
