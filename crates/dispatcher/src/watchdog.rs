//! Input watchdog.
//!
//! Every successful correlation beats a [`Heartbeat`]; a background task
//! warns periodically while no tuple has arrived for `warn_after`, naming the
//! subscribed streams so a miswired input is easy to spot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Time of the most recent correlated tuple.
#[derive(Debug)]
pub struct Heartbeat {
    origin: Instant,
    /// Nanoseconds since `origin` of the last beat, plus one; zero = never
    last: AtomicU64,
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new()
    }
}

impl Heartbeat {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn beat(&self) {
        let elapsed = self.origin.elapsed().as_nanos().min(u128::from(u64::MAX - 1)) as u64;
        self.last.store(elapsed + 1, Ordering::Release);
    }

    pub fn has_beaten(&self) -> bool {
        self.last.load(Ordering::Acquire) != 0
    }

    /// Time since the last beat, or since creation if there was none.
    pub fn idle_for(&self) -> Duration {
        let last = self.last.load(Ordering::Acquire);
        let since_origin = self.origin.elapsed();
        if last == 0 {
            return since_origin;
        }
        since_origin.saturating_sub(Duration::from_nanos(last - 1))
    }
}

/// Background task warning about silent inputs.
#[derive(Debug)]
pub struct InputWatchdog {
    handle: JoinHandle<()>,
    warnings: Arc<AtomicU64>,
}

impl InputWatchdog {
    /// Start the watchdog on the current tokio runtime.
    ///
    /// Returns `None` when `warn_after` is zero (disabled).
    pub fn spawn(
        heartbeat: Arc<Heartbeat>,
        warn_after: Duration,
        subscription: String,
    ) -> Option<Self> {
        if warn_after.is_zero() {
            debug!("input watchdog disabled");
            return None;
        }
        let warnings = Arc::new(AtomicU64::new(0));
        let task_warnings = Arc::clone(&warnings);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(warn_after);
            // First tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let idle = heartbeat.idle_for();
                if idle >= warn_after {
                    task_warnings.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        idle_sec = idle.as_secs_f64(),
                        "did not receive data for {:.1} seconds! Make sure the input streams \
                         are published and their stamps are synchronized.{}",
                        idle.as_secs_f64(),
                        subscription
                    );
                }
            }
        });

        Some(Self { handle, warnings })
    }

    /// Warnings emitted so far.
    pub fn warnings(&self) -> u64 {
        self.warnings.load(Ordering::Relaxed)
    }

    pub async fn shutdown(mut self) {
        self.handle.abort();
        let _ = (&mut self.handle).await;
    }
}

impl Drop for InputWatchdog {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_tracks_last_beat() {
        let heartbeat = Heartbeat::new();
        assert!(!heartbeat.has_beaten());
        std::thread::sleep(Duration::from_millis(20));
        assert!(heartbeat.idle_for() >= Duration::from_millis(20));

        heartbeat.beat();
        assert!(heartbeat.has_beaten());
        assert!(heartbeat.idle_for() < Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_disabled_when_zero() {
        let heartbeat = Arc::new(Heartbeat::new());
        assert!(InputWatchdog::spawn(heartbeat, Duration::ZERO, String::new()).is_none());
    }

    #[tokio::test]
    async fn test_warns_while_idle() {
        let heartbeat = Arc::new(Heartbeat::new());
        let watchdog =
            InputWatchdog::spawn(heartbeat, Duration::from_millis(10), String::new()).unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(watchdog.warnings() >= 1);
        watchdog.shutdown().await;
    }

    #[tokio::test]
    async fn test_quiet_while_beating() {
        let heartbeat = Arc::new(Heartbeat::new());
        let watchdog = InputWatchdog::spawn(
            Arc::clone(&heartbeat),
            Duration::from_millis(200),
            String::new(),
        )
        .unwrap();
        for _ in 0..10 {
            heartbeat.beat();
            tokio::time::sleep(Duration::from_millis(30)).await;
        }
        assert_eq!(watchdog.warnings(), 0);
        watchdog.shutdown().await;
    }
}
