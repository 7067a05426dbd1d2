//! Mock stereo rig
//!
//! Synthesizes the four stereo streams (or the composite bundle stream) so
//! the conditioner can run without cameras. Each stream is monotonic in
//! stamp; the order in which streams of one instant are delivered is random.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_channel::{bounded, Receiver, TrySendError};
use bytes::Bytes;
use contracts::{
    CameraDescriptor, Header, ImageMessage, StereoBundle, StreamMessage, Timestamp,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use crate::config::{
    bytes_per_pixel, BackpressureConfig, DropPolicy, IngestionMetrics, MockRigConfig,
};
use crate::error::{IngestionError, Result};

/// Deterministic message generator behind [`MockStereoRig`].
///
/// Usable without a runtime; tests drive it tick by tick.
#[derive(Debug)]
pub struct RigGenerator {
    config: MockRigConfig,
    rng: StdRng,
    start: Timestamp,
    sequence: u64,
    /// Last stamp handed out per stream slot
    last: [Option<Timestamp>; 4],
}

impl RigGenerator {
    pub fn new(config: MockRigConfig, start: Timestamp) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            start,
            sequence: 0,
            last: [None; 4],
        })
    }

    pub fn config(&self) -> &MockRigConfig {
        &self.config
    }

    /// Capture instants produced so far.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn is_exhausted(&self) -> bool {
        self.config
            .max_frames
            .is_some_and(|max| self.sequence >= max)
    }

    /// Nominal stamp of capture instant `sequence`.
    pub fn nominal_stamp(&self, sequence: u64) -> Timestamp {
        Timestamp::from_nanos(self.start.as_nanos() + sequence * self.config.period_nanos())
    }

    /// Messages of the next capture instant, already shuffled into delivery
    /// order, with lost messages removed. `None` once `max_frames` is reached.
    pub fn next_tick(&mut self) -> Option<Vec<StreamMessage>> {
        if self.is_exhausted() {
            return None;
        }
        let sequence = self.sequence;
        self.sequence += 1;
        let base = self.nominal_stamp(sequence);

        if self.config.composite {
            if self.lost() {
                return Some(Vec::new());
            }
            let bundle = self.bundle(sequence, base);
            return Some(vec![StreamMessage::Composite(Box::new(bundle))]);
        }

        let stamps: [Timestamp; 4] = std::array::from_fn(|slot| self.jittered(slot, base));
        let left = self.config.left_frame_id.clone();
        let right = self.config.right_frame_id.clone();
        let mut messages = vec![
            StreamMessage::LeftImage(self.image(sequence, 0, Header::new(stamps[0], left.as_str()))),
            StreamMessage::RightImage(self.image(
                sequence,
                self.disparity(),
                Header::new(stamps[1], right.as_str()),
            )),
            StreamMessage::LeftInfo(self.descriptor(Header::new(stamps[2], left.as_str()), 0.0)),
            StreamMessage::RightInfo(self.descriptor(
                Header::new(stamps[3], right.as_str()),
                -self.config.focal_px * self.config.baseline_m,
            )),
        ];
        let loss = self.config.loss_probability;
        if loss > 0.0 {
            messages.retain(|_| !self.rng.random_bool(loss));
        }
        messages.shuffle(&mut self.rng);
        Some(messages)
    }

    fn lost(&mut self) -> bool {
        let loss = self.config.loss_probability;
        loss > 0.0 && self.rng.random_bool(loss)
    }

    /// Nominal stamp plus per-stream jitter, kept strictly increasing.
    fn jittered(&mut self, slot: usize, base: Timestamp) -> Timestamp {
        let max_jitter = (self.config.jitter_sec * 1e9) as u64;
        let offset = if max_jitter == 0 {
            0
        } else {
            self.rng.random_range(0..=max_jitter)
        };
        let mut stamp = base.as_nanos() + offset;
        if let Some(last) = self.last[slot] {
            stamp = stamp.max(last.as_nanos() + 1);
        }
        let stamp = Timestamp::from_nanos(stamp);
        self.last[slot] = Some(stamp);
        stamp
    }

    fn disparity(&self) -> u32 {
        // A scene two meters away.
        (self.config.focal_px * self.config.baseline_m / 2.0)
            .round()
            .clamp(0.0, f64::from(u32::MAX)) as u32
    }

    fn bundle(&self, sequence: u64, stamp: Timestamp) -> StereoBundle {
        let left = self.config.left_frame_id.as_str();
        let right = self.config.right_frame_id.as_str();
        StereoBundle {
            header: Header::new(stamp, self.config.bundle_frame_id.as_str()),
            left_image: self.image(sequence, 0, Header::new(stamp, left)),
            right_image: self.image(sequence, self.disparity(), Header::new(stamp, right)),
            left_info: self.descriptor(Header::new(stamp, left), 0.0),
            right_info: self.descriptor(
                Header::new(stamp, right),
                -self.config.focal_px * self.config.baseline_m,
            ),
        }
    }

    fn descriptor(&self, header: Header, tx: f64) -> CameraDescriptor {
        let f = self.config.focal_px;
        let cx = f64::from(self.config.width) / 2.0;
        let cy = f64::from(self.config.height) / 2.0;
        let p = [
            f, 0.0, cx, tx, //
            0.0, f, cy, 0.0, //
            0.0, 0.0, 1.0, 0.0,
        ];
        CameraDescriptor::from_projection(header, self.config.width, self.config.height, &p)
    }

    /// Diagonal gradient that drifts with `sequence` and shifts by `shift`
    /// columns between the two cameras.
    fn image(&self, sequence: u64, shift: u32, header: Header) -> ImageMessage {
        let c = &self.config;
        // Validated in `new`.
        let bpp = bytes_per_pixel(&c.encoding).unwrap_or(1) as usize;
        let row = c.width as usize * bpp;
        let step = row + c.row_padding as usize;
        let mut data = vec![0u8; step * c.height as usize];

        for y in 0..c.height as usize {
            let line = &mut data[y * step..y * step + row];
            for (x, px) in line.chunks_exact_mut(bpp).enumerate() {
                let v = ((x as u64 + y as u64 + u64::from(shift) + sequence * 3) % 256) as u8;
                match c.encoding.as_str() {
                    "mono16" => px.copy_from_slice(&(u16::from(v) * 257).to_le_bytes()),
                    "bgr8" | "rgb8" => px.copy_from_slice(&[v, v / 2, 255 - v]),
                    "bgra8" | "rgba8" => px.copy_from_slice(&[v, v / 2, 255 - v, 255]),
                    _ => px[0] = v,
                }
            }
        }

        ImageMessage {
            header,
            width: c.width,
            height: c.height,
            encoding: c.encoding.clone(),
            is_bigendian: false,
            step: step as u32,
            data: Bytes::from(data),
        }
    }
}

/// Timer-driven source of synthetic stereo messages.
pub struct MockStereoRig {
    config: MockRigConfig,
    backpressure: BackpressureConfig,
    running: Arc<AtomicBool>,
}

impl MockStereoRig {
    pub fn new(config: MockRigConfig) -> Result<Self> {
        Self::with_backpressure(config, BackpressureConfig::default())
    }

    pub fn with_backpressure(config: MockRigConfig, backpressure: BackpressureConfig) -> Result<Self> {
        config.validate()?;
        if backpressure.channel_capacity == 0 {
            return Err(IngestionError::invalid("channel_capacity", "must be non-zero"));
        }
        Ok(Self {
            config,
            backpressure,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &MockRigConfig {
        &self.config
    }

    /// Start emitting on the current tokio runtime.
    ///
    /// The returned channel closes when the rig stops or `max_frames` is
    /// reached.
    pub fn start(&self, metrics: Option<Arc<IngestionMetrics>>) -> Result<Receiver<StreamMessage>> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(IngestionError::AlreadyRunning {
                rig: self.config.name.clone(),
            });
        }

        let start = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| Timestamp::from_nanos(d.as_nanos() as u64))
            .unwrap_or(Timestamp::ZERO);
        let mut generator = match RigGenerator::new(self.config.clone(), start) {
            Ok(generator) => generator,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        let (tx, rx) = bounded(self.backpressure.channel_capacity);
        let policy = self.backpressure.drop_policy;
        let running = Arc::clone(&self.running);
        let metrics = metrics.unwrap_or_default();
        let name = self.config.name.clone();
        let period = Duration::from_nanos(self.config.period_nanos());

        info!(
            rig = %name,
            rate_hz = self.config.rate_hz,
            composite = self.config.composite,
            encoding = %self.config.encoding,
            jitter_sec = self.config.jitter_sec,
            "mock stereo rig started"
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            'ticks: while running.load(Ordering::Relaxed) {
                interval.tick().await;
                let Some(messages) = generator.next_tick() else {
                    debug!(rig = %name, frames = generator.sequence(), "mock rig reached max_frames");
                    break;
                };
                metrics.record_frame();
                let expected = if generator.config().composite { 1 } else { 4 };
                for _ in messages.len()..expected {
                    metrics.record_lost();
                }

                for message in messages {
                    let sent = match policy {
                        DropPolicy::DropNewest => match tx.try_send(message) {
                            Ok(()) => true,
                            Err(TrySendError::Full(_)) => {
                                metrics.record_dropped();
                                metrics::counter!("stereo_rig_dropped_total").increment(1);
                                trace!(rig = %name, "rig channel full, message dropped");
                                false
                            }
                            Err(TrySendError::Closed(_)) => break 'ticks,
                        },
                        DropPolicy::Block => {
                            if tx.send(message).await.is_err() {
                                break 'ticks;
                            }
                            true
                        }
                    };
                    if sent {
                        metrics.record_sent();
                        metrics::counter!("stereo_rig_messages_total").increment(1);
                    }
                }
                metrics.update_queue_len(tx.len());
            }

            if tx.is_closed() {
                warn!(rig = %name, "mock rig receiver dropped");
            }
            running.store(false, Ordering::SeqCst);
            debug!(rig = %name, "mock stereo rig stopped");
        });

        Ok(rx)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

impl Drop for MockStereoRig {
    fn drop(&mut self) {
        self.stop();
    }
}
