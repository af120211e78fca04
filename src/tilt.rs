// Tilt Guard: Tilt Monitor
//
// Measures how far the board has rotated away from the orientation it had
// when the detection session started, and publishes a numbered event each
// time the angle reaches the current threshold, until the session is full.

use std::sync::Arc;

use crate::config::TiltConfig;
use crate::events::{AccelSample, Mode, PublishEvent};
use crate::mode::{ModeController, ModeSnapshot};
use crate::peripherals::EventPublisher;
use crate::session::{SessionLimiter, SessionTick};
use crate::threshold::ThresholdStore;

/// Angle in degrees between two raw accelerometer vectors.
///
/// `None` if either vector has zero length.
pub fn tilt_angle_deg(sample: AccelSample, baseline: AccelSample) -> Option<f32> {
    let s = sample.axes();
    let b = baseline.axes();

    let dot: i64 = s.iter().zip(b.iter()).map(|(a, c)| a * c).sum();
    let norm_s: i64 = s.iter().map(|a| a * a).sum();
    let norm_b: i64 = b.iter().map(|a| a * a).sum();
    if norm_s == 0 || norm_b == 0 {
        return None;
    }

    // Rounding can push the cosine a hair past ±1.
    let cos = (dot as f64 / ((norm_s as f64).sqrt() * (norm_b as f64).sqrt())).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees() as f32)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiltReading {
    pub angle: f32,
    /// Within the stillness band around the baseline.
    pub resting: bool,
    /// Set when this sample produced a published crossing.
    pub crossing: Option<SessionTick>,
}

pub struct TiltMonitor<P> {
    config: TiltConfig,
    topic: String,
    threshold: Arc<ThresholdStore>,
    mode: Arc<ModeController>,
    session: SessionLimiter,
    publisher: P,
    baseline: Option<AccelSample>,
    epoch: Option<u32>,
}

impl<P: EventPublisher> TiltMonitor<P> {
    pub fn new(
        config: TiltConfig,
        topic: impl Into<String>,
        threshold: Arc<ThresholdStore>,
        mode: Arc<ModeController>,
        publisher: P,
    ) -> Self {
        let session = SessionLimiter::new(config.session_cap);
        Self {
            config,
            topic: topic.into(),
            threshold,
            mode,
            session,
            publisher,
            baseline: None,
            epoch: None,
        }
    }

    pub fn session(&self) -> &SessionLimiter {
        &self.session
    }

    pub fn baseline(&self) -> Option<AccelSample> {
        self.baseline
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Process one sample taken while `snapshot` was the current mode.
    ///
    /// A snapshot from an epoch not seen before starts a new session: the
    /// counter is cleared and `sample` becomes the baseline. Returns `None`
    /// for samples the angle is undefined for.
    pub fn observe(&mut self, snapshot: ModeSnapshot, sample: AccelSample) -> Option<TiltReading> {
        debug_assert_eq!(snapshot.mode, Mode::Detection);

        if self.epoch != Some(snapshot.epoch) {
            self.begin_session(snapshot.epoch);
        }

        let baseline = match self.baseline {
            Some(b) => b,
            None => {
                if tilt_angle_deg(sample, sample).is_none() {
                    log::warn!("Zero-length sample, baseline not captured yet");
                    return None;
                }
                log::info!("Baseline captured: {:?}", sample);
                self.baseline = Some(sample);
                sample
            }
        };

        let Some(angle) = tilt_angle_deg(sample, baseline) else {
            log::debug!("Zero-length sample skipped");
            return None;
        };

        let resting = angle < self.config.resting_angle_deg;
        let threshold = self.threshold.current();
        let crossing = if angle >= threshold as f32 {
            self.record_crossing(snapshot, angle, threshold)
        } else {
            None
        };

        Some(TiltReading {
            angle,
            resting,
            crossing,
        })
    }

    fn begin_session(&mut self, epoch: u32) {
        log::info!("Detection session started (epoch {})", epoch);
        self.epoch = Some(epoch);
        self.session.reset();
        self.baseline = None;
    }

    fn record_crossing(&mut self, snapshot: ModeSnapshot, angle: f32, threshold: u32) -> Option<SessionTick> {
        let tick = self.session.record()?;
        log::info!(
            "Tilt {:.1}° >= {}° (event {}/{})",
            angle,
            threshold,
            tick.count,
            self.session.cap()
        );

        if let Err(e) = self.publisher.publish(PublishEvent::crossing(&self.topic, tick.count)) {
            log::warn!("Crossing event {} dropped: {}", tick.count, e);
        }

        if tick.cap_reached {
            log::info!("Session cap reached, leaving detection");
            self.mode.release(snapshot, Mode::Idle);
        }
        Some(tick)
    }
}
