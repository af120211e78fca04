// Tilt Guard: Detection Task
//
// Active in DETECTION mode. Samples the accelerometer every 250 ms, shows the
// tilt angle, blinks the resting light while the board lies still, and lets
// the tilt monitor publish threshold crossings. Outside DETECTION it keeps
// polling the mode at the same cadence so it can resume promptly.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::display::show_angle;
use crate::error::Error;
use crate::events::Mode;
use crate::mode::ModeController;
use crate::peripherals::{AccelerometerSource, Display, EventPublisher, Indicator};
use crate::tilt::{TiltMonitor, TiltReading};

pub struct DetectionTask<A, D, I, R, P> {
    accel: A,
    display: D,
    led: I,
    resting_led: R,
    monitor: TiltMonitor<P>,
    mode: Arc<ModeController>,
    interval: Duration,
}

impl<A, D, I, R, P> DetectionTask<A, D, I, R, P>
where
    A: AccelerometerSource,
    D: Display,
    I: Indicator,
    R: Indicator,
    P: EventPublisher,
{
    pub fn new(
        monitor: TiltMonitor<P>,
        accel: A,
        display: D,
        led: I,
        resting_led: R,
        mode: Arc<ModeController>,
        interval: Duration,
    ) -> Self {
        Self {
            accel,
            display,
            led,
            resting_led,
            monitor,
            mode,
            interval,
        }
    }

    pub fn monitor(&self) -> &TiltMonitor<P> {
        &self.monitor
    }

    /// One polling iteration. Returns the reading if a sample was measured.
    pub fn step(&mut self) -> Option<TiltReading> {
        let snapshot = self.mode.snapshot();
        if snapshot.mode != Mode::Detection {
            self.led.set(false);
            return None;
        }
        self.led.set(true);

        let sample = match self.accel.read() {
            Ok(sample) => sample,
            Err(Error::SensorMiss) => return None,
            Err(e) => {
                log::warn!("Accelerometer read failed: {}", e);
                return None;
            }
        };

        let reading = self.monitor.observe(snapshot, sample)?;

        if let Err(e) = show_angle(&mut self.display, reading.angle) {
            log::warn!("Display error: {}", e);
        }
        if reading.resting {
            self.resting_led.toggle();
        }
        Some(reading)
    }

    pub fn run(mut self) -> ! {
        log::info!("Detection task started");
        loop {
            let tick_start = Instant::now();
            self.step();
            super::sleep_remaining(tick_start, self.interval);
        }
    }
}
