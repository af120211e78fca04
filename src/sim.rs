// Tilt Guard: Host Simulation
//
// Stand-in hardware for running the engine on a development machine.
// The simulated board rocks slowly about the X axis (0° to 60° and back, one
// cycle every two minutes) and, for four seconds out of every thirty, gets
// shaken along Z so the gesture loop has something to recognise. The button
// is pressed on a timer as well.

use std::f32::consts::PI;
use std::time::{Duration, Instant};

use tiltguard::input::ButtonLine;
use tiltguard::peripherals::{AccelerometerSource, Display};
use tiltguard::{AccelSample, Result};

/// 1 g at ±2 g full scale.
const ONE_G: f32 = 16384.0;
const ROCK_PERIOD: Duration = Duration::from_secs(120);
const ROCK_AMPLITUDE_DEG: f32 = 60.0;
const SHAKE_EVERY: Duration = Duration::from_secs(30);
const SHAKE_FOR: Duration = Duration::from_secs(4);
const SHAKE_HZ: f32 = 1.5;
const SHAKE_AMPLITUDE: f32 = 5000.0;

#[derive(Debug, Clone)]
pub struct SimulatedImu {
    start: Instant,
}

impl SimulatedImu {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }

    fn sample_at(&self, t: Duration) -> AccelSample {
        let secs = t.as_secs_f32();
        let phase = 2.0 * PI * secs / ROCK_PERIOD.as_secs_f32();
        let tilt = (ROCK_AMPLITUDE_DEG / 2.0 * (1.0 - phase.cos())).to_radians();

        let mut z = ONE_G * tilt.cos();
        let y = ONE_G * tilt.sin();
        if t.as_millis() % SHAKE_EVERY.as_millis() < SHAKE_FOR.as_millis() && t >= SHAKE_EVERY {
            z += SHAKE_AMPLITUDE * (2.0 * PI * SHAKE_HZ * secs).sin();
        }

        AccelSample::new(0, clamp_i16(y), clamp_i16(z))
    }
}

impl AccelerometerSource for SimulatedImu {
    fn read(&mut self) -> Result<AccelSample> {
        Ok(self.sample_at(self.start.elapsed()))
    }
}

fn clamp_i16(v: f32) -> i16 {
    v.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Echoes every screen update to the log at debug level before drawing it.
pub struct LoggedDisplay<D> {
    inner: D,
}

impl<D: Display> LoggedDisplay<D> {
    pub fn new(inner: D) -> Self {
        Self { inner }
    }
}

impl<D: Display> Display for LoggedDisplay<D> {
    fn write_at(&mut self, col: u8, row: u8, text: &str) -> Result<()> {
        log::debug!("screen ({}, {}): {:?}", col, row, text);
        self.inner.write_at(col, row, text)
    }

    fn clear(&mut self) -> Result<()> {
        log::debug!("screen cleared");
        self.inner.clear()
    }
}

const PRESS_EVERY: Duration = Duration::from_secs(45);
const PRESS_FOR: Duration = Duration::from_millis(150);

/// Button that gets pressed briefly once every 45 seconds.
#[derive(Debug, Clone)]
pub struct SimulatedButton {
    start: Instant,
}

impl SimulatedButton {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl ButtonLine for SimulatedButton {
    fn is_pressed(&mut self) -> bool {
        let t = self.start.elapsed();
        t >= PRESS_EVERY && t.as_millis() % PRESS_EVERY.as_millis() < PRESS_FOR.as_millis()
    }
}
