// Tilt Guard: Peripheral Interfaces
//
// The engine only talks to hardware and the network through these traits.
// The ESP32 binary implements them over esp-idf drivers; the host build and
// the tests use the portable implementations below.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::events::{AccelSample, PublishEvent};

/// Raw 3-axis accelerometer.
pub trait AccelerometerSource {
    /// [`Error::SensorMiss`] when no new sample is available yet.
    fn read(&mut self) -> Result<AccelSample>;
}

/// Character-cell text output.
pub trait Display {
    fn write_at(&mut self, col: u8, row: u8, text: &str) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

/// A single on/off status light.
pub trait Indicator {
    fn set(&mut self, on: bool);
    fn toggle(&mut self);
}

/// At-most-once telemetry sink.
pub trait EventPublisher {
    fn publish(&mut self, event: PublishEvent) -> Result<()>;
}

impl<T: EventPublisher + ?Sized> EventPublisher for Box<T> {
    fn publish(&mut self, event: PublishEvent) -> Result<()> {
        (**self).publish(event)
    }
}

// ---------------------------------------------------------------------------
// Shared display: both sensor loops draw onto the same panel.
// ---------------------------------------------------------------------------

impl<D: Display> Display for Arc<Mutex<D>> {
    fn write_at(&mut self, col: u8, row: u8, text: &str) -> Result<()> {
        self.lock()
            .map_err(|_| Error::Display("display lock poisoned".into()))?
            .write_at(col, row, text)
    }

    fn clear(&mut self) -> Result<()> {
        self.lock()
            .map_err(|_| Error::Display("display lock poisoned".into()))?
            .clear()
    }
}

// ---------------------------------------------------------------------------
// Portable implementations
// ---------------------------------------------------------------------------

/// Indicator backed by a shared flag, so another thread (or a test) can
/// observe it.
#[derive(Debug, Clone, Default)]
pub struct FlagIndicator {
    state: Arc<AtomicBool>,
}

impl FlagIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self) -> bool {
        self.state.load(Ordering::Relaxed)
    }
}

impl Indicator for FlagIndicator {
    fn set(&mut self, on: bool) {
        self.state.store(on, Ordering::Relaxed);
    }

    fn toggle(&mut self) {
        self.state.fetch_xor(true, Ordering::Relaxed);
    }
}

/// Publisher that only writes the event to the log. Stands in for the
/// broker on the host build.
#[derive(Debug, Default)]
pub struct LogPublisher {
    sent: u64,
}

impl LogPublisher {
    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl EventPublisher for LogPublisher {
    fn publish(&mut self, event: PublishEvent) -> Result<()> {
        self.sent += 1;
        log::info!("[{}] {} ({:?})", event.topic, event.payload, event.qos);
        Ok(())
    }
}
