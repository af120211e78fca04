// Tilt Guard: Gesture Task
//
// Active in GUI mode. Keeps a rolling 64-sample accelerometer window, runs the
// classifier on every new sample once the window is full, and debounces the
// result. A confirmed left-to-right gesture steps the angle threshold; any
// confirmed gesture refreshes the threshold on the display and restarts the
// window.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::classifier::{verify_model, Classifier, GestureWindow};
use crate::config::GestureConfig;
use crate::debounce::GestureDebouncer;
use crate::display::show_threshold;
use crate::error::{Error, Result};
use crate::events::{Gesture, Mode};
use crate::mode::ModeController;
use crate::peripherals::{AccelerometerSource, Display, Indicator};
use crate::threshold::ThresholdStore;

pub struct GestureTask<A, C, D, I> {
    accel: A,
    classifier: C,
    display: D,
    led: I,
    debouncer: GestureDebouncer,
    window: GestureWindow,
    input: Vec<f32>,
    output: Vec<f32>,
    threshold: Arc<ThresholdStore>,
    mode: Arc<ModeController>,
    interval: Duration,
}

impl<A, C, D, I> GestureTask<A, C, D, I>
where
    A: AccelerometerSource,
    C: Classifier,
    D: Display,
    I: Indicator,
{
    /// Checks the model against `config` first; a mismatch disables the
    /// gesture task for the lifetime of the process. The threshold starts
    /// over at its minimum.
    pub fn new(
        config: &GestureConfig,
        accel: A,
        classifier: C,
        display: D,
        led: I,
        threshold: Arc<ThresholdStore>,
        mode: Arc<ModeController>,
    ) -> Result<Self> {
        let spec = classifier.spec();
        verify_model(spec, config)?;
        threshold.reset();

        Ok(Self {
            accel,
            classifier,
            display,
            led,
            debouncer: GestureDebouncer::new(config),
            window: GestureWindow::new(config.seq_length),
            input: vec![0.0; spec.input_len],
            output: vec![0.0; spec.label_count],
            threshold,
            mode,
            interval: config.sample_interval,
        })
    }

    pub fn debouncer(&self) -> &GestureDebouncer {
        &self.debouncer
    }

    pub fn window(&self) -> &GestureWindow {
        &self.window
    }

    /// One polling iteration. Returns the gesture confirmed on this tick.
    pub fn step(&mut self) -> Option<Gesture> {
        if self.mode.get() != Mode::Gui {
            self.led.set(false);
            return None;
        }
        self.led.set(true);

        match self.accel.read() {
            Ok(sample) => self.window.push(sample),
            Err(Error::SensorMiss) => return None,
            Err(e) => {
                log::warn!("Accelerometer read failed: {}", e);
                return None;
            }
        }

        if !self.window.is_ready() {
            return None;
        }

        self.window.flatten_into(&mut self.input);
        if let Err(e) = self.classifier.infer(&self.input, &mut self.output) {
            log::warn!("Inference skipped: {}", e);
            return None;
        }

        let gesture = self.debouncer.classify(&self.output)?;
        // Next gesture is built from fresh samples only.
        self.window.clear();
        self.apply(gesture);
        Some(gesture)
    }

    fn apply(&mut self, gesture: Gesture) {
        if gesture == Gesture::LeftToRight {
            let threshold = self.threshold.advance();
            log::info!("Gesture: {} -> threshold {}°", gesture.display_name(), threshold);
        } else {
            log::info!("Gesture: {}", gesture.display_name());
        }

        if let Err(e) = show_threshold(&mut self.display, self.threshold.current()) {
            log::warn!("Display error: {}", e);
        }
    }

    pub fn run(mut self) -> ! {
        log::info!("Gesture task started");
        loop {
            let tick_start = Instant::now();
            self.step();
            super::sleep_remaining(tick_start, self.interval);
        }
    }
}
