// Tilt Guard: Button Input
//
// Debounced press detection for the user button, polled from the button
// task at ~100 Hz. A press never does any work itself: the caller turns it
// into a publish request on the worker queue.

use std::time::{Duration, Instant};

/// Raw electrical state of the button line.
pub trait ButtonLine {
    fn is_pressed(&mut self) -> bool;
}

pub struct ButtonInput<L> {
    line: L,
    debounce: Duration,

    // Debounce state
    last_raw: bool,
    last_change: Instant,

    // Stable state after debouncing
    pressed: bool,
}

impl<L: ButtonLine> ButtonInput<L> {
    pub fn new(line: L, debounce: Duration) -> Self {
        Self::starting_at(line, debounce, Instant::now())
    }

    pub fn starting_at(line: L, debounce: Duration, now: Instant) -> Self {
        Self {
            line,
            debounce,
            last_raw: false,
            last_change: now,
            pressed: false,
        }
    }

    /// Call every ~10 ms. Returns `true` exactly once per debounced press.
    pub fn poll_at(&mut self, now: Instant) -> bool {
        let raw = self.line.is_pressed();

        // ---- debounce filter ----
        if raw != self.last_raw {
            self.last_change = now;
            self.last_raw = raw;
        }
        if now.duration_since(self.last_change) < self.debounce {
            // Signal still bouncing, wait.
            return false;
        }

        // ---- press edge ----
        let edge = raw && !self.pressed;
        self.pressed = raw;
        edge
    }
}
