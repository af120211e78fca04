// Tilt Guard: Gesture Debouncer
//
// Turns the per-inference probability vector into a stable gesture. A label
// must win a configured number of consecutive inferences before it is
// reported, and once reported the state is cleared so the same gesture has
// to be performed again before it fires a second time.

use crate::config::{GestureConfig, GESTURE_LABEL_COUNT};
use crate::events::Gesture;

/// Snapshot of the hysteresis state, mainly for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DebounceState {
    pub last: Option<Gesture>,
    pub consecutive: u32,
}

#[derive(Debug, Clone)]
pub struct GestureDebouncer {
    confidence: f32,
    required: [u32; GESTURE_LABEL_COUNT],
    state: DebounceState,
}

impl GestureDebouncer {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            confidence: config.confidence,
            required: config.consecutive,
            state: DebounceState::default(),
        }
    }

    pub fn state(&self) -> DebounceState {
        self.state
    }

    pub fn required(&self, gesture: Gesture) -> u32 {
        self.required[gesture.index()]
    }

    /// Feed one inference result. Returns the gesture on the cycle it becomes
    /// confirmed, `None` otherwise.
    pub fn classify(&mut self, probabilities: &[f32]) -> Option<Gesture> {
        // Probabilities sum to 1, so at most one entry can clear the cutoff.
        let candidate = probabilities
            .iter()
            .take(Gesture::ALL.len())
            .position(|&p| p > self.confidence)
            .and_then(Gesture::from_index);

        let Some(gesture) = candidate else {
            self.state = DebounceState::default();
            return None;
        };

        if self.state.last == Some(gesture) {
            self.state.consecutive = self.state.consecutive.saturating_add(1);
        } else {
            self.state = DebounceState {
                last: Some(gesture),
                consecutive: 1,
            };
        }

        if self.state.consecutive < self.required(gesture) {
            return None;
        }

        self.state = DebounceState::default();
        Some(gesture)
    }

    pub fn reset(&mut self) {
        self.state = DebounceState::default();
    }
}
