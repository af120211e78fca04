// Tilt Guard: System Events & Data Types

use std::fmt;

// ---------------------------------------------------------------------------
// Operating mode
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Mode {
    /// Safe state: no loop does any work.
    #[default]
    Idle = 0,
    /// Gesture classification adjusts the angle threshold.
    Gui = 1,
    /// Tilt monitoring publishes threshold crossings.
    Detection = 2,
}

impl Mode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Anything unrecognised decodes to [`Mode::Idle`].
    pub fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Gui,
            2 => Self::Detection,
            _ => Self::Idle,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Gui => "gui",
            Self::Detection => "detection",
        })
    }
}

// ---------------------------------------------------------------------------
// Gesture classification
// ---------------------------------------------------------------------------

/// Gestures the model was trained on, in model output order.
/// "No stable gesture" is expressed as `Option::<Gesture>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    Ring,
    Slope,
    LeftToRight,
}

impl Gesture {
    pub const ALL: [Gesture; 3] = [Self::Ring, Self::Slope, Self::LeftToRight];

    pub fn index(self) -> usize {
        match self {
            Self::Ring => 0,
            Self::Slope => 1,
            Self::LeftToRight => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Ring => "ring",
            Self::Slope => "slope",
            Self::LeftToRight => "left to right",
        }
    }
}

// ---------------------------------------------------------------------------
// Raw accelerometer reading (sensor LSB units)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccelSample {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl AccelSample {
    pub const fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }

    pub fn axes(&self) -> [i64; 3] {
        [self.x as i64, self.y as i64, self.z as i64]
    }
}

// ---------------------------------------------------------------------------
// Telemetry
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qos {
    /// Fire and forget: no acknowledgement, no retry.
    AtMostOnce,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishEvent {
    pub topic: String,
    pub payload: String,
    pub qos: Qos,
}

impl PublishEvent {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            qos: Qos::AtMostOnce,
        }
    }

    /// `count` is the 1-based session counter after the crossing was recorded.
    pub fn crossing(topic: &str, count: u32) -> Self {
        Self::new(topic, format!("The {} time(s)", count))
    }

    pub fn threshold_report(topic: &str, threshold: u32) -> Self {
        Self::new(topic, format!("Angle threshold is {}", threshold))
    }
}

/// Work items for the publish worker thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishRequest {
    /// Publish a ready-made event.
    Event(PublishEvent),
    /// Button press: report the current threshold, then drop to idle.
    ThresholdReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_decodes_unknown_to_idle() {
        for mode in [Mode::Idle, Mode::Gui, Mode::Detection] {
            assert_eq!(Mode::from_u8(mode.as_u8()), mode);
        }
        assert_eq!(Mode::from_u8(7), Mode::Idle);
        assert_eq!(Mode::from_u8(u8::MAX), Mode::Idle);
    }

    #[test]
    fn gesture_index_matches_model_order() {
        for (i, g) in Gesture::ALL.iter().enumerate() {
            assert_eq!(g.index(), i);
            assert_eq!(Gesture::from_index(i), Some(*g));
        }
        assert_eq!(Gesture::from_index(3), None);
    }

    #[test]
    fn payload_formats() {
        let ev = PublishEvent::crossing("t", 3);
        assert_eq!(ev.payload, "The 3 time(s)");
        assert_eq!(ev.qos, Qos::AtMostOnce);
        assert_eq!(PublishEvent::threshold_report("t", 45).payload, "Angle threshold is 45");
    }
}
