// Tilt Guard: Engine
//
// Mode-arbitrated gesture and tilt detection for a small accelerometer
// board. One remote command picks the operating mode:
//
//   GUI        gestures step the tilt-angle threshold
//   DETECTION  tilts past the threshold are published, up to five per session
//   IDLE       nothing runs
//
// Hardware and network access sit behind the traits in `peripherals`, so the
// whole engine runs (and is tested) on the host as well as on the ESP32.

pub mod classifier;
pub mod config;
pub mod debounce;
pub mod display;
pub mod error;
pub mod events;
pub mod gateway;
pub mod input;
pub mod mode;
pub mod peripherals;
pub mod session;
pub mod tasks;
pub mod threshold;
pub mod tilt;

pub use error::{Error, Result};
pub use events::{AccelSample, Gesture, Mode, PublishEvent, PublishRequest};
