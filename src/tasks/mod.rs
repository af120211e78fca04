// Tilt Guard: Tasks
//
// Each task is a struct with a `step()` that does one polling iteration and
// a `run()` that repeats it forever at the task's cadence. The binary moves
// each `run()` onto its own named thread.

pub mod command;
pub mod detection;
pub mod gesture;
pub mod publish;

use std::thread;
use std::time::{Duration, Instant};

/// Sleep for whatever is left of `interval` since `tick_start`. An overrun
/// tick is not caught up; the next one simply starts immediately.
pub(crate) fn sleep_remaining(tick_start: Instant, interval: Duration) {
    let elapsed = tick_start.elapsed();
    if elapsed < interval {
        thread::sleep(interval - elapsed);
    }
}
