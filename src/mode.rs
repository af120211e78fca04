// Tilt Guard: Mode Controller
//
// The single system-wide operating mode. Mode and a session epoch are packed
// into one atomic word so a reader always sees a consistent pair:
//
//   bits 31..8  epoch (bumped on every actual mode change, wraps)
//   bits  7..0  Mode discriminant
//
// The epoch lets a polling loop notice that DETECTION was left and re-entered
// between two of its ticks, which the mode value alone cannot show.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::events::Mode;

const MODE_MASK: u32 = 0xFF;
const EPOCH_SHIFT: u32 = 8;

/// Mode plus the epoch in which it was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeSnapshot {
    pub mode: Mode,
    pub epoch: u32,
}

impl ModeSnapshot {
    fn pack(self) -> u32 {
        (self.epoch << EPOCH_SHIFT) | self.mode.as_u8() as u32
    }

    fn unpack(raw: u32) -> Self {
        Self {
            mode: Mode::from_u8((raw & MODE_MASK) as u8),
            epoch: raw >> EPOCH_SHIFT,
        }
    }

    fn successor(self, mode: Mode) -> Self {
        Self {
            mode,
            // 24-bit epoch; wrapping is harmless, only inequality matters.
            epoch: self.epoch.wrapping_add(1) & (u32::MAX >> EPOCH_SHIFT),
        }
    }
}

#[derive(Debug, Default)]
pub struct ModeController {
    state: AtomicU32,
}

impl ModeController {
    /// Starts in [`Mode::Idle`], epoch 0.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Mode {
        self.snapshot().mode
    }

    pub fn snapshot(&self) -> ModeSnapshot {
        ModeSnapshot::unpack(self.state.load(Ordering::Acquire))
    }

    /// Unconditional transition. A new command always wins, even in the
    /// middle of a detection session. Setting the current mode again is a
    /// no-op and does not start a new epoch. Returns the previous mode.
    pub fn set(&self, mode: Mode) -> Mode {
        let result = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                let current = ModeSnapshot::unpack(raw);
                (current.mode != mode).then(|| current.successor(mode).pack())
            });

        match result {
            Ok(raw) => {
                let prev = ModeSnapshot::unpack(raw).mode;
                log::info!("Mode {} -> {}", prev, mode);
                prev
            }
            Err(raw) => ModeSnapshot::unpack(raw).mode,
        }
    }

    /// Transition only if the controller is still exactly in `expected`
    /// (same mode, same epoch). Used by automatic transitions so they never
    /// override a command that arrived in the meantime.
    pub fn release(&self, expected: ModeSnapshot, mode: Mode) -> bool {
        if expected.mode == mode {
            return false;
        }
        let next = expected.successor(mode);
        let swapped = self
            .state
            .compare_exchange(expected.pack(), next.pack(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if swapped {
            log::info!("Mode {} -> {} (automatic)", expected.mode, mode);
        } else {
            log::debug!("Automatic {} -> {} skipped, mode changed meanwhile", expected.mode, mode);
        }
        swapped
    }
}
