// Tilt Guard: Angle Threshold Store
//
// Written by the gesture loop (one step per confirmed left-to-right gesture),
// read by the detection loop on every tilt sample.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::config::ThresholdConfig;

#[derive(Debug)]
pub struct ThresholdStore {
    value: AtomicU32,
    config: ThresholdConfig,
}

impl ThresholdStore {
    /// Starts at `config.min`. The config is expected to have passed
    /// [`ThresholdConfig::validate`].
    pub fn new(config: ThresholdConfig) -> Self {
        Self {
            value: AtomicU32::new(config.min),
            config,
        }
    }

    pub fn current(&self) -> u32 {
        self.value.load(Ordering::Acquire)
    }

    /// Step up by one increment, wrapping past `max` back to `min`.
    /// Returns the new threshold.
    pub fn advance(&self) -> u32 {
        let cfg = self.config;
        let next = |v: u32| {
            let stepped = v.saturating_add(cfg.step);
            if stepped > cfg.max {
                cfg.min
            } else {
                stepped
            }
        };

        // The closure always returns Some, so this never takes the Err arm.
        let prev = match self
            .value
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| Some(next(v)))
        {
            Ok(v) | Err(v) => v,
        };
        next(prev)
    }

    pub fn reset(&self) {
        self.value.store(self.config.min, Ordering::Release);
    }
}

impl Default for ThresholdStore {
    fn default() -> Self {
        Self::new(ThresholdConfig::default())
    }
}
