//! Tick-sampled execution.
//!
//! Production and thermal updates happen once every N ticks rather than every
//! tick. A [`Countdown`] tracks how many ticks remain until the next firing;
//! the period may change between firings (a rate knob moved), in which case
//! the new period applies from the next re-arm.

use serde::{Deserialize, Serialize};

/// Counts ticks down to the next firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    remaining: u32,
}

impl Countdown {
    /// Arm a countdown that fires after `period` ticks.
    ///
    /// A period of 0 is treated as 1 (fire every tick).
    pub fn new(period: u32) -> Self {
        Self {
            remaining: period.max(1),
        }
    }

    /// Advance by one tick.
    ///
    /// Returns `true` when the countdown elapsed on this tick; it is then
    /// re-armed with `period`.
    pub fn tick(&mut self, period: u32) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.remaining = period.max(1);
            true
        } else {
            false
        }
    }

    /// Re-arm without firing.
    pub fn reset(&mut self, period: u32) {
        self.remaining = period.max(1);
    }

    /// Ticks left until the next firing.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}
