//! Boiler volume setpoints.
//!
//! Low and high thresholds are integrators: consoles nudge them by writing a
//! delta code (`0` down, `1` hold, `2` up) and the simulator republishes the
//! integrated value plus [`SETPOINT_BIAS`]. Writing a value at or above the
//! bias sets the threshold absolutely.
//!
//! The pair always satisfies `low < high`. Low is applied first; high is then
//! pushed above low if needed.

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, ControlResult};

pub const SETPOINT_BIAS: u16 = 3;

const MAX_HIGH: u16 = u16::MAX - SETPOINT_BIAS;

/// Result of integrating one pair of raw setpoint words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetpointUpdate {
    pub low: u16,
    pub high: u16,
    /// Encoded low to publish.
    pub low_raw: u16,
    /// Encoded high to publish.
    pub high_raw: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSetpoints {
    low: u16,
    high: u16,
}

impl VolumeSetpoints {
    pub fn new(low: u16, high: u16) -> ControlResult<Self> {
        if low >= high {
            return Err(ControlError::InvalidArg {
                what: "low setpoint must be below high setpoint",
            });
        }
        if high > MAX_HIGH {
            return Err(ControlError::OutOfRange {
                what: "high setpoint",
                value: i64::from(high),
            });
        }
        Ok(Self { low, high })
    }

    pub fn low(&self) -> u16 {
        self.low
    }

    pub fn high(&self) -> u16 {
        self.high
    }

    pub fn encode(value: u16) -> u16 {
        value.saturating_add(SETPOINT_BIAS)
    }

    /// Integrate the raw words read from the bank.
    pub fn apply(&mut self, low_raw: u16, high_raw: u16) -> SetpointUpdate {
        let low = integrate(self.low, low_raw);
        self.low = low.clamp(0, i64::from(self.high) - 1) as u16;

        let high = integrate(self.high, high_raw);
        self.high = high.clamp(i64::from(self.low) + 1, i64::from(MAX_HIGH)) as u16;

        SetpointUpdate {
            low: self.low,
            high: self.high,
            low_raw: Self::encode(self.low),
            high_raw: Self::encode(self.high),
        }
    }

    /// Boiler is below the low threshold.
    pub fn needs_water(&self, volume: usize) -> bool {
        volume < usize::from(self.low)
    }

    /// Boiler is at or above the high threshold.
    pub fn should_stop_water(&self, volume: usize) -> bool {
        volume >= usize::from(self.high)
    }
}

fn integrate(current: u16, raw: u16) -> i64 {
    match raw.checked_sub(SETPOINT_BIAS) {
        Some(absolute) => i64::from(absolute),
        None => i64::from(current) + i64::from(raw) - 1,
    }
}
