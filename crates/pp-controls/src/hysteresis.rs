//! Pressure relief latch.
//!
//! Sets above the high threshold and clears only below the low threshold.
//! Between the two the latch keeps whatever state it had.

use pp_core::Real;
use serde::{Deserialize, Serialize};

use crate::error::{ControlError, ControlResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReliefState {
    #[default]
    Normal,
    Releasing,
}

impl ReliefState {
    pub fn is_releasing(self) -> bool {
        matches!(self, ReliefState::Releasing)
    }

    /// Alarm register encoding.
    pub fn alarm(self) -> u16 {
        u16::from(self.is_releasing())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReliefLatch {
    low: Real,
    high: Real,
    state: ReliefState,
}

impl ReliefLatch {
    pub fn new(low: Real, high: Real) -> ControlResult<Self> {
        if !(low.is_finite() && high.is_finite()) || low < 0.0 || low >= high {
            return Err(ControlError::InvalidArg {
                what: "relief thresholds must satisfy 0 <= low < high",
            });
        }
        Ok(Self {
            low,
            high,
            state: ReliefState::Normal,
        })
    }

    pub fn state(&self) -> ReliefState {
        self.state
    }

    pub fn thresholds(&self) -> (Real, Real) {
        (self.low, self.high)
    }

    /// Open the relief path regardless of pressure.
    pub fn trip(&mut self) {
        self.state = ReliefState::Releasing;
    }

    /// Feed the current pressure and return the resulting state.
    pub fn update(&mut self, pressure: Real) -> ReliefState {
        self.state = match self.state {
            ReliefState::Normal if pressure > self.high => ReliefState::Releasing,
            ReliefState::Releasing if pressure < self.low => ReliefState::Normal,
            s => s,
        };
        self.state
    }
}
