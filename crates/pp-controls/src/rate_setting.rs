//! Offset-encoded, self-correcting rate knobs.
//!
//! A rate register stores `step + RATE_BIAS`. Consoles usually do not write
//! absolute values: they write `0`, `1` or `2` meaning "one step down, stay,
//! one step up" (raw minus one). The simulator therefore treats anything
//! below the bias as a delta, applies it to the last accepted step, clamps,
//! and republishes the proper encoding so the next console poll reads a
//! valid value again.
//!
//! Step 0 is the strongest setting (shortest production interval).

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, ControlResult};

/// Offset between a logical step and its register encoding.
pub const RATE_BIAS: u16 = 3;

/// Outcome of correcting one raw register value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Correction {
    /// Accepted logical step.
    pub step: u16,
    /// Value to write back, when the raw value was not the canonical encoding.
    pub publish: Option<u16>,
}

/// State of one rate knob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSetting {
    max_step: u16,
    step: u16,
}

impl RateSetting {
    /// Create a knob with `steps` logical positions, starting at `initial`.
    pub fn new(steps: u16, initial: u16) -> ControlResult<Self> {
        if steps == 0 {
            return Err(ControlError::InvalidArg {
                what: "rate setting needs at least one step",
            });
        }
        if steps > u16::MAX - RATE_BIAS {
            return Err(ControlError::InvalidArg {
                what: "rate setting has too many steps to encode",
            });
        }
        if initial >= steps {
            return Err(ControlError::OutOfRange {
                what: "initial rate step",
                value: i64::from(initial),
            });
        }
        Ok(Self {
            max_step: steps - 1,
            step: initial,
        })
    }

    /// Last accepted logical step.
    pub fn step(&self) -> u16 {
        self.step
    }

    pub fn max_step(&self) -> u16 {
        self.max_step
    }

    /// Number of logical steps.
    pub fn steps(&self) -> u16 {
        self.max_step + 1
    }

    /// Register encoding of the current step.
    pub fn encoded(&self) -> u16 {
        Self::encode(self.step)
    }

    pub fn encode(step: u16) -> u16 {
        step.saturating_add(RATE_BIAS)
    }

    /// Decode a raw value without touching state. Returns `None` for values
    /// outside the canonical encoding.
    pub fn decode(&self, raw: u16) -> Option<u16> {
        let step = raw.checked_sub(RATE_BIAS)?;
        (step <= self.max_step).then_some(step)
    }

    /// Accept a raw register value.
    pub fn correct(&mut self, raw: u16) -> Correction {
        self.step = match raw.checked_sub(RATE_BIAS) {
            Some(step) => step.min(self.max_step),
            None => {
                let delta = i32::from(raw) - 1;
                let next = i32::from(self.step) + delta;
                next.clamp(0, i32::from(self.max_step)) as u16
            }
        };

        let encoded = self.encoded();
        Correction {
            step: self.step,
            publish: (encoded != raw).then_some(encoded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_values_are_absolute() {
        let mut knob = RateSetting::new(4, 0).unwrap();
        let c = knob.correct(5);
        assert_eq!(c.step, 2);
        assert_eq!(c.publish, None);
    }

    #[test]
    fn small_values_are_deltas() {
        let mut knob = RateSetting::new(4, 1).unwrap();

        // 2 means one step up
        assert_eq!(
            knob.correct(2),
            Correction {
                step: 2,
                publish: Some(5)
            }
        );
        // 1 means stay
        assert_eq!(knob.correct(1).step, 2);
        // 0 means one step down
        assert_eq!(knob.correct(0).step, 1);
    }

    #[test]
    fn deltas_clamp_at_both_ends() {
        let mut knob = RateSetting::new(4, 0).unwrap();
        assert_eq!(knob.correct(0).step, 0);
        assert_eq!(knob.correct(0).publish, Some(3));

        let mut knob = RateSetting::new(4, 3).unwrap();
        assert_eq!(knob.correct(2).step, 3);
        assert_eq!(knob.correct(2).publish, Some(6));
    }

    #[test]
    fn oversized_values_clamp_to_max() {
        let mut knob = RateSetting::new(10, 0).unwrap();
        let c = knob.correct(500);
        assert_eq!(c.step, 9);
        assert_eq!(c.publish, Some(12));
    }

    #[test]
    fn decode_is_strict() {
        let knob = RateSetting::new(4, 0).unwrap();
        assert_eq!(knob.decode(3), Some(0));
        assert_eq!(knob.decode(6), Some(3));
        assert_eq!(knob.decode(7), None);
        assert_eq!(knob.decode(2), None);
    }

    #[test]
    fn constructor_validates() {
        assert!(RateSetting::new(0, 0).is_err());
        assert!(RateSetting::new(4, 4).is_err());
        assert!(RateSetting::new(u16::MAX, 0).is_err());
    }
}
