//! Operator-facing control primitives for the power plant.
//!
//! Everything here is a small, tick-driven state machine that turns raw
//! register values into validated control state:
//! - offset-encoded rate knobs that correct drifted raw values
//! - delta-integrated volume setpoints
//! - the pressure relief latch (hysteresis between two thresholds)
//! - tick countdowns for production intervals
//! - two-position switches (valves, breakers)
//!
//! None of these types touch the register bank directly; the simulator
//! reads raw words, feeds them through here and publishes what comes back.

pub mod error;
pub mod hysteresis;
pub mod rate_setting;
pub mod sampled;
pub mod setpoint;
pub mod switch;

pub use error::{ControlError, ControlResult};
pub use hysteresis::{ReliefLatch, ReliefState};
pub use rate_setting::{Correction, RATE_BIAS, RateSetting};
pub use sampled::Countdown;
pub use setpoint::{SETPOINT_BIAS, SetpointUpdate, VolumeSetpoints};
pub use switch::Switch;
