//! Tick-based process simulation of a steam power plant.
//!
//! Provides:
//! - `PlantProfile`: every tunable constant, with built-in presets
//! - flow tokens moving through the plant zones
//! - boiler thermal model (mixing, heating, cooling, boiling)
//! - turbine shaft and electrical output
//! - `ProcessSimulator`: one tick against a shared `RegisterBank`
//! - headless recording and a fixed-rate tick thread

pub mod error;
pub mod layout;
pub mod profile;
pub mod record;
pub mod runner;
pub mod shaft;
pub mod simulator;
pub mod status;
pub mod thermal;
pub mod token;

pub use error::{SimError, SimResult};
pub use layout::{Point, Rect, Zone};
pub use profile::{HeatingModel, InitialSettings, PlantProfile, RateTable, ShaftParams};
pub use record::{SimOptions, SimRecord, run_sim};
pub use runner::{RunConfig, RunnerHandle, spawn_runner};
pub use shaft::TurbineShaft;
pub use simulator::ProcessSimulator;
pub use status::PlantStatus;
pub use thermal::{BoilerState, BoilerThermal};
pub use token::{FlowToken, Provenance, TokenKind, TokenPool, ZoneCounts};
