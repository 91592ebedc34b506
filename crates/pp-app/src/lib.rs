//! Shared application service layer for the power plant world.
//!
//! Both the `pp-world` binary and the integration tests go through this
//! crate: profile management, plant lifecycle (registers, tick loop and
//! Modbus server) and console-side queries.

pub mod error;
pub mod plant_service;
pub mod profile_service;
pub mod query;

// Re-export key types for convenience
pub use error::{AppError, AppResult};
pub use plant_service::{PlantOptions, PlantService, ShutdownReport, run_until_ctrl_c};
pub use profile_service::{
    ProfileSummary, builtin_profile, list_profiles, load_profile, profile_yaml, resolve_profile,
    save_profile,
};
pub use query::{
    RegisterEntry, dump_json, format_status, parse_address, parse_value, read_status,
    register_dump, status_json,
};
