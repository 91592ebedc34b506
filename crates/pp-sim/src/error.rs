//! Error types for simulation operations.

use thiserror::Error;

/// Errors encountered while configuring or running the plant.
///
/// Register values never produce errors; they are clamped. These cover
/// configuration mistakes and infrastructure failures only.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Invalid profile '{profile}': {what}")]
    InvalidProfile { profile: String, what: String },

    #[error("Register bank error: {0}")]
    Registers(#[from] pp_core::CoreError),

    #[error("Control error: {0}")]
    Control(#[from] pp_controls::ControlError),

    #[error("Tick thread failed: {message}")]
    Runner { message: String },
}

pub type SimResult<T> = Result<T, SimError>;
