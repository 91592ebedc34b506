//! Error types for the pp-app service layer.

use std::path::PathBuf;

/// Application error type wrapping the errors of the backend crates, shared
/// by the CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Profile error: {0}")]
    Profile(String),

    #[error("Failed to read profile file: {path}")]
    ProfileFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write profile file: {path}")]
    ProfileFileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Register error: {0}")]
    Registers(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pp-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<pp_core::CoreError> for AppError {
    fn from(err: pp_core::CoreError) -> Self {
        AppError::Registers(err.to_string())
    }
}

impl From<pp_sim::SimError> for AppError {
    fn from(err: pp_sim::SimError) -> Self {
        match err {
            pp_sim::SimError::InvalidProfile { .. } => AppError::Profile(err.to_string()),
            other => AppError::Simulation(other.to_string()),
        }
    }
}

impl From<pp_modbus::ModbusError> for AppError {
    fn from(err: pp_modbus::ModbusError) -> Self {
        AppError::Protocol(err.to_string())
    }
}
