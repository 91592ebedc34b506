//! Error types for control primitives.

use thiserror::Error;

/// Result type for control operations.
pub type ControlResult<T> = Result<T, ControlError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid argument provided to a control constructor.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Value outside the range a control accepts.
    #[error("{what} out of range: {value}")]
    OutOfRange { what: &'static str, value: i64 },
}
