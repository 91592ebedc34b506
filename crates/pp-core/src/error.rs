use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Register address out of range: {address} (bank size {size})")]
    AddressOutOfRange { address: u16, size: usize },

    #[error("Register range out of bounds: start={start}, count={count} (bank size {size})")]
    RangeOutOfBounds { start: u16, count: usize, size: usize },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}
