//! Error types for the Modbus/TCP server and client.

use std::io;

use thiserror::Error;

use crate::pdu::ExceptionCode;

pub type ModbusResult<T> = Result<T, ModbusError>;

#[derive(Debug, Error)]
pub enum ModbusError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("Connection closed")]
    ConnectionClosed,

    /// The byte stream cannot be resynchronised.
    #[error("Malformed frame: {0}")]
    Frame(String),

    #[error("Malformed PDU: {0}")]
    Pdu(String),

    #[error("Server answered function 0x{function:02x} with exception {code:?}")]
    Exception { function: u8, code: ExceptionCode },

    #[error("Response transaction {got} does not match request {expected}")]
    TransactionMismatch { expected: u16, got: u16 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Operation timed out")]
    Timeout,
}

impl ModbusError {
    /// The exception code, if the server answered with one.
    pub fn exception(&self) -> Option<ExceptionCode> {
        match self {
            ModbusError::Exception { code, .. } => Some(*code),
            _ => None,
        }
    }
}
