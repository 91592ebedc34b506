//! Modbus/TCP access to the plant's register bank.
//!
//! - `frame`: MBAP header and async frame I/O
//! - `pdu`: request/response data units and exception codes
//! - `handler`: applies requests to a `RegisterBank`
//! - `server`: tokio accept loop, one task per connection
//! - `client`: minimal master used by the CLI and tests

pub mod client;
pub mod config;
pub mod error;
pub mod frame;
pub mod handler;
pub mod pdu;
pub mod server;

pub use client::RegisterClient;
pub use config::{DEFAULT_PORT, DeviceIdentity, ServerConfig};
pub use error::{ModbusError, ModbusResult};
pub use frame::{Frame, MbapHeader};
pub use handler::RequestHandler;
pub use pdu::{Exception, ExceptionCode, ReadDeviceIdCode, Request, Response};
pub use server::{ProtocolServer, ServerHandle};
