//! Register client.
//!
//! A minimal Modbus/TCP master for the CLI and for tests. One request in
//! flight at a time; reconnecting after a failure is the caller's business.

use std::time::Duration;

use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::timeout;
use tracing::debug;

use crate::config::{DeviceIdentity, object_id};
use crate::error::{ModbusError, ModbusResult};
use crate::frame::{Frame, read_frame, write_frame};
use crate::pdu::{
    MAX_READ_QUANTITY, MAX_WRITE_QUANTITY, ReadDeviceIdCode, Request, Response,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct RegisterClient {
    stream: TcpStream,
    unit_id: u8,
    transaction: u16,
    timeout: Duration,
}

impl RegisterClient {
    pub async fn connect(addr: impl ToSocketAddrs) -> ModbusResult<Self> {
        let stream = timeout(DEFAULT_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| ModbusError::Timeout)??;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            unit_id: 1,
            transaction: 0,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_unit_id(mut self, unit_id: u8) -> Self {
        self.unit_id = unit_id;
        self
    }

    /// Per-request response timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn read_holding(&mut self, start: u16, quantity: u16) -> ModbusResult<Vec<u16>> {
        if !(1..=MAX_READ_QUANTITY).contains(&quantity) {
            return Err(ModbusError::InvalidArg {
                what: "read quantity must be within 1..=125",
            });
        }
        match self.call(&Request::ReadHolding { start, quantity }).await? {
            Response::ReadHolding { values } if values.len() == usize::from(quantity) => {
                Ok(values)
            }
            other => Err(unexpected(&other)),
        }
    }

    pub async fn write_single(&mut self, address: u16, value: u16) -> ModbusResult<()> {
        match self.call(&Request::WriteSingle { address, value }).await? {
            Response::WriteSingle { .. } => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn write_multiple(&mut self, start: u16, values: &[u16]) -> ModbusResult<()> {
        if values.is_empty() || values.len() > usize::from(MAX_WRITE_QUANTITY) {
            return Err(ModbusError::InvalidArg {
                what: "write quantity must be within 1..=123",
            });
        }
        let request = Request::WriteMultiple {
            start,
            values: values.to_vec(),
        };
        match self.call(&request).await? {
            Response::WriteMultiple { .. } => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    /// Read the regular identification objects, following continuation
    /// responses.
    pub async fn read_device_id(&mut self) -> ModbusResult<DeviceIdentity> {
        let mut objects = Vec::new();
        let mut next = object_id::VENDOR_NAME;
        loop {
            let request = Request::ReadDeviceId {
                code: ReadDeviceIdCode::Regular,
                object_id: next,
            };
            let body = match self.call(&request).await? {
                Response::ReadDeviceId(body) => body,
                other => return Err(unexpected(&other)),
            };
            objects.extend(body.objects);
            if !body.more_follows {
                break;
            }
            if body.next_object_id <= next {
                return Err(ModbusError::Pdu(
                    "identification stream did not advance".to_string(),
                ));
            }
            next = body.next_object_id;
        }
        DeviceIdentity::from_objects(objects.iter().map(|(id, v)| (*id, v.as_slice())))
    }

    /// Send one request and wait for its response.
    ///
    /// Exception responses come back as [`ModbusError::Exception`].
    pub async fn call(&mut self, request: &Request) -> ModbusResult<Response> {
        self.transaction = self.transaction.wrapping_add(1);
        let frame = Frame::new(self.transaction, self.unit_id, request.encode());
        let reply = timeout(self.timeout, self.round_trip(&frame))
            .await
            .map_err(|_| ModbusError::Timeout)??;

        if reply.transaction_id != frame.transaction_id {
            return Err(ModbusError::TransactionMismatch {
                expected: frame.transaction_id,
                got: reply.transaction_id,
            });
        }
        match Response::decode(request.function(), &reply.pdu)? {
            Response::Exception(e) => {
                debug!(function = e.function, code = ?e.code, "exception response");
                Err(ModbusError::Exception {
                    function: e.function,
                    code: e.code,
                })
            }
            response => Ok(response),
        }
    }

    async fn round_trip(&mut self, frame: &Frame) -> ModbusResult<Frame> {
        write_frame(&mut self.stream, frame).await?;
        read_frame(&mut self.stream)
            .await?
            .ok_or(ModbusError::ConnectionClosed)
    }
}

fn unexpected(response: &Response) -> ModbusError {
    ModbusError::Pdu(format!("unexpected response {response:?}"))
}
