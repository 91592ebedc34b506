//! Modbus protocol data units.
//!
//! Only the holding-register subset the plant needs is understood:
//!
//! | code | request |
//! |---|---|
//! | `0x03` | Read Holding Registers |
//! | `0x06` | Write Single Register |
//! | `0x10` | Write Multiple Registers |
//! | `0x2B / 0x0E` | Read Device Identification |
//!
//! Requests decode into [`Request`] or into the [`Exception`] the server must
//! answer with. Responses decode on the client side only.

use crate::error::{ModbusError, ModbusResult};

pub const READ_HOLDING_REGISTERS: u8 = 0x03;
pub const WRITE_SINGLE_REGISTER: u8 = 0x06;
pub const WRITE_MULTIPLE_REGISTERS: u8 = 0x10;
pub const ENCAPSULATED_INTERFACE: u8 = 0x2B;
/// MEI type of Read Device Identification.
pub const MEI_DEVICE_ID: u8 = 0x0E;

/// Set on the function code of an exception response.
pub const EXCEPTION_FLAG: u8 = 0x80;

pub const MAX_READ_QUANTITY: u16 = 125;
pub const MAX_WRITE_QUANTITY: u16 = 123;
/// Largest PDU that fits an MBAP frame.
pub const MAX_PDU_LEN: usize = 253;

/// Conformity level reported for device identification: regular category,
/// stream and individual access.
pub const CONFORMITY_REGULAR: u8 = 0x82;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionCode {
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    ServerDeviceFailure,
    /// Any code this crate does not name.
    Other(u8),
}

impl ExceptionCode {
    pub fn code(self) -> u8 {
        match self {
            ExceptionCode::IllegalFunction => 0x01,
            ExceptionCode::IllegalDataAddress => 0x02,
            ExceptionCode::IllegalDataValue => 0x03,
            ExceptionCode::ServerDeviceFailure => 0x04,
            ExceptionCode::Other(c) => c,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            0x01 => ExceptionCode::IllegalFunction,
            0x02 => ExceptionCode::IllegalDataAddress,
            0x03 => ExceptionCode::IllegalDataValue,
            0x04 => ExceptionCode::ServerDeviceFailure,
            c => ExceptionCode::Other(c),
        }
    }
}

/// An exception response: the request's function code and why it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exception {
    pub function: u8,
    pub code: ExceptionCode,
}

impl Exception {
    pub fn new(function: u8, code: ExceptionCode) -> Self {
        Self { function, code }
    }
}

/// Which block of identification objects to stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadDeviceIdCode {
    Basic,
    Regular,
    Extended,
    /// One specific object.
    Specific,
}

impl ReadDeviceIdCode {
    pub fn code(self) -> u8 {
        match self {
            ReadDeviceIdCode::Basic => 0x01,
            ReadDeviceIdCode::Regular => 0x02,
            ReadDeviceIdCode::Extended => 0x03,
            ReadDeviceIdCode::Specific => 0x04,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(ReadDeviceIdCode::Basic),
            0x02 => Some(ReadDeviceIdCode::Regular),
            0x03 => Some(ReadDeviceIdCode::Extended),
            0x04 => Some(ReadDeviceIdCode::Specific),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    ReadHolding { start: u16, quantity: u16 },
    WriteSingle { address: u16, value: u16 },
    WriteMultiple { start: u16, values: Vec<u16> },
    ReadDeviceId { code: ReadDeviceIdCode, object_id: u8 },
}

fn be16(bytes: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([bytes[at], bytes[at + 1]])
}

impl Request {
    pub fn function(&self) -> u8 {
        match self {
            Request::ReadHolding { .. } => READ_HOLDING_REGISTERS,
            Request::WriteSingle { .. } => WRITE_SINGLE_REGISTER,
            Request::WriteMultiple { .. } => WRITE_MULTIPLE_REGISTERS,
            Request::ReadDeviceId { .. } => ENCAPSULATED_INTERFACE,
        }
    }

    /// Parse a request PDU.
    ///
    /// The error is the exception the server should answer with.
    pub fn decode(pdu: &[u8]) -> Result<Self, Exception> {
        let Some(&function) = pdu.first() else {
            return Err(Exception::new(0, ExceptionCode::IllegalFunction));
        };
        let value_err = Exception::new(function, ExceptionCode::IllegalDataValue);

        match function {
            READ_HOLDING_REGISTERS => {
                if pdu.len() != 5 {
                    return Err(value_err);
                }
                let quantity = be16(pdu, 3);
                if !(1..=MAX_READ_QUANTITY).contains(&quantity) {
                    return Err(value_err);
                }
                Ok(Request::ReadHolding {
                    start: be16(pdu, 1),
                    quantity,
                })
            }
            WRITE_SINGLE_REGISTER => {
                if pdu.len() != 5 {
                    return Err(value_err);
                }
                Ok(Request::WriteSingle {
                    address: be16(pdu, 1),
                    value: be16(pdu, 3),
                })
            }
            WRITE_MULTIPLE_REGISTERS => {
                if pdu.len() < 6 {
                    return Err(value_err);
                }
                let quantity = be16(pdu, 3);
                let byte_count = usize::from(pdu[5]);
                if !(1..=MAX_WRITE_QUANTITY).contains(&quantity)
                    || byte_count != 2 * usize::from(quantity)
                    || pdu.len() != 6 + byte_count
                {
                    return Err(value_err);
                }
                let values = pdu[6..].chunks_exact(2).map(|c| be16(c, 0)).collect();
                Ok(Request::WriteMultiple {
                    start: be16(pdu, 1),
                    values,
                })
            }
            ENCAPSULATED_INTERFACE => {
                if pdu.get(1) != Some(&MEI_DEVICE_ID) {
                    return Err(Exception::new(function, ExceptionCode::IllegalFunction));
                }
                if pdu.len() != 4 {
                    return Err(value_err);
                }
                let code = ReadDeviceIdCode::from_code(pdu[2]).ok_or(value_err)?;
                Ok(Request::ReadDeviceId {
                    code,
                    object_id: pdu[3],
                })
            }
            _ => Err(Exception::new(function, ExceptionCode::IllegalFunction)),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![self.function()];
        match self {
            Request::ReadHolding { start, quantity } => {
                out.extend_from_slice(&start.to_be_bytes());
                out.extend_from_slice(&quantity.to_be_bytes());
            }
            Request::WriteSingle { address, value } => {
                out.extend_from_slice(&address.to_be_bytes());
                out.extend_from_slice(&value.to_be_bytes());
            }
            Request::WriteMultiple { start, values } => {
                out.extend_from_slice(&start.to_be_bytes());
                out.extend_from_slice(&(values.len() as u16).to_be_bytes());
                out.push((values.len() * 2) as u8);
                for v in values {
                    out.extend_from_slice(&v.to_be_bytes());
                }
            }
            Request::ReadDeviceId { code, object_id } => {
                out.extend_from_slice(&[MEI_DEVICE_ID, code.code(), *object_id]);
            }
        }
        out
    }
}

/// Body of a Read Device Identification response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdResponse {
    pub code: ReadDeviceIdCode,
    pub conformity: u8,
    /// More objects are available; ask again from `next_object_id`.
    pub more_follows: bool,
    pub next_object_id: u8,
    pub objects: Vec<(u8, Vec<u8>)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    ReadHolding { values: Vec<u16> },
    WriteSingle { address: u16, value: u16 },
    WriteMultiple { start: u16, quantity: u16 },
    ReadDeviceId(DeviceIdResponse),
    Exception(Exception),
}

impl Response {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Response::ReadHolding { values } => {
                let mut out = Vec::with_capacity(2 + values.len() * 2);
                out.push(READ_HOLDING_REGISTERS);
                out.push((values.len() * 2) as u8);
                for v in values {
                    out.extend_from_slice(&v.to_be_bytes());
                }
                out
            }
            Response::WriteSingle { address, value } => {
                let mut out = vec![WRITE_SINGLE_REGISTER];
                out.extend_from_slice(&address.to_be_bytes());
                out.extend_from_slice(&value.to_be_bytes());
                out
            }
            Response::WriteMultiple { start, quantity } => {
                let mut out = vec![WRITE_MULTIPLE_REGISTERS];
                out.extend_from_slice(&start.to_be_bytes());
                out.extend_from_slice(&quantity.to_be_bytes());
                out
            }
            Response::ReadDeviceId(body) => {
                let mut out = vec![
                    ENCAPSULATED_INTERFACE,
                    MEI_DEVICE_ID,
                    body.code.code(),
                    body.conformity,
                    if body.more_follows { 0xFF } else { 0x00 },
                    body.next_object_id,
                    body.objects.len() as u8,
                ];
                for (id, value) in &body.objects {
                    out.push(*id);
                    out.push(value.len() as u8);
                    out.extend_from_slice(value);
                }
                out
            }
            Response::Exception(e) => vec![e.function | EXCEPTION_FLAG, e.code.code()],
        }
    }

    /// Parse a response PDU received for a request with `function`.
    pub fn decode(function: u8, pdu: &[u8]) -> ModbusResult<Self> {
        let short = || ModbusError::Pdu(format!("truncated response to 0x{function:02x}"));
        let &got = pdu.first().ok_or_else(short)?;

        if got == function | EXCEPTION_FLAG {
            let &code = pdu.get(1).ok_or_else(short)?;
            return Ok(Response::Exception(Exception::new(
                function,
                ExceptionCode::from_code(code),
            )));
        }
        if got != function {
            return Err(ModbusError::Pdu(format!(
                "expected function 0x{function:02x}, got 0x{got:02x}"
            )));
        }

        match function {
            READ_HOLDING_REGISTERS => {
                let &count = pdu.get(1).ok_or_else(short)?;
                let count = usize::from(count);
                if count % 2 != 0 || pdu.len() != 2 + count {
                    return Err(short());
                }
                let values = pdu[2..].chunks_exact(2).map(|c| be16(c, 0)).collect();
                Ok(Response::ReadHolding { values })
            }
            WRITE_SINGLE_REGISTER | WRITE_MULTIPLE_REGISTERS => {
                if pdu.len() != 5 {
                    return Err(short());
                }
                let (a, b) = (be16(pdu, 1), be16(pdu, 3));
                Ok(if function == WRITE_SINGLE_REGISTER {
                    Response::WriteSingle {
                        address: a,
                        value: b,
                    }
                } else {
                    Response::WriteMultiple {
                        start: a,
                        quantity: b,
                    }
                })
            }
            ENCAPSULATED_INTERFACE => decode_device_id(pdu).ok_or_else(short),
            _ => Err(ModbusError::Pdu(format!(
                "unsupported function 0x{function:02x}"
            ))),
        }
    }
}

fn decode_device_id(pdu: &[u8]) -> Option<Response> {
    if pdu.len() < 7 || pdu[1] != MEI_DEVICE_ID {
        return None;
    }
    let code = ReadDeviceIdCode::from_code(pdu[2])?;
    let mut objects = Vec::with_capacity(usize::from(pdu[6]));
    let mut rest = &pdu[7..];
    for _ in 0..pdu[6] {
        let (&id, tail) = rest.split_first()?;
        let (&len, tail) = tail.split_first()?;
        let len = usize::from(len);
        if tail.len() < len {
            return None;
        }
        objects.push((id, tail[..len].to_vec()));
        rest = &tail[len..];
    }
    rest.is_empty().then_some(Response::ReadDeviceId(DeviceIdResponse {
        code,
        conformity: pdu[3],
        more_follows: pdu[4] == 0xFF,
        next_object_id: pdu[5],
        objects,
    }))
}
