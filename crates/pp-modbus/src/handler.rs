//! Request handling against the shared register bank.
//!
//! The handler never blocks on I/O: each request is one bank call, so the
//! bank lock is held only for the copy.

use std::sync::Arc;

use pp_core::{CoreError, RegisterBank};
use tracing::{debug, trace};

use crate::config::{DeviceIdentity, object_id};
use crate::pdu::{
    CONFORMITY_REGULAR, DeviceIdResponse, ENCAPSULATED_INTERFACE, Exception, ExceptionCode,
    MAX_PDU_LEN, ReadDeviceIdCode, Request, Response,
};

/// Longest object value sent; one object always fits a response.
const MAX_OBJECT_LEN: usize = MAX_PDU_LEN - 9;

/// Serves decoded requests. Cheap to clone; one per connection.
#[derive(Debug, Clone)]
pub struct RequestHandler {
    bank: Arc<RegisterBank>,
    identity: Arc<DeviceIdentity>,
}

impl RequestHandler {
    pub fn new(bank: Arc<RegisterBank>, identity: DeviceIdentity) -> Self {
        Self {
            bank,
            identity: Arc::new(identity),
        }
    }

    pub fn bank(&self) -> &RegisterBank {
        &self.bank
    }

    /// Decode a request PDU, apply it and encode the reply.
    pub fn handle_pdu(&self, pdu: &[u8]) -> Vec<u8> {
        let response = match Request::decode(pdu) {
            Ok(request) => self.handle(&request),
            Err(exception) => {
                debug!(
                    function = exception.function,
                    code = ?exception.code,
                    "rejecting malformed request"
                );
                Response::Exception(exception)
            }
        };
        response.encode()
    }

    pub fn handle(&self, request: &Request) -> Response {
        let function = request.function();
        let result = match request {
            Request::ReadHolding { start, quantity } => self
                .bank
                .read_range(*start, usize::from(*quantity))
                .map(|values| Response::ReadHolding { values }),
            Request::WriteSingle { address, value } => {
                self.bank.set(*address, *value).map(|()| {
                    trace!(address, value, "register written");
                    Response::WriteSingle {
                        address: *address,
                        value: *value,
                    }
                })
            }
            Request::WriteMultiple { start, values } => {
                self.bank.write_range(*start, values).map(|()| {
                    trace!(start, count = values.len(), "registers written");
                    Response::WriteMultiple {
                        start: *start,
                        quantity: values.len() as u16,
                    }
                })
            }
            Request::ReadDeviceId { code, object_id } => {
                return self.device_id(*code, *object_id);
            }
        };

        result.unwrap_or_else(|e| {
            debug!(function, error = %e, "request refused");
            Response::Exception(Exception::new(function, exception_for(&e)))
        })
    }

    fn device_id(&self, code: ReadDeviceIdCode, first: u8) -> Response {
        let value = |id: u8| {
            self.identity.object(id).map(|v| {
                let bytes = v.as_bytes();
                bytes[..bytes.len().min(MAX_OBJECT_LEN)].to_vec()
            })
        };

        if code == ReadDeviceIdCode::Specific {
            return match value(first) {
                Some(v) => Response::ReadDeviceId(DeviceIdResponse {
                    code,
                    conformity: CONFORMITY_REGULAR,
                    more_follows: false,
                    next_object_id: 0,
                    objects: vec![(first, v)],
                }),
                None => Response::Exception(Exception::new(
                    ENCAPSULATED_INTERFACE,
                    ExceptionCode::IllegalDataAddress,
                )),
            };
        }

        // no extended objects: extended streams the regular category
        let last = match code {
            ReadDeviceIdCode::Basic => object_id::LAST_BASIC,
            _ => object_id::LAST,
        };
        // an id outside the category restarts the stream
        let first = if first <= last { first } else { 0 };

        let mut body = DeviceIdResponse {
            code,
            conformity: CONFORMITY_REGULAR,
            more_follows: false,
            next_object_id: 0,
            objects: Vec::new(),
        };
        let mut len = 7;
        for id in first..=last {
            let Some(v) = value(id) else { continue };
            if len + 2 + v.len() > MAX_PDU_LEN {
                body.more_follows = true;
                body.next_object_id = id;
                break;
            }
            len += 2 + v.len();
            body.objects.push((id, v));
        }
        Response::ReadDeviceId(body)
    }
}

fn exception_for(e: &CoreError) -> ExceptionCode {
    match e {
        CoreError::AddressOutOfRange { .. } | CoreError::RangeOutOfBounds { .. } => {
            ExceptionCode::IllegalDataAddress
        }
        CoreError::InvalidArg { .. } => ExceptionCode::IllegalDataValue,
    }
}
