//! Server configuration and device identity.

use serde::{Deserialize, Serialize};

use crate::error::{ModbusError, ModbusResult};

/// Port the plant listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 5020;

/// Configuration for a [`crate::ProtocolServer`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind, e.g. `0.0.0.0` or `127.0.0.1`.
    pub bind: String,
    pub port: u16,
    /// Answered on Read Device Identification.
    pub identity: DeviceIdentity,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("127.0.0.1")
    }
}

impl ServerConfig {
    pub fn new(bind: impl Into<String>) -> Self {
        Self {
            bind: bind.into(),
            port: DEFAULT_PORT,
            identity: DeviceIdentity::default(),
        }
    }

    /// Set the listening port. Port 0 lets the OS pick one.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_identity(mut self, identity: DeviceIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// `bind:port`, bracketing IPv6 literals.
    pub fn listen_addr(&self) -> String {
        if self.bind.contains(':') && !self.bind.starts_with('[') {
            format!("[{}]:{}", self.bind, self.port)
        } else {
            format!("{}:{}", self.bind, self.port)
        }
    }
}

/// Object ids of Read Device Identification (basic and regular categories).
pub mod object_id {
    pub const VENDOR_NAME: u8 = 0x00;
    pub const PRODUCT_CODE: u8 = 0x01;
    pub const REVISION: u8 = 0x02;
    pub const VENDOR_URL: u8 = 0x03;
    pub const PRODUCT_NAME: u8 = 0x04;
    pub const MODEL_NAME: u8 = 0x05;

    /// Last object of the basic category.
    pub const LAST_BASIC: u8 = REVISION;
    /// Last object this device implements.
    pub const LAST: u8 = MODEL_NAME;
}

/// What the plant claims to be when asked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub vendor_name: String,
    pub product_code: String,
    pub revision: String,
    pub vendor_url: String,
    pub product_name: String,
    pub model_name: String,
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            vendor_name: "Simmons Oil Refining Platform".to_string(),
            product_code: "SORP".to_string(),
            revision: "2.09.01".to_string(),
            vendor_url: "http://simmons.com/markets/oil-gas/pages/refining-industry.html"
                .to_string(),
            product_name: "SORP 3850".to_string(),
            model_name: "Simmons ORP 3850".to_string(),
        }
    }
}

impl DeviceIdentity {
    /// Value of one identification object.
    pub fn object(&self, id: u8) -> Option<&str> {
        let value = match id {
            object_id::VENDOR_NAME => &self.vendor_name,
            object_id::PRODUCT_CODE => &self.product_code,
            object_id::REVISION => &self.revision,
            object_id::VENDOR_URL => &self.vendor_url,
            object_id::PRODUCT_NAME => &self.product_name,
            object_id::MODEL_NAME => &self.model_name,
            _ => return None,
        };
        Some(value.as_str())
    }

    /// Rebuild an identity from `(object id, value)` pairs.
    ///
    /// Missing objects stay empty; unknown ids are ignored. Values must be
    /// UTF-8.
    pub fn from_objects<'a>(
        objects: impl IntoIterator<Item = (u8, &'a [u8])>,
    ) -> ModbusResult<Self> {
        let mut identity = DeviceIdentity {
            vendor_name: String::new(),
            product_code: String::new(),
            revision: String::new(),
            vendor_url: String::new(),
            product_name: String::new(),
            model_name: String::new(),
        };
        for (id, raw) in objects {
            let value = String::from_utf8(raw.to_vec())
                .map_err(|e| ModbusError::Pdu(format!("object 0x{id:02x}: {e}")))?;
            let slot = match id {
                object_id::VENDOR_NAME => &mut identity.vendor_name,
                object_id::PRODUCT_CODE => &mut identity.product_code,
                object_id::REVISION => &mut identity.revision,
                object_id::VENDOR_URL => &mut identity.vendor_url,
                object_id::PRODUCT_NAME => &mut identity.product_name,
                object_id::MODEL_NAME => &mut identity.model_name,
                _ => continue,
            };
            *slot = value;
        }
        Ok(identity)
    }
}
