//! MBAP framing.
//!
//! ```text
//! +----------------+-------------+--------+---------+-----------+
//! | transaction id | protocol id | length | unit id |    PDU    |
//! |      u16       |     u16     |  u16   |   u8    | len - 1 B |
//! +----------------+-------------+--------+---------+-----------+
//! ```
//!
//! All fields are big-endian. `length` counts the unit id plus the PDU.

use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ModbusError, ModbusResult};
use crate::pdu::MAX_PDU_LEN;

pub const MBAP_HEADER_LEN: usize = 7;
/// Protocol id of Modbus; anything else is not for us.
pub const MODBUS_PROTOCOL_ID: u16 = 0;

const MIN_LENGTH: u16 = 2;
const MAX_LENGTH: u16 = MAX_PDU_LEN as u16 + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbapHeader {
    pub transaction_id: u16,
    pub protocol_id: u16,
    pub length: u16,
    pub unit_id: u8,
}

impl MbapHeader {
    /// Parse and validate a header.
    ///
    /// A length outside `2..=254` means the stream cannot be resynchronised.
    pub fn decode(bytes: &[u8; MBAP_HEADER_LEN]) -> ModbusResult<Self> {
        let header = Self {
            transaction_id: u16::from_be_bytes([bytes[0], bytes[1]]),
            protocol_id: u16::from_be_bytes([bytes[2], bytes[3]]),
            length: u16::from_be_bytes([bytes[4], bytes[5]]),
            unit_id: bytes[6],
        };
        if !(MIN_LENGTH..=MAX_LENGTH).contains(&header.length) {
            return Err(ModbusError::Frame(format!(
                "MBAP length {} outside {MIN_LENGTH}..={MAX_LENGTH}",
                header.length
            )));
        }
        Ok(header)
    }

    pub fn pdu_len(&self) -> usize {
        usize::from(self.length) - 1
    }
}

/// One MBAP frame: header fields plus the PDU bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub transaction_id: u16,
    pub protocol_id: u16,
    pub unit_id: u8,
    pub pdu: Vec<u8>,
}

impl Frame {
    pub fn new(transaction_id: u16, unit_id: u8, pdu: Vec<u8>) -> Self {
        Self {
            transaction_id,
            protocol_id: MODBUS_PROTOCOL_ID,
            unit_id,
            pdu,
        }
    }

    /// A reply carrying this frame's transaction and unit id.
    pub fn reply(&self, pdu: Vec<u8>) -> Self {
        Self {
            transaction_id: self.transaction_id,
            protocol_id: self.protocol_id,
            unit_id: self.unit_id,
            pdu,
        }
    }

    pub fn encode(&self) -> ModbusResult<Vec<u8>> {
        if self.pdu.is_empty() || self.pdu.len() > MAX_PDU_LEN {
            return Err(ModbusError::Frame(format!(
                "PDU of {} bytes does not fit a frame",
                self.pdu.len()
            )));
        }
        let length = (self.pdu.len() + 1) as u16;
        let mut out = Vec::with_capacity(MBAP_HEADER_LEN + self.pdu.len());
        out.extend_from_slice(&self.transaction_id.to_be_bytes());
        out.extend_from_slice(&self.protocol_id.to_be_bytes());
        out.extend_from_slice(&length.to_be_bytes());
        out.push(self.unit_id);
        out.extend_from_slice(&self.pdu);
        Ok(out)
    }
}

/// Read one frame.
///
/// Returns `Ok(None)` when the peer closed the stream cleanly between
/// frames; a close in the middle of a frame is [`ModbusError::ConnectionClosed`].
pub async fn read_frame<R>(reader: &mut R) -> ModbusResult<Option<Frame>>
where
    R: AsyncRead + Unpin,
{
    let mut head = [0u8; MBAP_HEADER_LEN];

    // first byte separately so a clean close is not an error
    if reader.read(&mut head[..1]).await? == 0 {
        return Ok(None);
    }
    reader
        .read_exact(&mut head[1..])
        .await
        .map_err(eof_as_closed)?;

    let header = MbapHeader::decode(&head)?;
    let mut pdu = vec![0u8; header.pdu_len()];
    reader.read_exact(&mut pdu).await.map_err(eof_as_closed)?;

    Ok(Some(Frame {
        transaction_id: header.transaction_id,
        protocol_id: header.protocol_id,
        unit_id: header.unit_id,
        pdu,
    }))
}

pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> ModbusResult<()>
where
    W: AsyncWrite + Unpin,
{
    let bytes = frame.encode()?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

fn eof_as_closed(e: std::io::Error) -> ModbusError {
    if e.kind() == ErrorKind::UnexpectedEof {
        ModbusError::ConnectionClosed
    } else {
        ModbusError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_length_bounds() {
        let mut bytes = [0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01];
        assert_eq!(MbapHeader::decode(&bytes).unwrap().pdu_len(), 5);

        bytes[5] = 1;
        assert!(matches!(MbapHeader::decode(&bytes), Err(ModbusError::Frame(_))));
        bytes[4] = 0x01;
        bytes[5] = 0x00;
        assert!(MbapHeader::decode(&bytes).is_err());
    }

    #[test]
    fn encode_layout() {
        let frame = Frame::new(0x1234, 0xFF, vec![0x03, 0x00, 0x01, 0x00, 0x02]);
        assert_eq!(
            frame.encode().unwrap(),
            vec![0x12, 0x34, 0x00, 0x00, 0x00, 0x06, 0xFF, 0x03, 0x00, 0x01, 0x00, 0x02]
        );
        assert!(Frame::new(1, 1, vec![]).encode().is_err());
        assert!(Frame::new(1, 1, vec![0; 254]).encode().is_err());
    }

    #[tokio::test]
    async fn reads_back_to_back_frames() {
        let a = Frame::new(1, 1, vec![0x03, 0x00, 0x00, 0x00, 0x01]);
        let b = Frame::new(2, 9, vec![0x06, 0x00, 0x02, 0x00, 0x07]);
        let mut bytes = a.encode().unwrap();
        bytes.extend(b.encode().unwrap());

        let mut reader = bytes.as_slice();
        assert_eq!(read_frame(&mut reader).await.unwrap(), Some(a));
        assert_eq!(read_frame(&mut reader).await.unwrap(), Some(b));
        assert_eq!(read_frame(&mut reader).await.unwrap(), None);
    }

    #[tokio::test]
    async fn truncated_frame_is_closed_connection() {
        let bytes = Frame::new(1, 1, vec![0x03, 0x00, 0x00, 0x00, 0x01])
            .encode()
            .unwrap();
        let mut reader = &bytes[..9];
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(ModbusError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn write_then_read() {
        let frame = Frame::new(7, 0, vec![0x2B, 0x0E, 0x01, 0x00]);
        let mut buf = Vec::new();
        write_frame(&mut buf, &frame).await.unwrap();
        let mut reader = buf.as_slice();
        assert_eq!(read_frame(&mut reader).await.unwrap(), Some(frame));
    }
}
