use std::fmt::Debug;

use bytes::{Buf, BufMut};

use crate::error::BrlError;
use crate::header::{FrameHeader, HEADER_SIZE};
use crate::message::{PacketType, ServiceErrorCode};

/// Largest payload a single frame may carry.
pub const MAX_PAYLOAD_SIZE: usize = 512;
/// Largest complete frame, header included.
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE;

/// Protocol version spoken by this client.
pub const PROTOCOL_VERSION: u32 = 8;

#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    packet_type: PacketType,
    payload: Vec<u8>,
}

impl Packet {
    pub fn new(packet_type: PacketType, payload: Vec<u8>) -> Result<Self, BrlError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(BrlError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        Ok(Self {
            packet_type,
            payload,
        })
    }

    /// A packet with no payload.
    pub fn empty(packet_type: PacketType) -> Self {
        Self {
            packet_type,
            payload: Vec::new(),
        }
    }

    pub fn ack() -> Self {
        Self::empty(PacketType::Ack)
    }

    pub fn version(version: u32) -> Self {
        Self {
            packet_type: PacketType::Version,
            payload: version.to_be_bytes().to_vec(),
        }
    }

    pub fn error(code: ServiceErrorCode) -> Self {
        Self {
            packet_type: PacketType::Error,
            payload: (code as u32).to_be_bytes().to_vec(),
        }
    }

    pub fn exception(code: ServiceErrorCode, request: PacketType) -> Self {
        let mut payload = Vec::with_capacity(8);
        payload.put_u32(code as u32);
        payload.put_u32(request as u32);
        Self {
            packet_type: PacketType::Exception,
            payload,
        }
    }

    pub fn key(code: u64) -> Self {
        Self {
            packet_type: PacketType::Key,
            payload: code.to_be_bytes().to_vec(),
        }
    }

    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn payload_length(&self) -> usize {
        self.payload.len()
    }

    /// Cursor over the payload for field-by-field decoding.
    pub fn reader(&self) -> PayloadReader<'_> {
        PayloadReader::new(&self.payload)
    }

    /// Decode the code of a `Key` packet.
    pub fn key_code(&self) -> Result<u64, BrlError> {
        self.expect_type(PacketType::Key)?;
        let mut reader = self.reader();
        let code = reader.u64()?;
        reader.finish()?;
        Ok(code)
    }

    /// Decode the code of an `Error` or `Exception` packet.
    ///
    /// Exceptions also name the request that failed.
    pub fn service_error(&self) -> Result<(ServiceErrorCode, Option<PacketType>), BrlError> {
        let mut reader = self.reader();
        match self.packet_type {
            PacketType::Error => {
                let code = ServiceErrorCode::try_from(reader.u32()?)?;
                Ok((code, None))
            }
            PacketType::Exception => {
                let code = ServiceErrorCode::try_from(reader.u32()?)?;
                let request = PacketType::try_from(reader.u32()?).ok();
                Ok((code, request))
            }
            _ => Err(BrlError::ProtocolViolation("not an error packet")),
        }
    }

    pub fn expect_type(&self, expected: PacketType) -> Result<(), BrlError> {
        if self.packet_type != expected {
            return Err(BrlError::ProtocolViolation("unexpected packet type"));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, BrlError> {
        // In case it got tampered with
        if self.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(BrlError::PayloadTooLarge {
                size: self.payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let header = FrameHeader::new(self.packet_type as u32, self.payload.len() as u32);
        let mut frame = header.to_bytes().to_vec();
        frame.extend_from_slice(&self.payload);
        Ok(frame)
    }

    pub fn from_frame(header: FrameHeader, payload: Vec<u8>) -> Result<Self, BrlError> {
        if payload.len() != header.payload_length() {
            return Err(BrlError::InvalidPacketLength {
                expected: header.payload_length(),
                actual: payload.len(),
            });
        }
        let packet_type = PacketType::try_from(header.packet_type())?;
        Self::new(packet_type, payload)
    }
}

impl Debug for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packet")
            .field("type", &self.packet_type)
            .field("payload", &self.payload)
            .finish()
    }
}

// ── PayloadReader ────────────────────────────────────────────────

/// Bounds-checked big-endian reader over a packet payload.
pub struct PayloadReader<'a> {
    buf: &'a [u8],
    len: usize,
}

impl<'a> PayloadReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            len: buf.len(),
            buf,
        }
    }

    fn need(&self, n: usize) -> Result<(), BrlError> {
        if self.buf.remaining() < n {
            return Err(BrlError::InvalidPacketLength {
                expected: self.len - self.buf.remaining() + n,
                actual: self.len,
            });
        }
        Ok(())
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn u8(&mut self) -> Result<u8, BrlError> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn u32(&mut self) -> Result<u32, BrlError> {
        self.need(4)?;
        Ok(self.buf.get_u32())
    }

    pub fn u64(&mut self) -> Result<u64, BrlError> {
        self.need(8)?;
        Ok(self.buf.get_u64())
    }

    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8], BrlError> {
        self.need(n)?;
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    /// Fails if unread bytes remain.
    pub fn finish(&self) -> Result<(), BrlError> {
        if !self.buf.is_empty() {
            return Err(BrlError::InvalidPacketLength {
                expected: self.len - self.buf.len(),
                actual: self.len,
            });
        }
        Ok(())
    }
}
