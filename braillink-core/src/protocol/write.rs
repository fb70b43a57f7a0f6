//! Display write encoding.
//!
//! ```text
//! Client ──[Write]──► Service
//!   u32 flags
//!   REGION   u32 start (1-based) | u32 len
//!   TEXT     u32 byte length | UTF-8 text
//!   OR_MASK  u8 × text cells
//!   CURSOR   u32 position (0 hides the cursor)
//!   CHARSET  u8 length | charset name
//! ```
//!
//! Sections appear in that order and only when their flag is set.
//! `HOLD` carries no data.

use bytes::BufMut;

use crate::display::{Cursor, DisplayWrite, Dots, Flush, Region};
use crate::error::{BrlError, ValidationError};
use crate::flags::WriteFlags;
use crate::message::PacketType;
use crate::packet::{MAX_PAYLOAD_SIZE, Packet, PayloadReader};

const CHARSET: &str = "UTF-8";

impl DisplayWrite {
    pub fn write_flags(&self) -> WriteFlags {
        let mut flags = WriteFlags::empty();
        if self.region.is_some() {
            flags |= WriteFlags::REGION;
        }
        if self.text.is_some() {
            flags |= WriteFlags::TEXT | WriteFlags::CHARSET;
        }
        if self.overlay.is_some() {
            flags |= WriteFlags::OR_MASK;
        }
        if self.cursor != Cursor::Leave {
            flags |= WriteFlags::CURSOR;
        }
        if self.flush == Flush::Hold {
            flags |= WriteFlags::HOLD;
        }
        flags
    }

    /// Encode the `Write` payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ValidationError> {
        let flags = self.write_flags();
        let mut payload = Vec::with_capacity(64);
        payload.put_u32(flags.bits());

        if let Some(region) = self.region {
            payload.put_u32(region.start);
            payload.put_u32(region.len);
        }
        if let Some(text) = &self.text {
            payload.put_u32(text.len() as u32);
            payload.extend_from_slice(text.as_bytes());
        }
        if let Some(mask) = &self.overlay {
            payload.extend(mask.iter().map(|dots| dots.bits()));
        }
        match self.cursor {
            Cursor::Leave => {}
            Cursor::Off => payload.put_u32(0),
            Cursor::At(position) => payload.put_u32(position),
        }
        if flags.contains(WriteFlags::CHARSET) {
            payload.put_u8(CHARSET.len() as u8);
            payload.extend_from_slice(CHARSET.as_bytes());
        }

        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ValidationError::RequestTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        Ok(payload)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BrlError> {
        let mut reader = PayloadReader::new(bytes);
        let flags = WriteFlags::from_bits(reader.u32()?)
            .ok_or(BrlError::ProtocolViolation("unknown write flags"))?;
        if flags.intersects(WriteFlags::DISPLAY_NUMBER | WriteFlags::AND_MASK) {
            return Err(BrlError::ProtocolViolation("unsupported write section"));
        }

        let mut write = DisplayWrite::default();
        if flags.contains(WriteFlags::REGION) {
            write.region = Some(Region::new(reader.u32()?, reader.u32()?));
        }
        if flags.contains(WriteFlags::TEXT) {
            let len = reader.u32()? as usize;
            write.text = Some(String::from_utf8(reader.bytes(len)?.to_vec())?);
        }
        if flags.contains(WriteFlags::OR_MASK) {
            let cells = write
                .text_cells()
                .ok_or(BrlError::ProtocolViolation("overlay mask without text"))?;
            let mask = reader.bytes(cells)?;
            write.overlay = Some(mask.iter().map(|b| Dots::from_bits_retain(*b)).collect());
        }
        if flags.contains(WriteFlags::CURSOR) {
            write.cursor = match reader.u32()? {
                0 => Cursor::Off,
                position => Cursor::At(position),
            };
        }
        if flags.contains(WriteFlags::CHARSET) {
            let len = reader.u8()? as usize;
            if reader.bytes(len)? != CHARSET.as_bytes() {
                return Err(BrlError::ProtocolViolation("unsupported charset"));
            }
        }
        if flags.contains(WriteFlags::HOLD) {
            write.flush = Flush::Hold;
        }
        reader.finish()?;
        Ok(write)
    }

    pub fn to_packet(&self) -> Result<Packet, BrlError> {
        Packet::new(PacketType::Write, self.to_bytes()?)
    }
}
