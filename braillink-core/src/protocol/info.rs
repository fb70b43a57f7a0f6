//! Connection-scoped queries.
//!
//! ```text
//! Client ──[GetDriverName]──► Service     (empty)
//! Service ──[GetDriverName]──► Client     driver name, optionally NUL-terminated
//!
//! Client ──[GetDisplaySize]──► Service    (empty)
//! Service ──[GetDisplaySize]──► Client    u32 columns | u32 rows
//! ```

use bytes::BufMut;

use crate::display::DisplaySize;
use crate::error::BrlError;
use crate::message::PacketType;
use crate::packet::Packet;

impl DisplaySize {
    pub fn to_packet(&self) -> Result<Packet, BrlError> {
        let mut payload = Vec::with_capacity(8);
        payload.put_u32(self.columns);
        payload.put_u32(self.rows);
        Packet::new(PacketType::GetDisplaySize, payload)
    }

    pub fn from_packet(packet: &Packet) -> Result<Self, BrlError> {
        packet.expect_type(PacketType::GetDisplaySize)?;
        let mut reader = packet.reader();
        let size = Self {
            columns: reader.u32()?,
            rows: reader.u32()?,
        };
        reader.finish()?;
        Ok(size)
    }
}

pub fn driver_name_packet(name: &str) -> Result<Packet, BrlError> {
    let mut payload = name.as_bytes().to_vec();
    payload.push(0);
    Packet::new(PacketType::GetDriverName, payload)
}

pub fn driver_name_from_packet(packet: &Packet) -> Result<String, BrlError> {
    packet.expect_type(PacketType::GetDriverName)?;
    let payload = packet.payload();
    let name = match payload.iter().position(|b| *b == 0) {
        Some(end) => &payload[..end],
        None => payload,
    };
    Ok(String::from_utf8(name.to_vec())?)
}
