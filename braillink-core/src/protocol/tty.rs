//! TTY ownership requests.
//!
//! ```text
//! Client ──[EnterTtyMode]──► Service
//!   Payload: u32 count | u32 tty × count | u8 len | driver name
//!
//! Client ──[LeaveTtyMode]──► Service
//!   Payload: empty
//! ```
//!
//! An empty tty list asks for whatever terminal the service shows.
//! An empty driver name selects the service's own key table.

use bytes::BufMut;

use crate::error::BrlError;
use crate::message::PacketType;
use crate::packet::Packet;
use crate::state::TtySlot;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnterTtyRequest {
    /// Path of nested terminals, outermost first.
    pub ttys: Vec<u32>,
    /// Driver whose raw key codes the client wants; empty for commands.
    pub driver: String,
}

impl EnterTtyRequest {
    pub fn for_slot(slot: TtySlot) -> Self {
        let ttys = match slot {
            TtySlot::Number(n) => vec![n],
            TtySlot::Foreground => Vec::new(),
        };
        Self {
            ttys,
            driver: String::new(),
        }
    }

    /// The slot this request names.
    pub fn slot(&self) -> TtySlot {
        TtySlot::from(self.ttys.last().copied())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, BrlError> {
        let driver_len = u8::try_from(self.driver.len())
            .map_err(|_| BrlError::ProtocolViolation("driver name longer than 255 bytes"))?;
        let mut payload = Vec::with_capacity(5 + self.ttys.len() * 4 + self.driver.len());
        payload.put_u32(self.ttys.len() as u32);
        for tty in &self.ttys {
            payload.put_u32(*tty);
        }
        payload.put_u8(driver_len);
        payload.extend_from_slice(self.driver.as_bytes());
        Ok(payload)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BrlError> {
        let mut reader = crate::packet::PayloadReader::new(bytes);
        let count = reader.u32()? as usize;
        if count > reader.remaining() / 4 {
            return Err(BrlError::InvalidPacketLength {
                expected: 4 + count * 4,
                actual: bytes.len(),
            });
        }
        let ttys = (0..count)
            .map(|_| reader.u32())
            .collect::<Result<Vec<_>, _>>()?;
        let len = reader.u8()? as usize;
        let driver = String::from_utf8(reader.bytes(len)?.to_vec())?;
        reader.finish()?;
        Ok(Self { ttys, driver })
    }

    pub fn into_packet(self) -> Result<Packet, BrlError> {
        Packet::new(PacketType::EnterTtyMode, self.to_bytes()?)
    }
}

pub fn leave_tty_packet() -> Packet {
    Packet::empty(PacketType::LeaveTtyMode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_slot_layout() {
        let bytes = EnterTtyRequest::for_slot(TtySlot::Number(3))
            .to_bytes()
            .unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 1, 0, 0, 0, 3, 0]);
    }

    #[test]
    fn foreground_slot_sends_empty_path() {
        let request = EnterTtyRequest::for_slot(TtySlot::Foreground);
        assert_eq!(request.to_bytes().unwrap(), vec![0, 0, 0, 0, 0]);
        assert_eq!(request.slot(), TtySlot::Foreground);
    }

    #[test]
    fn decode_with_driver_name() {
        let request = EnterTtyRequest {
            ttys: vec![1, 7],
            driver: "vo".into(),
        };
        let decoded = EnterTtyRequest::from_bytes(&request.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, request);
        assert_eq!(decoded.slot(), TtySlot::Number(7));
    }

    #[test]
    fn absurd_count_is_rejected() {
        let bytes = [0xFF, 0xFF, 0xFF, 0xFF, 0];
        assert!(matches!(
            EnterTtyRequest::from_bytes(&bytes),
            Err(BrlError::InvalidPacketLength { .. })
        ));
    }
}
