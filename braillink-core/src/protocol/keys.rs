//! Key range requests.
//!
//! ```text
//! Client ──[AcceptKeyRanges | IgnoreKeyRanges]──► Service
//!   Payload: (u64 first | u64 last) × n
//! ```
//!
//! The service applies ranges in arrival order; a later range overrides
//! an earlier one for the keys they share.

use bytes::BufMut;

use crate::error::BrlError;
use crate::filter::{Disposition, KeyRange, MAX_RANGES_PER_PACKET};
use crate::message::PacketType;
use crate::packet::{Packet, PayloadReader};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRangesRequest {
    pub disposition: Disposition,
    pub ranges: Vec<KeyRange>,
}

impl KeyRangesRequest {
    pub fn new(disposition: Disposition, ranges: Vec<KeyRange>) -> Self {
        Self {
            disposition,
            ranges,
        }
    }

    pub fn packet_type(&self) -> PacketType {
        match self.disposition {
            Disposition::Accept => PacketType::AcceptKeyRanges,
            Disposition::Ignore => PacketType::IgnoreKeyRanges,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(self.ranges.len() * KeyRange::WIRE_SIZE);
        for range in &self.ranges {
            payload.put_u64(range.first);
            payload.put_u64(range.last);
        }
        payload
    }

    pub fn from_packet(packet: &Packet) -> Result<Self, BrlError> {
        let disposition = match packet.packet_type() {
            PacketType::AcceptKeyRanges => Disposition::Accept,
            PacketType::IgnoreKeyRanges => Disposition::Ignore,
            _ => return Err(BrlError::ProtocolViolation("not a key range packet")),
        };
        let payload = packet.payload();
        if payload.len() % KeyRange::WIRE_SIZE != 0 {
            return Err(BrlError::InvalidPacketLength {
                expected: payload.len() - payload.len() % KeyRange::WIRE_SIZE,
                actual: payload.len(),
            });
        }
        let mut reader = PayloadReader::new(payload);
        let mut ranges = Vec::with_capacity(payload.len() / KeyRange::WIRE_SIZE);
        while reader.remaining() > 0 {
            ranges.push(KeyRange {
                first: reader.u64()?,
                last: reader.u64()?,
            });
        }
        Ok(Self::new(disposition, ranges))
    }

    pub fn into_packet(self) -> Result<Packet, BrlError> {
        if self.ranges.len() > MAX_RANGES_PER_PACKET {
            return Err(BrlError::PayloadTooLarge {
                size: self.ranges.len() * KeyRange::WIRE_SIZE,
                max: MAX_RANGES_PER_PACKET * KeyRange::WIRE_SIZE,
            });
        }
        Packet::new(self.packet_type(), self.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_are_big_endian_pairs() {
        let request = KeyRangesRequest::new(
            Disposition::Ignore,
            vec![KeyRange {
                first: 0x2000_0000,
                last: 0xFFFF_FFFF_3FFF_FFFF,
            }],
        );
        let packet = request.clone().into_packet().unwrap();
        assert_eq!(packet.packet_type(), PacketType::IgnoreKeyRanges);
        assert_eq!(
            packet.payload(),
            &[
                0, 0, 0, 0, 0x20, 0, 0, 0, //
                0xFF, 0xFF, 0xFF, 0xFF, 0x3F, 0xFF, 0xFF, 0xFF,
            ]
        );
        assert_eq!(KeyRangesRequest::from_packet(&packet).unwrap(), request);
    }

    #[test]
    fn too_many_ranges_for_one_packet() {
        let request = KeyRangesRequest::new(
            Disposition::Accept,
            vec![KeyRange::FULL; MAX_RANGES_PER_PACKET + 1],
        );
        assert!(matches!(
            request.into_packet(),
            Err(BrlError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn truncated_range_is_rejected() {
        let packet = Packet::new(PacketType::AcceptKeyRanges, vec![0; 12]).unwrap();
        assert!(KeyRangesRequest::from_packet(&packet).is_err());
    }
}
