use crate::error::BrlError;
use crate::packet::MAX_PAYLOAD_SIZE;

/// Size of the frame header on the wire.
pub const HEADER_SIZE: usize = 8;

pub type FrameHeaderBytes = [u8; HEADER_SIZE];

/// Frame header: payload size followed by the packet type tag,
/// both big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    payload_length: u32,
    packet_type: u32,
}

impl FrameHeader {
    pub fn new(packet_type: u32, payload_length: u32) -> Self {
        Self {
            payload_length,
            packet_type,
        }
    }

    pub fn to_bytes(&self) -> FrameHeaderBytes {
        let mut bytes: FrameHeaderBytes = [0; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.payload_length.to_be_bytes());
        bytes[4..8].copy_from_slice(&self.packet_type.to_be_bytes());
        bytes
    }

    pub fn from_bytes(bytes: FrameHeaderBytes) -> Result<Self, BrlError> {
        let payload_length = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let packet_type = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

        if payload_length as usize > MAX_PAYLOAD_SIZE {
            return Err(BrlError::PayloadTooLarge {
                size: payload_length as usize,
                max: MAX_PAYLOAD_SIZE,
            });
        }
        if packet_type == 0 {
            return Err(BrlError::InvalidHeader("packet type is zero"));
        }

        Ok(Self {
            payload_length,
            packet_type,
        })
    }

    pub fn packet_type(&self) -> u32 {
        self.packet_type
    }

    pub fn payload_length(&self) -> usize {
        self.payload_length as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout_is_big_endian() {
        let header = FrameHeader::new(b'w' as u32, 0x0102);
        assert_eq!(header.to_bytes(), [0, 0, 1, 2, 0, 0, 0, b'w']);
    }

    #[test]
    fn oversized_length_is_rejected() {
        let bytes = FrameHeader::new(b'k' as u32, 4096).to_bytes();
        assert!(matches!(
            FrameHeader::from_bytes(bytes),
            Err(BrlError::PayloadTooLarge { size: 4096, .. })
        ));
    }

    #[test]
    fn zero_type_is_rejected() {
        let bytes = [0, 0, 0, 0, 0, 0, 0, 0];
        assert!(FrameHeader::from_bytes(bytes).is_err());
    }
}
