use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::BrlError;
use crate::header::{FrameHeader, FrameHeaderBytes, HEADER_SIZE};
use crate::packet::{MAX_FRAME_SIZE, Packet};

/// Length-prefixed framing for service packets.
#[derive(Debug, Default)]
pub struct BrlCodec {
    // Header of a frame whose payload has not fully arrived yet.
    pending: Option<FrameHeader>,
}

impl BrlCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for BrlCodec {
    type Item = Packet;
    type Error = BrlError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let header = match self.pending {
            Some(header) => header,
            None => {
                if src.len() < HEADER_SIZE {
                    return Ok(None);
                }
                let mut bytes: FrameHeaderBytes = [0; HEADER_SIZE];
                bytes.copy_from_slice(&src[..HEADER_SIZE]);
                let header = FrameHeader::from_bytes(bytes)?;
                src.advance(HEADER_SIZE);
                header
            }
        };

        if src.len() < header.payload_length() {
            self.pending = Some(header);
            src.reserve(header.payload_length() - src.len());
            return Ok(None);
        }

        self.pending = None;
        let payload = src.split_to(header.payload_length()).to_vec();
        let packet = Packet::from_frame(header, payload)?;
        tracing::trace!(packet_type = %packet.packet_type(), len = packet.payload_length(), "frame in");
        Ok(Some(packet))
    }
}

impl Encoder<Packet> for BrlCodec {
    type Error = BrlError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let frame = item.to_bytes()?;
        debug_assert!(frame.len() <= MAX_FRAME_SIZE);
        tracing::trace!(packet_type = %item.packet_type(), len = item.payload_length(), "frame out");
        dst.extend_from_slice(&frame);
        Ok(())
    }
}
