//! Bit-flag sets carried on the wire.

use bitflags::bitflags;

bitflags! {
    /// Which optional sections follow the flag word of a `Write` payload.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct WriteFlags: u32 {
        /// A display number follows. Never set by this client.
        const DISPLAY_NUMBER = 0x01;
        /// Region start and length follow.
        const REGION = 0x02;
        /// Text follows.
        const TEXT = 0x04;
        /// An AND mask follows. Never set by this client.
        const AND_MASK = 0x08;
        /// An OR (overlay) mask follows.
        const OR_MASK = 0x10;
        /// A cursor position follows.
        const CURSOR = 0x20;
        /// The text charset name follows.
        const CHARSET = 0x40;
        /// Hold the write until the next flushing write.
        const HOLD = 0x80;
    }
}

bitflags! {
    /// Modifier flags in the upper 32 bits of a key code.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeyFlags: u32 {
        const SHIFT = 0x01;
        const UPPER = 0x02;
        const CONTROL = 0x04;
        const META = 0x08;
        const ALTGR = 0x10;
        const GUI = 0x20;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_write_bits_are_detected() {
        assert!(WriteFlags::from_bits(0x100).is_none());
        let flags = WriteFlags::REGION | WriteFlags::TEXT;
        assert_eq!(flags.bits(), 0x06);
    }

    #[test]
    fn key_flags_keep_unknown_bits() {
        let flags = KeyFlags::from_bits_retain(0x8001);
        assert!(flags.contains(KeyFlags::SHIFT));
        assert_eq!(flags.bits(), 0x8001);
    }
}
