//! Packet type tags and service error codes.
//!
//! Unknown tags and error codes are rejected with a typed error, never a panic.

use crate::error::BrlError;
use std::fmt;

// ── PacketType ───────────────────────────────────────────────────

/// Every packet type the client sends or understands.
///
/// Discriminants are the ASCII tags carried in the frame header.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    // ── Connection ───────────────────────────────────────────────
    /// Protocol version exchange.
    Version = b'v' as u32,
    /// Authentication methods (service) or credential (client).
    Auth = b'a' as u32,

    // ── Queries ──────────────────────────────────────────────────
    /// Name of the braille driver in use.
    GetDriverName = b'n' as u32,
    /// Display geometry in cells.
    GetDisplaySize = b's' as u32,

    // ── TTY mode ─────────────────────────────────────────────────
    /// Take ownership of a terminal slot.
    EnterTtyMode = b't' as u32,
    /// Release the owned terminal slot.
    LeaveTtyMode = b'L' as u32,

    // ── Keys ─────────────────────────────────────────────────────
    /// A key event delivered by the service.
    Key = b'k' as u32,
    /// Remove key ranges from the delivered set.
    IgnoreKeyRanges = b'm' as u32,
    /// Add key ranges to the delivered set.
    AcceptKeyRanges = b'u' as u32,

    // ── Output ───────────────────────────────────────────────────
    /// Region-addressed display write.
    Write = b'w' as u32,

    // ── Replies ──────────────────────────────────────────────────
    /// Request accepted.
    Ack = b'A' as u32,
    /// Request rejected.
    Error = b'e' as u32,
    /// Asynchronous failure of an earlier request.
    Exception = b'E' as u32,
}

impl TryFrom<u32> for PacketType {
    type Error = BrlError;

    fn try_from(value: u32) -> Result<Self, BrlError> {
        const VERSION: u32 = PacketType::Version as u32;
        const AUTH: u32 = PacketType::Auth as u32;
        const GET_DRIVER_NAME: u32 = PacketType::GetDriverName as u32;
        const GET_DISPLAY_SIZE: u32 = PacketType::GetDisplaySize as u32;
        const ENTER_TTY_MODE: u32 = PacketType::EnterTtyMode as u32;
        const LEAVE_TTY_MODE: u32 = PacketType::LeaveTtyMode as u32;
        const KEY: u32 = PacketType::Key as u32;
        const IGNORE_KEY_RANGES: u32 = PacketType::IgnoreKeyRanges as u32;
        const ACCEPT_KEY_RANGES: u32 = PacketType::AcceptKeyRanges as u32;
        const WRITE: u32 = PacketType::Write as u32;
        const ACK: u32 = PacketType::Ack as u32;
        const ERROR: u32 = PacketType::Error as u32;
        const EXCEPTION: u32 = PacketType::Exception as u32;

        match value {
            VERSION => Ok(PacketType::Version),
            AUTH => Ok(PacketType::Auth),
            GET_DRIVER_NAME => Ok(PacketType::GetDriverName),
            GET_DISPLAY_SIZE => Ok(PacketType::GetDisplaySize),
            ENTER_TTY_MODE => Ok(PacketType::EnterTtyMode),
            LEAVE_TTY_MODE => Ok(PacketType::LeaveTtyMode),
            KEY => Ok(PacketType::Key),
            IGNORE_KEY_RANGES => Ok(PacketType::IgnoreKeyRanges),
            ACCEPT_KEY_RANGES => Ok(PacketType::AcceptKeyRanges),
            WRITE => Ok(PacketType::Write),
            ACK => Ok(PacketType::Ack),
            ERROR => Ok(PacketType::Error),
            EXCEPTION => Ok(PacketType::Exception),
            _ => Err(BrlError::UnknownVariant {
                type_name: "PacketType",
                value: value as u64,
            }),
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl PacketType {
    /// Returns `true` if the service answers this packet with a reply.
    pub fn expects_reply(&self) -> bool {
        matches!(
            self,
            PacketType::GetDriverName
                | PacketType::GetDisplaySize
                | PacketType::EnterTtyMode
                | PacketType::LeaveTtyMode
                | PacketType::IgnoreKeyRanges
                | PacketType::AcceptKeyRanges
                | PacketType::Write
        )
    }

    /// Returns `true` for packets that can answer a request.
    pub fn is_reply(&self) -> bool {
        matches!(
            self,
            PacketType::Ack
                | PacketType::Error
                | PacketType::GetDriverName
                | PacketType::GetDisplaySize
        )
    }
}

// ── ServiceErrorCode ─────────────────────────────────────────────

/// Error codes carried by `Error` and `Exception` packets.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceErrorCode {
    Success = 0,
    NoMemory = 1,
    TtyBusy = 2,
    DeviceBusy = 3,
    UnknownInstruction = 4,
    IllegalInstruction = 5,
    InvalidParameter = 6,
    InvalidPacket = 7,
    ConnectionRefused = 8,
    OperationNotSupported = 9,
    AddressResolution = 10,
    SystemError = 11,
    UnknownTty = 12,
    ProtocolVersion = 13,
    EndOfFile = 14,
    EmptyKey = 15,
    DriverError = 16,
    Authentication = 17,
}

impl TryFrom<u32> for ServiceErrorCode {
    type Error = BrlError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ServiceErrorCode::Success),
            1 => Ok(ServiceErrorCode::NoMemory),
            2 => Ok(ServiceErrorCode::TtyBusy),
            3 => Ok(ServiceErrorCode::DeviceBusy),
            4 => Ok(ServiceErrorCode::UnknownInstruction),
            5 => Ok(ServiceErrorCode::IllegalInstruction),
            6 => Ok(ServiceErrorCode::InvalidParameter),
            7 => Ok(ServiceErrorCode::InvalidPacket),
            8 => Ok(ServiceErrorCode::ConnectionRefused),
            9 => Ok(ServiceErrorCode::OperationNotSupported),
            10 => Ok(ServiceErrorCode::AddressResolution),
            11 => Ok(ServiceErrorCode::SystemError),
            12 => Ok(ServiceErrorCode::UnknownTty),
            13 => Ok(ServiceErrorCode::ProtocolVersion),
            14 => Ok(ServiceErrorCode::EndOfFile),
            15 => Ok(ServiceErrorCode::EmptyKey),
            16 => Ok(ServiceErrorCode::DriverError),
            17 => Ok(ServiceErrorCode::Authentication),
            _ => Err(BrlError::UnknownVariant {
                type_name: "ServiceErrorCode",
                value: value as u64,
            }),
        }
    }
}

impl fmt::Display for ServiceErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ServiceErrorCode::Success => "success",
            ServiceErrorCode::NoMemory => "insufficient memory",
            ServiceErrorCode::TtyBusy => "tty busy",
            ServiceErrorCode::DeviceBusy => "device busy",
            ServiceErrorCode::UnknownInstruction => "unknown instruction",
            ServiceErrorCode::IllegalInstruction => "illegal instruction",
            ServiceErrorCode::InvalidParameter => "invalid parameter",
            ServiceErrorCode::InvalidPacket => "invalid packet",
            ServiceErrorCode::ConnectionRefused => "connection refused",
            ServiceErrorCode::OperationNotSupported => "operation not supported",
            ServiceErrorCode::AddressResolution => "address resolution failed",
            ServiceErrorCode::SystemError => "system error",
            ServiceErrorCode::UnknownTty => "unknown tty",
            ServiceErrorCode::ProtocolVersion => "bad protocol version",
            ServiceErrorCode::EndOfFile => "unexpected end of file",
            ServiceErrorCode::EmptyKey => "key file empty",
            ServiceErrorCode::DriverError => "driver error",
            ServiceErrorCode::Authentication => "authentication failed",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_type_roundtrip() {
        let types = [
            PacketType::Version,
            PacketType::Auth,
            PacketType::GetDriverName,
            PacketType::GetDisplaySize,
            PacketType::EnterTtyMode,
            PacketType::LeaveTtyMode,
            PacketType::Key,
            PacketType::IgnoreKeyRanges,
            PacketType::AcceptKeyRanges,
            PacketType::Write,
            PacketType::Ack,
            PacketType::Error,
            PacketType::Exception,
        ];
        for ty in types {
            assert_eq!(PacketType::try_from(ty as u32).unwrap(), ty);
        }
    }

    #[test]
    fn packet_type_tags_are_ascii() {
        assert_eq!(PacketType::Write as u32, 0x77);
        assert_eq!(PacketType::LeaveTtyMode as u32, 0x4C);
    }

    #[test]
    fn packet_type_invalid() {
        assert!(PacketType::try_from(0xDEAD).is_err());
    }

    #[test]
    fn key_packets_are_not_replies() {
        assert!(!PacketType::Key.is_reply());
        assert!(PacketType::Ack.is_reply());
        assert!(PacketType::Write.expects_reply());
        assert!(!PacketType::Key.expects_reply());
    }

    #[test]
    fn error_code_roundtrip() {
        for value in 0..=17 {
            let code = ServiceErrorCode::try_from(value).unwrap();
            assert_eq!(code as u32, value);
        }
        assert!(ServiceErrorCode::try_from(99).is_err());
    }
}
