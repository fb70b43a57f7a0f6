//! Domain-specific error types for the braillink client.
//!
//! All fallible operations return `Result<T, BrlError>`.
//! No panics on invalid input. Every error is typed and recoverable.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::message::{PacketType, ServiceErrorCode};
use crate::state::ModeKind;

/// The canonical error type for the braillink client.
#[derive(Debug, Error)]
pub enum BrlError {
    // ── Connection Errors ────────────────────────────────────────
    /// The service answered the connection but refused to serve it.
    #[error("connection to {endpoint} refused by the service")]
    ConnectionRefused { endpoint: String },

    /// The handshake was rejected, or the credential could not be used.
    #[error("authentication with {endpoint} failed{}", credential_suffix(.credential))]
    AuthenticationFailed {
        endpoint: String,
        credential: Option<PathBuf>,
    },

    /// The service could not be reached at all.
    #[error("service at {endpoint} unavailable: {source}")]
    TransportUnavailable {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// The transport was closed, locally or by the peer.
    #[error("transport closed")]
    TransportClosed,

    /// An endpoint string could not be parsed.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    // ── Session Errors ───────────────────────────────────────────
    /// The operation is not legal in the current session mode.
    #[error("cannot {operation} while {mode}")]
    Mode {
        operation: &'static str,
        mode: ModeKind,
    },

    /// The service rejected a well-formed request.
    #[error("service error {code}{}", request_suffix(.request))]
    Service {
        code: ServiceErrorCode,
        request: Option<PacketType>,
    },

    /// The request was malformed and never left the client.
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// A round-trip exceeded the configured request timeout.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // ── Protocol Errors ──────────────────────────────────────────
    /// A field in the frame header could not be parsed.
    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),

    /// A numeric value did not map to any known enum variant.
    #[error("unknown {type_name} discriminant: {value:#x}")]
    UnknownVariant { type_name: &'static str, value: u64 },

    /// The protocol version offered by the service is not supported.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u32),

    /// A packet violated protocol rules.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    /// The payload exceeds the protocol maximum.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The payload is shorter or longer than its packet type requires.
    #[error("invalid packet length: expected {expected}, got {actual}")]
    InvalidPacketLength { expected: usize, actual: usize },

    /// The I/O layer reported an error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion failed.
    #[error("invalid utf-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

fn credential_suffix(credential: &Option<PathBuf>) -> String {
    match credential {
        Some(path) => format!(" (check the permissions of {})", path.display()),
        None => String::new(),
    }
}

fn request_suffix(request: &Option<PacketType>) -> String {
    match request {
        Some(ty) => format!(" in reply to {ty}"),
        None => String::new(),
    }
}

// ── ErrorKind ─────────────────────────────────────────────────────

/// Coarse classification of a [`BrlError`] for callers that only need
/// to branch on the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ConnectionRefused,
    AuthenticationFailed,
    TransportUnavailable,
    TransportClosed,
    Mode,
    Service,
    Validation,
    Timeout,
    Protocol,
}

impl BrlError {
    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConnectionRefused { .. } => ErrorKind::ConnectionRefused,
            Self::AuthenticationFailed { .. } => ErrorKind::AuthenticationFailed,
            Self::TransportUnavailable { .. } | Self::InvalidEndpoint(_) => {
                ErrorKind::TransportUnavailable
            }
            Self::TransportClosed | Self::Io(_) => ErrorKind::TransportClosed,
            Self::Mode { .. } => ErrorKind::Mode,
            Self::Service { .. } => ErrorKind::Service,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::InvalidHeader(_)
            | Self::UnknownVariant { .. }
            | Self::UnsupportedVersion(_)
            | Self::ProtocolViolation(_)
            | Self::PayloadTooLarge { .. }
            | Self::InvalidPacketLength { .. }
            | Self::InvalidUtf8(_) => ErrorKind::Protocol,
        }
    }

    /// Returns `true` for failures that happen while establishing a
    /// connection.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ConnectionRefused
                | ErrorKind::AuthenticationFailed
                | ErrorKind::TransportUnavailable
        )
    }

    /// Returns `true` when the session can no longer be used.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::TransportClosed | Self::Io(_))
    }
}

// ── ValidationError ───────────────────────────────────────────────

/// Typed reasons a request was rejected before reaching the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A region must cover at least one cell.
    #[error("region length must be at least 1")]
    EmptyRegion,

    /// Region offsets are 1-based.
    #[error("region start must be at least 1")]
    RegionStartZero,

    /// The text has more cells than the region it targets.
    #[error("text of {text} cells exceeds region of {region} cells")]
    TextExceedsRegion { text: usize, region: usize },

    /// The overlay mask must have one entry per text cell.
    #[error("overlay mask has {mask} cells but text has {text}")]
    MaskLengthMismatch { text: usize, mask: usize },

    /// An overlay mask was supplied with no text to overlay.
    #[error("overlay mask requires text")]
    MaskWithoutText,

    /// A held write must carry content.
    #[error("a held write requires text")]
    HoldWithoutText,

    /// The region reaches past the end of the display.
    #[error("region ends at cell {end} but the display has {cells} cells")]
    RegionOutOfBounds { end: usize, cells: usize },

    /// The cursor position is past the end of the display.
    #[error("cursor at cell {position} but the display has {cells} cells")]
    CursorOutOfBounds { position: u32, cells: usize },

    /// A filter directive needs at least one key.
    #[error("filter directive has no keys")]
    EmptyKeySet,

    /// The encoded request does not fit in one packet.
    #[error("encoded request of {size} bytes exceeds {max}")]
    RequestTooLarge { size: usize, max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = BrlError::ConnectionRefused {
            endpoint: "localhost:0".into(),
        };
        assert!(e.to_string().contains("localhost:0"));

        let e = BrlError::PayloadTooLarge {
            size: 1000,
            max: 512,
        };
        assert!(e.to_string().contains("1000"));
        assert!(e.to_string().contains("512"));
    }

    #[test]
    fn authentication_failure_names_credential() {
        let e = BrlError::AuthenticationFailed {
            endpoint: ":0".into(),
            credential: Some(PathBuf::from("/etc/brlapi.key")),
        };
        let text = e.to_string();
        assert!(text.contains(":0"));
        assert!(text.contains("/etc/brlapi.key"));
        assert!(e.is_connection_failure());
    }

    #[test]
    fn mode_error_names_operation() {
        let e = BrlError::Mode {
            operation: "read a key",
            mode: ModeKind::Connected,
        };
        assert_eq!(e.to_string(), "cannot read a key while Connected");
        assert_eq!(e.kind(), ErrorKind::Mode);
    }

    #[test]
    fn from_validation() {
        let e: BrlError = ValidationError::MaskLengthMismatch { text: 3, mask: 2 }.into();
        assert_eq!(e.kind(), ErrorKind::Validation);
        assert!(e.to_string().contains("overlay mask"));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: BrlError = io_err.into();
        assert!(matches!(e, BrlError::Io(_)));
        assert!(e.is_fatal());
    }
}
