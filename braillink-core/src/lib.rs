//! # braillink-core
//!
//! Client library for a braille display service.
//!
//! This crate contains:
//! - **Wire types**: `FrameHeader`, `Packet`, `PacketType`, `ServiceErrorCode`, `WriteFlags`
//! - **Codec**: `BrlCodec` for framed stream I/O via `tokio_util`
//! - **Protocol payloads**: handshake, TTY, key range, query and write encodings
//! - **Network**: `Endpoint` parsing and the `Transport` trait with its stream implementation
//! - **State**: the `SessionMode` machine
//! - **Session**: TTY ownership, key filtering and display writes over a transport
//! - **Error**: `BrlError`, a typed `thiserror` hierarchy

pub mod codec;
pub mod display;
pub mod error;
pub mod filter;
pub mod flags;
pub mod header;
pub mod key;
pub mod message;
pub mod network;
pub mod packet;
pub mod protocol;
pub mod session;
pub mod state;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::BrlCodec;
pub use display::{Cursor, DisplaySize, DisplayWrite, Dots, Flush, Region};
pub use error::{BrlError, ErrorKind, ValidationError};
pub use filter::{
    Disposition, FilterCategory, FilterDirective, FilterRegistry, KeyRange, KeySelector,
};
pub use flags::{KeyFlags, WriteFlags};
pub use header::{FrameHeader, HEADER_SIZE};
pub use key::{KeyCode, KeyEvent, KeyType, commands, keysym};
pub use message::{PacketType, ServiceErrorCode};
pub use network::{CloseHandle, Endpoint, StreamTransport, Transport};
pub use packet::{MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE, PROTOCOL_VERSION, Packet};
pub use protocol::Credential;
pub use session::Session;
pub use state::{ModeKind, SessionMode, TtySlot};
