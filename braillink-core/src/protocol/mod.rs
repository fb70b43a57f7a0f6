//! Request and reply payloads carried inside [`Packet`] bodies.
//!
//! Each sub-module owns the byte layout of one protocol area. All
//! integers are big-endian; strings are length-prefixed UTF-8.
//!
//! [`Packet`]: crate::packet::Packet

pub mod handshake;
pub mod info;
pub mod keys;
pub mod tty;
pub mod write;

pub use handshake::{AuthMethod, AuthOffer, Credential, DEFAULT_KEY_FILE, client_handshake};
pub use info::{driver_name_from_packet, driver_name_packet};
pub use keys::KeyRangesRequest;
pub use tty::{EnterTtyRequest, leave_tty_packet};
