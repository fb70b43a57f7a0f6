//! Connection handshake: version exchange and authentication.
//!
//! # Handshake Sequence
//!
//! ```text
//! Client                                    Service
//!   |                                          |
//!   |  <-- Version { version } ----------------|
//!   |  -- Version { version } ---------------> |
//!   |  <-- Auth { methods } -------------------|
//!   |      OR                                  |
//!   |  <-- Error { code } ---------------------|
//!   |                                          |
//!   |  (only when `K` is required)             |
//!   |  -- Auth { 'K', key } -----------------> |
//!   |  <-- Ack | Error { code } ---------------|
//! ```

use std::path::{Path, PathBuf};

use bytes::BufMut;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::debug;

use crate::codec::BrlCodec;
use crate::error::BrlError;
use crate::message::{PacketType, ServiceErrorCode};
use crate::packet::{MAX_PAYLOAD_SIZE, PROTOCOL_VERSION, Packet};

/// Key file consulted when no credential is configured.
pub const DEFAULT_KEY_FILE: &str = "/etc/brlapi.key";

// ── Credential ───────────────────────────────────────────────────

/// What the client presents when the service asks for authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Only usable against services that allow unauthenticated clients.
    None,
    /// A shared secret read from a file.
    KeyFile(PathBuf),
}

impl Default for Credential {
    fn default() -> Self {
        Credential::KeyFile(PathBuf::from(DEFAULT_KEY_FILE))
    }
}

impl Credential {
    pub fn key_file(path: impl Into<PathBuf>) -> Self {
        Credential::KeyFile(path.into())
    }

    /// The file this credential reads, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Credential::None => None,
            Credential::KeyFile(path) => Some(path),
        }
    }
}

// ── AuthMethod ───────────────────────────────────────────────────

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMethod {
    None = b'N' as u32,
    Key = b'K' as u32,
    Credentials = b'C' as u32,
}

impl TryFrom<u32> for AuthMethod {
    type Error = BrlError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            v if v == AuthMethod::None as u32 => Ok(AuthMethod::None),
            v if v == AuthMethod::Key as u32 => Ok(AuthMethod::Key),
            v if v == AuthMethod::Credentials as u32 => Ok(AuthMethod::Credentials),
            _ => Err(BrlError::UnknownVariant {
                type_name: "AuthMethod",
                value: value as u64,
            }),
        }
    }
}

/// Methods the service will accept, in its order of preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOffer {
    pub methods: Vec<AuthMethod>,
}

impl AuthOffer {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(self.methods.len() * 4);
        for method in &self.methods {
            payload.put_u32(*method as u32);
        }
        payload
    }

    /// Unknown methods are skipped.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BrlError> {
        if bytes.len() % 4 != 0 {
            return Err(BrlError::InvalidPacketLength {
                expected: bytes.len() - bytes.len() % 4,
                actual: bytes.len(),
            });
        }
        let methods = bytes
            .chunks_exact(4)
            .filter_map(|c| AuthMethod::try_from(u32::from_be_bytes([c[0], c[1], c[2], c[3]])).ok())
            .collect();
        Ok(Self { methods })
    }

    pub fn into_packet(self) -> Result<Packet, BrlError> {
        Packet::new(PacketType::Auth, self.to_bytes())
    }

    pub fn allows(&self, method: AuthMethod) -> bool {
        self.methods.contains(&method)
    }
}

/// The client's answer to a key challenge.
pub fn key_auth_packet(key: &[u8]) -> Result<Packet, BrlError> {
    let mut payload = Vec::with_capacity(4 + key.len());
    payload.put_u32(AuthMethod::Key as u32);
    payload.extend_from_slice(key);
    Packet::new(PacketType::Auth, payload)
}

// ── Client handshake ─────────────────────────────────────────────

async fn next_packet<S>(framed: &mut Framed<S, BrlCodec>) -> Result<Packet, BrlError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match framed.next().await {
        Some(result) => result,
        None => Err(BrlError::TransportClosed),
    }
}

/// Translate an `Error` packet received during the handshake.
fn refusal(packet: &Packet, endpoint: &str, credential: &Credential) -> BrlError {
    match packet.service_error() {
        Ok((ServiceErrorCode::ConnectionRefused, _)) => BrlError::ConnectionRefused {
            endpoint: endpoint.to_string(),
        },
        Ok((ServiceErrorCode::Authentication, _)) => BrlError::AuthenticationFailed {
            endpoint: endpoint.to_string(),
            credential: credential.path().map(Path::to_path_buf),
        },
        Ok((ServiceErrorCode::ProtocolVersion, _)) => {
            BrlError::UnsupportedVersion(PROTOCOL_VERSION)
        }
        Ok((code, request)) => BrlError::Service { code, request },
        Err(e) => e,
    }
}

/// Run the client side of the handshake on a freshly connected stream.
pub async fn client_handshake<S>(
    framed: &mut Framed<S, BrlCodec>,
    endpoint: &str,
    credential: &Credential,
) -> Result<(), BrlError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let hello = next_packet(framed).await?;
    match hello.packet_type() {
        PacketType::Version => {
            let mut reader = hello.reader();
            let version = reader.u32()?;
            if version != PROTOCOL_VERSION {
                return Err(BrlError::UnsupportedVersion(version));
            }
        }
        PacketType::Error => return Err(refusal(&hello, endpoint, credential)),
        _ => return Err(BrlError::ProtocolViolation("expected version packet")),
    }

    framed.send(Packet::version(PROTOCOL_VERSION)).await?;

    let offer_packet = next_packet(framed).await?;
    let offer = match offer_packet.packet_type() {
        PacketType::Auth => AuthOffer::from_bytes(offer_packet.payload())?,
        PacketType::Error => return Err(refusal(&offer_packet, endpoint, credential)),
        _ => return Err(BrlError::ProtocolViolation("expected auth packet")),
    };
    debug!(?offer.methods, endpoint, "service authentication offer");

    if offer.allows(AuthMethod::None) {
        return Ok(());
    }

    let auth_failed = || BrlError::AuthenticationFailed {
        endpoint: endpoint.to_string(),
        credential: credential.path().map(Path::to_path_buf),
    };

    let path = match credential {
        Credential::KeyFile(path) if offer.allows(AuthMethod::Key) => path,
        _ => return Err(auth_failed()),
    };

    let key = match tokio::fs::read(path).await {
        Ok(key) if !key.is_empty() && key.len() <= MAX_PAYLOAD_SIZE - 4 => key,
        Ok(_) => return Err(auth_failed()),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "cannot read key file");
            return Err(auth_failed());
        }
    };

    framed.send(key_auth_packet(&key)?).await?;

    let verdict = next_packet(framed).await?;
    match verdict.packet_type() {
        PacketType::Ack => Ok(()),
        PacketType::Error => Err(refusal(&verdict, endpoint, credential)),
        _ => Err(BrlError::ProtocolViolation("expected auth verdict")),
    }
}
