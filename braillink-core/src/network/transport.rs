//! Packet transport between a session and the service.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::codec::BrlCodec;
use crate::error::BrlError;
use crate::network::endpoint::Endpoint;
use crate::packet::Packet;
use crate::protocol::handshake::{Credential, client_handshake};

/// Any bidirectional byte stream a transport can run over.
pub trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncStream for T {}

// ── CloseHandle ──────────────────────────────────────────────────

/// Closes a transport from another task.
///
/// A `receive` blocked on the transport returns
/// [`BrlError::TransportClosed`] once the handle is closed.
#[derive(Debug, Clone)]
pub struct CloseHandle {
    token: CancellationToken,
}

impl CloseHandle {
    pub fn close(&self) {
        self.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl From<CancellationToken> for CloseHandle {
    fn from(token: CancellationToken) -> Self {
        Self { token }
    }
}

// ── Transport ────────────────────────────────────────────────────

/// A framed, authenticated packet channel.
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, packet: Packet) -> Result<(), BrlError>;

    /// Wait for the next packet. Cancel-safe.
    async fn receive(&mut self) -> Result<Packet, BrlError>;

    /// Close the transport. Idempotent.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    fn close_handle(&self) -> CloseHandle;
}

// ── StreamTransport ──────────────────────────────────────────────

/// [`Transport`] over a local socket or TCP stream.
pub struct StreamTransport {
    endpoint: Endpoint,
    framed: Option<Framed<Box<dyn AsyncStream>, BrlCodec>>,
    closed: CancellationToken,
}

impl std::fmt::Debug for StreamTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTransport")
            .field("endpoint", &self.endpoint)
            .field("open", &self.is_open())
            .finish()
    }
}

impl StreamTransport {
    /// Connect to `endpoint` and authenticate with `credential`.
    pub async fn open(endpoint: &Endpoint, credential: &Credential) -> Result<Self, BrlError> {
        let stream = endpoint
            .connect()
            .await
            .map_err(|source| BrlError::TransportUnavailable {
                endpoint: endpoint.to_string(),
                source,
            })?;
        Self::handshake(stream, endpoint.clone(), credential).await
    }

    /// Run the handshake over an already connected stream.
    pub async fn handshake<S>(
        stream: S,
        endpoint: Endpoint,
        credential: &Credential,
    ) -> Result<Self, BrlError>
    where
        S: AsyncStream + 'static,
    {
        let stream: Box<dyn AsyncStream> = Box::new(stream);
        let mut framed = Framed::new(stream, BrlCodec::new());
        client_handshake(&mut framed, &endpoint.to_string(), credential).await?;
        debug!(%endpoint, "handshake complete");

        Ok(Self {
            endpoint,
            framed: Some(framed),
            closed: CancellationToken::new(),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn shutdown(&mut self) {
        if self.framed.take().is_some() {
            debug!(endpoint = %self.endpoint, "transport closed");
        }
        self.closed.cancel();
    }
}

#[async_trait]
impl Transport for StreamTransport {
    async fn send(&mut self, packet: Packet) -> Result<(), BrlError> {
        if self.closed.is_cancelled() {
            self.shutdown();
        }
        let framed = self.framed.as_mut().ok_or(BrlError::TransportClosed)?;

        let result = tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(BrlError::TransportClosed),
            sent = framed.send(packet) => sent,
        };
        if result.is_err() {
            self.shutdown();
        }
        result
    }

    async fn receive(&mut self) -> Result<Packet, BrlError> {
        if self.closed.is_cancelled() {
            self.shutdown();
        }
        let framed = self.framed.as_mut().ok_or(BrlError::TransportClosed)?;

        let result = tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(BrlError::TransportClosed),
            next = framed.next() => next.unwrap_or(Err(BrlError::TransportClosed)),
        };
        // A decode error leaves the stream out of sync.
        if result.is_err() {
            self.shutdown();
        }
        result
    }

    fn close(&mut self) {
        self.shutdown();
    }

    fn is_open(&self) -> bool {
        self.framed.is_some() && !self.closed.is_cancelled()
    }

    fn close_handle(&self) -> CloseHandle {
        CloseHandle::from(self.closed.clone())
    }
}

impl Drop for StreamTransport {
    fn drop(&mut self) {
        self.closed.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::PacketType;
    use crate::packet::PROTOCOL_VERSION;
    use crate::protocol::handshake::{AuthMethod, AuthOffer};
    use tokio::io::duplex;

    async fn serve_handshake(
        server: tokio::io::DuplexStream,
    ) -> Framed<tokio::io::DuplexStream, BrlCodec> {
        let mut framed = Framed::new(server, BrlCodec::new());
        framed.send(Packet::version(PROTOCOL_VERSION)).await.unwrap();
        let hello = framed.next().await.unwrap().unwrap();
        assert_eq!(hello.packet_type(), PacketType::Version);
        let offer = AuthOffer {
            methods: vec![AuthMethod::None],
        };
        framed.send(offer.into_packet().unwrap()).await.unwrap();
        framed
    }

    #[tokio::test]
    async fn packets_flow_both_ways() {
        let (client, server) = duplex(4096);
        let server = tokio::spawn(serve_handshake(server));
        let mut transport =
            StreamTransport::handshake(client, Endpoint::default(), &Credential::None)
                .await
                .unwrap();
        let mut server = server.await.unwrap();

        transport.send(Packet::ack()).await.unwrap();
        let seen = server.next().await.unwrap().unwrap();
        assert_eq!(seen.packet_type(), PacketType::Ack);

        server.send(Packet::key(0x2000_001D)).await.unwrap();
        let key = transport.receive().await.unwrap();
        assert_eq!(key.key_code().unwrap(), 0x2000_001D);
    }

    #[tokio::test]
    async fn close_handle_unblocks_receive() {
        let (client, server) = duplex(4096);
        let server = tokio::spawn(serve_handshake(server));
        let mut transport =
            StreamTransport::handshake(client, Endpoint::default(), &Credential::None)
                .await
                .unwrap();
        let _server = server.await.unwrap();

        let handle = transport.close_handle();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            handle.close();
        });

        let result = tokio::time::timeout(std::time::Duration::from_secs(2), transport.receive())
            .await
            .expect("receive stayed blocked after close");
        assert!(matches!(result, Err(BrlError::TransportClosed)));
        assert!(!transport.is_open());

        // Idempotent.
        transport.close();
        transport.close();
        assert!(matches!(
            transport.send(Packet::ack()).await,
            Err(BrlError::TransportClosed)
        ));
    }

    #[tokio::test]
    async fn peer_hangup_is_transport_closed() {
        let (client, server) = duplex(4096);
        let server = tokio::spawn(serve_handshake(server));
        let mut transport =
            StreamTransport::handshake(client, Endpoint::default(), &Credential::None)
                .await
                .unwrap();
        drop(server.await.unwrap());

        assert!(matches!(
            transport.receive().await,
            Err(BrlError::TransportClosed)
        ));
        assert!(!transport.is_open());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_unavailable() {
        let endpoint = Endpoint::Local { instance: 65000 };
        let err = StreamTransport::open(&endpoint, &Credential::None)
            .await
            .unwrap_err();
        assert!(matches!(err, BrlError::TransportUnavailable { .. }));
        assert!(err.is_connection_failure());
    }
}
