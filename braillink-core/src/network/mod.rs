//! Reaching the service: endpoint syntax and the packet transport.

pub mod endpoint;
pub mod transport;

pub use endpoint::{DEFAULT_PORT, Endpoint, LOCAL_SOCKET_DIR};
pub use transport::{AsyncStream, CloseHandle, StreamTransport, Transport};
