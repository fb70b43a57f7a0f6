//! Where the service listens.
//!
//! ```text
//! ""          local socket  /var/lib/BrlAPI/0
//! ":N"        local socket  /var/lib/BrlAPI/N
//! "host"      TCP           host:4101
//! "host:N"    TCP           host:4101+N
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use tokio::net::TcpStream;

use crate::error::BrlError;
use crate::network::transport::AsyncStream;

/// TCP port of service instance 0.
pub const DEFAULT_PORT: u16 = 4101;
/// Directory holding the local sockets, one per instance.
pub const LOCAL_SOCKET_DIR: &str = "/var/lib/BrlAPI";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Local socket of the given instance.
    Local { instance: u16 },
    /// TCP connection to `host`, port `DEFAULT_PORT + instance`.
    Tcp { host: String, instance: u16 },
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::Local { instance: 0 }
    }
}

impl Endpoint {
    pub fn tcp(host: impl Into<String>, instance: u16) -> Self {
        Endpoint::Tcp {
            host: host.into(),
            instance,
        }
    }

    pub fn instance(&self) -> u16 {
        match self {
            Endpoint::Local { instance } | Endpoint::Tcp { instance, .. } => *instance,
        }
    }

    /// TCP port, for TCP endpoints.
    pub fn port(&self) -> Option<u16> {
        match self {
            Endpoint::Tcp { instance, .. } => DEFAULT_PORT.checked_add(*instance),
            Endpoint::Local { .. } => None,
        }
    }

    /// Socket path, for local endpoints.
    pub fn socket_path(&self) -> Option<PathBuf> {
        match self {
            Endpoint::Local { instance } => {
                Some(PathBuf::from(LOCAL_SOCKET_DIR).join(instance.to_string()))
            }
            Endpoint::Tcp { .. } => None,
        }
    }

    /// Open a raw byte stream to the endpoint.
    pub async fn connect(&self) -> std::io::Result<Box<dyn AsyncStream>> {
        match self {
            Endpoint::Tcp { host, .. } => {
                let port = self.port().ok_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "port out of range")
                })?;
                let stream = TcpStream::connect((host.as_str(), port)).await?;
                stream.set_nodelay(true)?;
                Ok(Box::new(stream))
            }
            #[cfg(unix)]
            Endpoint::Local { instance } => {
                let path = PathBuf::from(LOCAL_SOCKET_DIR).join(instance.to_string());
                let stream = tokio::net::UnixStream::connect(path).await?;
                Ok(Box::new(stream))
            }
            #[cfg(not(unix))]
            Endpoint::Local { .. } => Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "local sockets are not available on this platform",
            )),
        }
    }
}

impl FromStr for Endpoint {
    type Err = BrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (host, instance) = match s.rsplit_once(':') {
            Some((host, n)) => {
                let instance = n
                    .parse::<u16>()
                    .map_err(|_| BrlError::InvalidEndpoint(s.to_string()))?;
                (host, instance)
            }
            None => (s, 0),
        };

        if host.is_empty() {
            return Ok(Endpoint::Local { instance });
        }
        if DEFAULT_PORT.checked_add(instance).is_none() {
            return Err(BrlError::InvalidEndpoint(s.to_string()));
        }
        Ok(Endpoint::tcp(host, instance))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Local { instance } => write!(f, ":{instance}"),
            Endpoint::Tcp { host, instance } => write!(f, "{host}:{instance}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_local_instance_zero() {
        let endpoint: Endpoint = "".parse().unwrap();
        assert_eq!(endpoint, Endpoint::Local { instance: 0 });
        assert_eq!(
            endpoint.socket_path(),
            Some(PathBuf::from("/var/lib/BrlAPI/0"))
        );
    }

    #[test]
    fn colon_number_is_local() {
        let endpoint: Endpoint = ":2".parse().unwrap();
        assert_eq!(endpoint, Endpoint::Local { instance: 2 });
        assert_eq!(endpoint.to_string(), ":2");
        assert_eq!(endpoint.port(), None);
    }

    #[test]
    fn host_maps_to_default_port() {
        let endpoint: Endpoint = "braille.local".parse().unwrap();
        assert_eq!(endpoint.port(), Some(4101));
        assert_eq!(endpoint.to_string(), "braille.local:0");
    }

    #[test]
    fn host_instance_offsets_port() {
        let endpoint: Endpoint = "127.0.0.1:3".parse().unwrap();
        assert_eq!(endpoint, Endpoint::tcp("127.0.0.1", 3));
        assert_eq!(endpoint.port(), Some(4104));
    }

    #[test]
    fn bad_instances_are_rejected() {
        assert!(matches!(
            "host:x".parse::<Endpoint>(),
            Err(BrlError::InvalidEndpoint(_))
        ));
        assert!("host:65000".parse::<Endpoint>().is_err());
    }
}
