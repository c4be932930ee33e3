use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use crate::error::{Result, TransportError};

/// Address of a server handle: the `(serverIp, serverPort)` pair.
///
/// This is also the key of the process-wide connection directory, so two
/// values compare equal exactly when they name the same logical server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServerAddr {
    ip: String,
    port: u16,
}

impl ServerAddr {
    /// Create an address from host text and port.
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
        }
    }

    /// Host part as given by the caller.
    pub fn ip(&self) -> &str {
        &self.ip
    }

    /// TCP port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Same host, different port (used for the event socket).
    pub fn with_port(&self, port: u16) -> Self {
        Self {
            ip: self.ip.clone(),
            port,
        }
    }

    /// Resolve to the first socket address.
    pub fn resolve(&self) -> Result<SocketAddr> {
        (self.ip.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|_| TransportError::Resolve(self.to_string()))?
            .next()
            .ok_or_else(|| TransportError::Resolve(self.to_string()))
    }
}

impl fmt::Display for ServerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ip.contains(':') {
            write!(f, "[{}]:{}", self.ip, self.port)
        } else {
            write!(f, "{}:{}", self.ip, self.port)
        }
    }
}

impl FromStr for ServerAddr {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| TransportError::Resolve(s.to_string()))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(TransportError::Resolve(s.to_string()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| TransportError::Resolve(s.to_string()))?;
        Ok(Self::new(host, port))
    }
}

impl From<SocketAddr> for ServerAddr {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}
