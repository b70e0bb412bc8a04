pub mod failure;
pub mod strategy;

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use serde::Deserialize;

pub use failure::FailureKind;
pub use strategy::RoutingStrategy;

/// A backend or peer endpoint. Two addresses are the same target when both
/// host and port match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct Address {
    pub host: String,
    pub port: u16,
}

impl Address {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid address '{0}': expected host:port")]
pub struct InvalidAddress(String);

impl FromStr for Address {
    type Err = InvalidAddress;

    /// Parses `host:port` or `[v6-host]:port`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidAddress(s.to_string());
        let (host, port) = s.rsplit_once(':').ok_or_else(invalid)?;
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        if host.is_empty() {
            return Err(invalid());
        }
        let port = port.parse::<u16>().map_err(|_| invalid())?;
        Ok(Self::new(host, port))
    }
}

/// What the forwarding layer should do with an intercepted connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingDecision {
    /// Connect to this address instead of the requested server.
    Redirect(Address),
    /// Leave the connection alone.
    Passthrough,
}

impl fmt::Display for RoutingDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redirect(addr) => write!(f, "Redirect({})", addr),
            Self::Passthrough => f.write_str("Passthrough"),
        }
    }
}
