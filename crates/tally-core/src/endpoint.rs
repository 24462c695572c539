//! `host:port` addresses accepted by `-a` / `ADDRESS`.

use std::fmt;
use std::str::FromStr;

use crate::error::EndpointError;

/// A `host:port` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new("localhost", 8080)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let (Some(host), Some(port), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(EndpointError::Format(s.to_string()));
        };
        let port = port.parse::<u16>().map_err(|e| EndpointError::Port {
            input: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(host, port))
    }
}
