//! Addressing of the collector server.

use std::fmt;

use tally_core::Endpoint;

/// `scheme://host:port` of the server the agent reports to.
///
/// The sender speaks plain HTTP only; any other scheme is refused at send
/// time with [`SendError::UnsupportedScheme`](crate::SendError::UnsupportedScheme).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl ServerEndpoint {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            port,
        }
    }

    /// Plain-HTTP endpoint for a parsed `host:port`.
    pub fn http(endpoint: &Endpoint) -> Self {
        Self::new("http", endpoint.host.clone(), endpoint.port)
    }

    pub fn is_plain_http(&self) -> bool {
        self.scheme.eq_ignore_ascii_case("http")
    }

    /// `host:port`, used both for connecting and as the `Host` header.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Join `path` onto the endpoint. Leading slashes on `path` are dropped.
    pub fn create_url(&self, path: &str) -> String {
        format!("{}/{}", self, path.trim_start_matches('/'))
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

impl From<&Endpoint> for ServerEndpoint {
    fn from(endpoint: &Endpoint) -> Self {
        Self::http(endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_url_strips_leading_slash() {
        let endpoint = ServerEndpoint::new("http", "localhost", 8080);
        assert_eq!(endpoint.create_url("/update/"), "http://localhost:8080/update/");
        assert_eq!(endpoint.create_url("update/"), "http://localhost:8080/update/");
        assert_eq!(endpoint.create_url("//value"), "http://localhost:8080/value");
        assert_eq!(endpoint.create_url(""), "http://localhost:8080/");
    }

    #[test]
    fn from_parsed_endpoint() {
        let parsed: Endpoint = "127.0.0.1:9000".parse().unwrap();
        let endpoint = ServerEndpoint::from(&parsed);
        assert_eq!(endpoint.to_string(), "http://127.0.0.1:9000");
        assert_eq!(endpoint.authority(), "127.0.0.1:9000");
        assert!(endpoint.is_plain_http());
        assert!(!ServerEndpoint::new("https", "localhost", 443).is_plain_http());
    }
}
