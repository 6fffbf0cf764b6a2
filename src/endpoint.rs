//! `HOST:PORT` endpoint parsing.
//!
//! The string is split at the **last** colon, so unbracketed IPv6 literals
//! such as `::1:7147` work. Brackets are not stripped: `[::1]:7147` yields
//! the host `[::1]`, which the resolver will reject.

use std::fmt;
use std::str::FromStr;

use crate::error::NtshError;

/// A remote endpoint to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Host name or address literal.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Endpoint {
    /// Create an endpoint from its parts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl FromStr for Endpoint {
    type Err = NtshError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| NtshError::InvalidEndpoint {
            value: value.to_string(),
            reason,
        };

        let (host, port) = value.rsplit_once(':').ok_or_else(|| invalid(": not found"))?;
        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| invalid("port must be a number between 0 and 65535"))?;

        Ok(Self::new(host, port))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
