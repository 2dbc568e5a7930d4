//! Listen address parsing
//!
//! Accepts `host:port`, `host:` (ephemeral port), `:port` (default host),
//! a bare host, or an empty string.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Host used when the address leaves it out
pub const DEFAULT_HOST: &str = "localhost";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid port '{port}' in listen address '{input}'")]
    InvalidPort { input: String, port: String },
}

/// Bind host and port for the listener. Port 0 asks the OS for an ephemeral port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenAddress {
    pub host: String,
    pub port: u16,
}

impl ListenAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl Default for ListenAddress {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, 0)
    }
}

impl FromStr for ListenAddress {
    type Err = AddressError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (host, port) = match input.rfind(':') {
            // "[::1]" has colons but no port
            Some(idx) if !input.ends_with(']') => (&input[..idx], &input[idx + 1..]),
            _ => (input, ""),
        };

        let host = host.trim_start_matches('[').trim_end_matches(']');
        let host = if host.is_empty() { DEFAULT_HOST } else { host };

        let port = if port.is_empty() {
            0
        } else {
            port.parse::<u16>().map_err(|_| AddressError::InvalidPort {
                input: input.to_string(),
                port: port.to_string(),
            })?
        };

        Ok(Self::new(host, port))
    }
}

impl fmt::Display for ListenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
