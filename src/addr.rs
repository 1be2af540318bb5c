//! # Address codec.
//!
//! Pure helpers for the `host:port` identifiers the cluster components hand
//! to each other, plus the randomized ports and name tokens used to mint
//! fresh sockets and log files.
//!
//! ## Rules
//! - [`encode`] / [`host_of`] / [`port_of`] round-trip:
//!   `encode(host_of(a)?, port_of(a)?) == a` for every valid address.
//! - [`random_port`] gives no uniqueness guarantee; callers must treat a
//!   bind failure as ordinary and retry with a fresh value.

use std::net::UdpSocket;

use rand::Rng;

use crate::error::{OrchestratorError, Result};

/// Encodes an IP address and port into the canonical `"ip:port"` form.
///
/// # Example
/// ```
/// assert_eq!(clustervisor::encode("127.0.0.1", 6379), "127.0.0.1:6379");
/// ```
pub fn encode(ip: &str, port: u16) -> String {
    format!("{ip}:{port}")
}

/// Extracts the host part of an `"ip:port"` address.
///
/// Fails with [`OrchestratorError::MalformedAddress`] when the string has no
/// `:` separator.
pub fn host_of(address: &str) -> Result<&str> {
    match address.split_once(':') {
        Some((host, _)) if !host.is_empty() => Ok(host),
        _ => Err(OrchestratorError::MalformedAddress {
            address: address.to_string(),
        }),
    }
}

/// Extracts the port part of an `"ip:port"` address.
///
/// Fails with [`OrchestratorError::MalformedAddress`] when the string has no
/// `:` separator or the port segment is not an integer.
pub fn port_of(address: &str) -> Result<u16> {
    let (_, port) = address
        .split_once(':')
        .ok_or_else(|| OrchestratorError::MalformedAddress {
            address: address.to_string(),
        })?;
    port.parse()
        .map_err(|_| OrchestratorError::MalformedAddress {
            address: address.to_string(),
        })
}

/// Picks a random port in `[10000, 65535]`.
///
/// Not guaranteed free: the caller handles a bind failure by asking again.
pub fn random_port() -> u16 {
    rand::thread_rng().gen_range(10000..=65535)
}

/// Mints a token of random decimal digits, used to build unique socket and
/// file names across repeated runs.
pub fn random_token() -> String {
    format!("{}", rand::thread_rng().gen_range(0..100_000_000u32))
}

/// Determines the IP address this node uses to reach the network.
///
/// Connects a UDP socket to `probe` (any known live `host:port` on the
/// network you care about; defaults work for internet-connected hosts) and
/// reads back the local socket name. No packet is actually sent.
pub fn node_ip_address(probe: &str) -> Result<String> {
    // Validate the shape first so a bad probe is a MalformedAddress, not an
    // opaque I/O error.
    host_of(probe)?;
    port_of(probe)?;
    let socket = UdpSocket::bind("0.0.0.0:0").map_err(|source| OrchestratorError::Spawn {
        service: "node ip discovery",
        source,
    })?;
    socket
        .connect(probe)
        .and_then(|_| socket.local_addr())
        .map(|local| local.ip().to_string())
        .map_err(|source| OrchestratorError::Spawn {
            service: "node ip discovery",
            source,
        })
}

/// Default probe target for [`node_ip_address`].
pub const DEFAULT_IP_PROBE: &str = "8.8.8.8:53";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_round_trip() {
        for address in ["127.0.0.1:6379", "10.1.2.3:10000", "localhost:65535"] {
            let host = host_of(address).unwrap();
            let port = port_of(address).unwrap();
            assert_eq!(encode(host, port), address);
        }
    }

    #[test]
    fn test_missing_colon_is_malformed() {
        let err = host_of("127.0.0.1").unwrap_err();
        assert_eq!(err.as_label(), "malformed_address");
        let err = port_of("127.0.0.1").unwrap_err();
        assert_eq!(err.as_label(), "malformed_address");
    }

    #[test]
    fn test_non_integer_port_is_malformed() {
        let err = port_of("127.0.0.1:http").unwrap_err();
        assert_eq!(err.as_label(), "malformed_address");
    }

    #[test]
    fn test_empty_host_is_malformed() {
        assert!(host_of(":6379").is_err());
    }

    #[test]
    fn test_random_port_stays_in_range() {
        for _ in 0..1000 {
            let port = random_port();
            assert!(port >= 10000);
        }
    }

    #[test]
    fn test_random_token_is_decimal() {
        let token = random_token();
        assert!(!token.is_empty());
        assert!(token.chars().all(|c| c.is_ascii_digit()));
    }
}
