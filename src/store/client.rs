//! # Minimal coordination-store client.
//!
//! The orchestrator consumes the store as a key-value service and needs only
//! three things from its wire contract: a no-op introspection command as a
//! liveness probe, runtime configuration writes, and a simple value write.
//! Commands are framed as length-prefixed argument arrays; replies are read
//! as a single status line.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::sleep;
use tracing::info;

use crate::error::{OrchestratorError, Result};

/// How many readiness probes to send before declaring the store unreachable.
pub const READY_RETRIES: u32 = 5;

/// Sleep between readiness probes.
pub const READY_INTERVAL: Duration = Duration::from_secs(1);

/// Connected client for one coordination store.
pub struct StoreClient {
    address: String,
    stream: TcpStream,
}

impl StoreClient {
    /// Connects to the store at `address` (`host:port`).
    pub async fn connect(address: &str) -> io::Result<Self> {
        let stream = TcpStream::connect(address).await?;
        Ok(Self {
            address: address.to_string(),
            stream,
        })
    }

    /// The address this client is connected to.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// No-op introspection command; succeeds iff the store answers at all.
    pub async fn ping(&mut self) -> io::Result<()> {
        self.request(&["PING"]).await.map(|_| ())
    }

    /// Sets a runtime configuration parameter. Idempotent on the store side.
    pub async fn config_set(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.request(&["CONFIG", "SET", key, value]).await.map(|_| ())
    }

    /// Writes a plain key/value record.
    pub async fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.request(&["SET", key, value]).await.map(|_| ())
    }

    async fn request(&mut self, parts: &[&str]) -> io::Result<String> {
        self.stream.write_all(&encode_command(parts)).await?;
        self.stream.flush().await?;

        let mut buf = [0u8; 512];
        let n = self.stream.read(&mut buf).await?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "store closed the connection",
            ));
        }
        let reply = String::from_utf8_lossy(&buf[..n]);
        let line = reply.lines().next().unwrap_or_default().to_string();
        if line.starts_with('-') {
            return Err(io::Error::other(format!("store error reply: {line}")));
        }
        Ok(line)
    }
}

/// Frames a command as a length-prefixed argument array.
fn encode_command(parts: &[&str]) -> Vec<u8> {
    let mut out = format!("*{}\r\n", parts.len()).into_bytes();
    for part in parts {
        out.extend_from_slice(format!("${}\r\n{part}\r\n", part.len()).as_bytes());
    }
    out
}

/// A retryable liveness check against one service.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Address of the probed service, for logs and errors.
    fn address(&self) -> &str;

    /// One probe attempt; true when the service answered.
    async fn check(&self) -> bool;
}

/// Connect-and-ping probe for the coordination store.
pub struct StoreProbe {
    address: String,
}

impl StoreProbe {
    /// Probe for the store at `address`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[async_trait]
impl Probe for StoreProbe {
    fn address(&self) -> &str {
        &self.address
    }

    async fn check(&self) -> bool {
        match StoreClient::connect(&self.address).await {
            Ok(mut client) => client.ping().await.is_ok(),
            Err(_) => false,
        }
    }
}

/// Polls `probe` until it answers, sleeping `interval` between attempts.
///
/// Exhausting `retries` is [`OrchestratorError::StoreUnreachable`]. Progress
/// is logged so a human watching bootstrap understands why it is slow.
pub async fn wait_until_ready(probe: &dyn Probe, retries: u32, interval: Duration) -> Result<()> {
    for attempt in 0..retries {
        info!(address = probe.address(), "waiting for the coordination store to respond");
        if probe.check().await {
            return Ok(());
        }
        if attempt + 1 < retries {
            info!(address = probe.address(), "store not responding yet, retrying");
            sleep(interval).await;
        }
    }
    Err(OrchestratorError::StoreUnreachable {
        address: probe.address().to_string(),
        retries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyProbe {
        address: String,
        calls: AtomicU32,
        succeed_at: u32,
    }

    #[async_trait]
    impl Probe for FlakyProbe {
        fn address(&self) -> &str {
            &self.address
        }

        async fn check(&self) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst) + 1 >= self.succeed_at
        }
    }

    fn flaky(succeed_at: u32) -> FlakyProbe {
        FlakyProbe {
            address: "127.0.0.1:0".into(),
            calls: AtomicU32::new(0),
            succeed_at,
        }
    }

    #[test]
    fn test_command_framing() {
        let framed = encode_command(&["CONFIG", "SET", "protected-mode", "no"]);
        let text = String::from_utf8(framed).unwrap();
        assert!(text.starts_with("*4\r\n$6\r\nCONFIG\r\n"));
        assert!(text.ends_with("$2\r\nno\r\n"));
    }

    #[tokio::test]
    async fn test_ready_after_transient_failures() {
        let probe = flaky(3);
        wait_until_ready(&probe, 5, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(probe.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_probes_are_store_unreachable() {
        let probe = flaky(u32::MAX);
        let err = wait_until_ready(&probe, 5, Duration::from_millis(1))
            .await
            .unwrap_err();
        assert_eq!(err.as_label(), "store_unreachable");
        assert_eq!(probe.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_client_round_trip_against_fake_store() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 512];
            loop {
                let n = match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => n,
                };
                let reply: &[u8] = if buf[..n].windows(4).any(|w| w == b"PING") {
                    b"+PONG\r\n"
                } else {
                    b"+OK\r\n"
                };
                if socket.write_all(reply).await.is_err() {
                    break;
                }
            }
        });

        let mut client = StoreClient::connect(&address).await.unwrap();
        client.ping().await.unwrap();
        client.config_set("protected-mode", "no").await.unwrap();
        client.set("store_start_time", "1234567890").await.unwrap();
    }
}
