//! # Starting (or attaching to) the coordination store.
//!
//! The store picks up a `--port` argument and either binds it or exits
//! almost immediately, so startup runs under the bounded retry combinator:
//! auto-chosen ports are mutated on collision, an explicitly pinned port is
//! tried exactly once and its failure is immediately fatal.
//!
//! Once the process survives its liveness window the store is actively
//! polled with a no-op command, then configured for cross-host visibility
//! and change notifications, and stamped with its start time.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

use crate::addr::random_port;
use crate::error::{OrchestratorError, Result};
use crate::logs::{new_log_files, DEFAULT_LOG_DIR};
use crate::policies::{spawn_until_live, RetryPolicy};
use crate::process::{spawn_service, ProcessHandle, ProcessRegistry, ServiceCommand, ServiceKind};
use crate::store::client::{wait_until_ready, StoreClient, StoreProbe, READY_INTERVAL, READY_RETRIES};

/// Configuration for one coordination-store launch.
#[derive(Clone, Debug)]
pub struct StoreStartConfig {
    /// Store server binary.
    pub program: PathBuf,
    /// Pinned port; `None` picks random ports with collision retry.
    pub requested_port: Option<u16>,
    /// Launch attempt budget. Must be 1 when `requested_port` is pinned.
    pub retry_budget: u32,
    /// Register the process for automatic teardown.
    pub cleanup: bool,
    /// Directory for redirected output.
    pub log_dir: PathBuf,
    /// Redirect the store's stdout/stderr into log files.
    pub redirect_output: bool,
}

impl Default for StoreStartConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("clustervisor-store"),
            requested_port: None,
            retry_budget: RetryPolicy::default().attempts,
            cleanup: true,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            redirect_output: false,
        }
    }
}

/// Starts the coordination store and blocks until it answers.
///
/// Returns the port the store is serving on, plus the process handle when
/// the registry did not take it: with `cfg.cleanup` set the handle is
/// registered under [`ServiceKind::CoordinationStore`] and `None` is
/// returned, otherwise the caller receives the handle and owns the process.
///
/// # Errors
/// - [`OrchestratorError::InvalidConfig`] when a pinned port comes with a
///   retry budget other than 1 — rejected before any process is spawned.
/// - [`OrchestratorError::StoreStartFailed`] when the launch budget is
///   exhausted.
/// - [`OrchestratorError::StoreUnreachable`] when the process is alive but
///   never answers the readiness probe.
pub async fn start_store(
    cfg: &StoreStartConfig,
    registry: &ProcessRegistry,
) -> Result<(u16, Option<ProcessHandle>)> {
    if cfg.requested_port.is_some() && cfg.retry_budget != 1 {
        return Err(OrchestratorError::config(
            "retry budget must be 1 when the store port is pinned",
        ));
    }

    let policy = RetryPolicy {
        attempts: cfg.retry_budget,
        ..RetryPolicy::default()
    };
    let outcome = spawn_until_live(
        &policy,
        "coordination store",
        || cfg.requested_port.unwrap_or_else(random_port),
        |port| {
            let logs = new_log_files(&cfg.log_dir, "coordination_store", cfg.redirect_output)?;
            spawn_service(
                "coordination store",
                ServiceCommand::new(&cfg.program)
                    .arg("--port")
                    .arg(port.to_string())
                    .arg("--loglevel")
                    .arg("warning")
                    .logs(logs),
            )
        },
    )
    .await?;
    let (port, handle) = outcome.ok_or(OrchestratorError::StoreStartFailed {
        attempts: cfg.retry_budget,
    })?;

    // The process is up; now wait for it to actually serve.
    let local_address = format!("127.0.0.1:{port}");
    wait_until_ready(&StoreProbe::new(&local_address), READY_RETRIES, READY_INTERVAL).await?;
    configure_store(&local_address).await?;
    info!(port, pid = handle.pid(), "coordination store is ready");

    if cfg.cleanup {
        registry.register(ServiceKind::CoordinationStore, handle).await;
        Ok((port, None))
    } else {
        Ok((port, Some(handle)))
    }
}

/// Post-start configuration. Idempotent: safe to re-apply on re-attach.
async fn configure_store(address: &str) -> Result<()> {
    let store_io = |source| OrchestratorError::StoreIo {
        address: address.to_string(),
        source,
    };
    let mut client = StoreClient::connect(address).await.map_err(store_io)?;
    // Notify other components on key mutations.
    client
        .config_set("notify-keyspace-events", "Kl")
        .await
        .map_err(store_io)?;
    // Allow connections from other hosts.
    client
        .config_set("protected-mode", "no")
        .await
        .map_err(store_io)?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    client
        .set("store_start_time", &now.to_string())
        .await
        .map_err(store_io)
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::RegistryConfig;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn registry() -> ProcessRegistry {
        ProcessRegistry::new(RegistryConfig::default())
    }

    /// Writes an executable stub that ignores its arguments and stays alive,
    /// standing in for the real store binary.
    fn stub_binary(dir: &std::path::Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("store-stub.sh");
        std::fs::write(&path, "#!/bin/sh\nexec sleep 30\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Binds a free port and answers store commands on it, standing in for
    /// the external store service the spawned process would have become.
    async fn fake_store() -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                tokio::spawn(async move {
                    let mut buf = [0u8; 512];
                    while let Ok(n) = socket.read(&mut buf).await {
                        if n == 0 || socket.write_all(b"+OK\r\n").await.is_err() {
                            break;
                        }
                    }
                });
            }
        });
        port
    }

    #[tokio::test]
    async fn test_pinned_port_requires_budget_of_one() {
        let cfg = StoreStartConfig {
            // Would fail to spawn if it ever got that far.
            program: PathBuf::from("no_such_store_binary"),
            requested_port: Some(6379),
            retry_budget: 3,
            ..StoreStartConfig::default()
        };
        let err = start_store(&cfg, &registry()).await.unwrap_err();
        // Rejected before any spawn: config error, not a spawn error.
        assert_eq!(err.as_label(), "invalid_config");
    }

    #[tokio::test]
    async fn test_exhausted_budget_is_store_start_failed() {
        let cfg = StoreStartConfig {
            // Exits instantly; every attempt looks like a port collision.
            program: PathBuf::from("true"),
            retry_budget: 2,
            redirect_output: false,
            ..StoreStartConfig::default()
        };
        let err = start_store(&cfg, &registry()).await.unwrap_err();
        match err {
            OrchestratorError::StoreStartFailed { attempts } => assert_eq!(attempts, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_started_store_is_probed_configured_and_registered() {
        let dir = tempfile::tempdir().unwrap();
        let port = fake_store().await;
        let registry = registry();
        let cfg = StoreStartConfig {
            program: stub_binary(dir.path()),
            requested_port: Some(port),
            retry_budget: 1,
            ..StoreStartConfig::default()
        };
        // The stub ignores the --port args and just stays alive; the fake
        // listener plays the role of the bound service.
        let (got, handle) = start_store(&cfg, &registry).await.unwrap();
        assert_eq!(got, port);
        // The registry took the handle.
        assert!(handle.is_none());

        let counts = registry.counts().await;
        let stores = counts
            .iter()
            .find(|(kind, _)| *kind == ServiceKind::CoordinationStore)
            .unwrap();
        assert_eq!(stores.1, 1);
        assert!(registry.teardown_all().await);
    }

    #[tokio::test]
    async fn test_attach_only_launch_hands_the_caller_the_handle() {
        let dir = tempfile::tempdir().unwrap();
        let port = fake_store().await;
        let registry = registry();
        let cfg = StoreStartConfig {
            program: stub_binary(dir.path()),
            requested_port: Some(port),
            retry_budget: 1,
            cleanup: false,
            ..StoreStartConfig::default()
        };
        let (_, handle) = start_store(&cfg, &registry).await.unwrap();
        assert!(registry.counts().await.iter().all(|(_, n)| *n == 0));

        // Ownership stays with the caller, who can still supervise it.
        let mut handle = handle.unwrap();
        assert!(handle.is_alive());
        handle.kill();
        handle.wait().await;
        assert!(!handle.is_alive());
    }
}
