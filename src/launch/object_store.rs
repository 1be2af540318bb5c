//! # Object-store pair launcher.
//!
//! Starts one storage process plus its network-facing manager and returns
//! the triple identifying the pair. The manager's port is either pinned by
//! the caller (a mismatch with what actually got bound is a fatal invariant
//! violation) or auto-selected under the bounded retry combinator.

use tokio::time::sleep;
use tracing::warn;

use crate::addr::random_port;
use crate::cluster::ObjectStoreAddress;
use crate::error::{OrchestratorError, Result};
use crate::policies::{spawn_until_live, RetryPolicy};
use crate::process::{spawn_service, ServiceCommand, ServiceKind};

use super::{socket_name, LaunchContext, STABILIZE};

/// Fraction of total system memory the store targets on shared-memory
/// platforms.
const SHM_TARGET_FRACTION: f64 = 0.4;

/// Fraction applied when falling back to what is actually free.
const FALLBACK_FRACTION: f64 = 0.8;

/// Starts an object store and its manager.
///
/// `slot` is the pairing index used only for log-file naming. When
/// `requested_manager_port` is pinned, the manager must bind exactly that
/// port; otherwise ports are auto-selected with collision retry.
pub async fn start(
    ctx: &LaunchContext<'_>,
    node_ip: &str,
    store_address: &str,
    slot: usize,
    requested_manager_port: Option<u16>,
    memory_bytes: Option<u64>,
) -> Result<ObjectStoreAddress> {
    let memory = memory_bytes.unwrap_or_else(default_memory_budget);

    // The storage process first.
    let store_socket = socket_name("object_store");
    let store_handle = spawn_service(
        "object store",
        ServiceCommand::new(&ctx.binaries.object_store)
            .arg("--socket-name")
            .arg(&store_socket)
            .arg("--memory-bytes")
            .arg(memory.to_string())
            .logs(ctx.logs(&format!("object_store_{slot}"))?),
    )?;
    ctx.track(ServiceKind::ObjectStore, store_handle).await;
    sleep(STABILIZE).await;

    // Then its manager, which is the port-bearing half of the pair.
    let manager_socket = socket_name("object_manager");
    let policy = match requested_manager_port {
        Some(_) => RetryPolicy::single(STABILIZE),
        None => RetryPolicy::default(),
    };
    let outcome = spawn_until_live(
        &policy,
        "object store manager",
        || requested_manager_port.unwrap_or_else(random_port),
        |port| {
            spawn_service(
                "object store manager",
                ServiceCommand::new(&ctx.binaries.object_manager)
                    .arg("--store-socket-name")
                    .arg(&store_socket)
                    .arg("--socket-name")
                    .arg(&manager_socket)
                    .arg("--node-ip-address")
                    .arg(node_ip)
                    .arg("--store-address")
                    .arg(store_address)
                    .arg("--port")
                    .arg(port.to_string())
                    .logs(ctx.logs(&format!("object_manager_{slot}"))?),
            )
        },
    )
    .await?;
    let (manager_port, manager_handle) =
        outcome.ok_or(OrchestratorError::ServiceStartFailed {
            service: "object store manager",
            attempts: policy.attempts,
        })?;

    if let Some(requested) = requested_manager_port {
        // Never fall back silently when the caller pinned a port.
        if manager_port != requested {
            return Err(OrchestratorError::invariant(format!(
                "object store manager bound port {manager_port}, caller requested {requested}"
            )));
        }
    }
    ctx.track(ServiceKind::ObjectStoreManager, manager_handle).await;

    Ok(ObjectStoreAddress {
        store_socket,
        manager_socket,
        manager_port,
    })
}

/// Computes the default store memory budget for this host.
///
/// On shared-memory-backed platforms the store lives in `/dev/shm`, whose
/// size is typically half of physical memory; target 40% of total memory but
/// cap at 80% of what the shared-memory filesystem actually has free.
/// Elsewhere, 80% of total memory.
fn default_memory_budget() -> u64 {
    let mut system = sysinfo::System::new();
    system.refresh_memory();
    let total = system.total_memory();

    #[cfg(target_os = "linux")]
    {
        let mut budget = (total as f64 * SHM_TARGET_FRACTION) as u64;
        if let Some(shm_available) = shm_available_bytes() {
            if budget > shm_available {
                warn!(
                    shm_available,
                    "reducing object store memory: /dev/shm is low on space; free up files \
                     there, or grow it (e.g. docker run --shm-size)"
                );
                budget = (shm_available as f64 * FALLBACK_FRACTION) as u64;
            }
        }
        budget
    }
    #[cfg(not(target_os = "linux"))]
    {
        (total as f64 * FALLBACK_FRACTION) as u64
    }
}

/// Free bytes in the shared-memory filesystem.
#[cfg(target_os = "linux")]
fn shm_available_bytes() -> Option<u64> {
    let path = std::ffi::CString::new("/dev/shm").ok()?;
    let mut stats: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(path.as_ptr(), &mut stats) };
    if rc != 0 {
        return None;
    }
    Some(stats.f_bsize as u64 * stats.f_bavail as u64)
}
