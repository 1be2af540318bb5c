//! Worker launcher.

use std::path::Path;

use crate::cluster::ObjectStoreAddress;
use crate::error::Result;
use crate::process::{spawn_service, ServiceCommand, ServiceKind};

use super::LaunchContext;

/// Starts one worker process.
///
/// The worker gets all four addressing identifiers (node IP, store socket,
/// manager socket, scheduling-unit socket) plus the coordination-store
/// address; `worker_path` is the work-execution entry point it runs.
#[allow(clippy::too_many_arguments)]
pub async fn start(
    ctx: &LaunchContext<'_>,
    node_ip: &str,
    object_store: &ObjectStoreAddress,
    unit_socket: &str,
    store_address: &str,
    worker_path: &Path,
    slot: usize,
    index: usize,
) -> Result<()> {
    let logs = ctx.logs(&format!("worker_{slot}_{index}"))?;
    let handle = spawn_service(
        "worker",
        ServiceCommand::new(worker_path)
            .arg(format!("--node-ip-address={node_ip}"))
            .arg(format!("--store-socket-name={}", object_store.store_socket))
            .arg(format!("--manager-socket-name={}", object_store.manager_socket))
            .arg(format!("--unit-socket-name={unit_socket}"))
            .arg(format!("--store-address={store_address}"))
            .logs(logs),
    )?;
    ctx.track(ServiceKind::Worker, handle).await;
    Ok(())
}
