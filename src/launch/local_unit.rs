//! Local scheduling-unit launcher.

use std::path::Path;

use tokio::time::sleep;

use crate::addr::encode;
use crate::cluster::ObjectStoreAddress;
use crate::error::Result;
use crate::process::{spawn_service, ServiceCommand, ServiceKind};

use super::{socket_name, LaunchContext, STABILIZE};

/// Static resource counts one scheduling unit is configured with.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnitResources {
    /// CPU count; `None` defaults to the host's hardware thread count.
    pub cpus: Option<usize>,
    /// GPU count; `None` defaults to 0.
    pub gpus: Option<usize>,
}

/// Starts one local scheduling unit, paired with `object_store`.
///
/// When `num_workers > 0` the unit is instructed to spawn that many worker
/// subprocesses itself, which replaces the separate worker-launch step for
/// this unit. Returns the unit's socket name.
#[allow(clippy::too_many_arguments)]
pub async fn start(
    ctx: &LaunchContext<'_>,
    store_address: &str,
    node_ip: &str,
    object_store: &ObjectStoreAddress,
    worker_path: &Path,
    resources: UnitResources,
    num_workers: usize,
    slot: usize,
) -> Result<String> {
    let cpus = resources.cpus.unwrap_or_else(num_cpus::get);
    let gpus = resources.gpus.unwrap_or(0);
    let unit_socket = socket_name("unit");
    let manager_address = encode(node_ip, object_store.manager_port);

    let mut command = ServiceCommand::new(&ctx.binaries.local_unit)
        .arg("--socket-name")
        .arg(&unit_socket)
        .arg("--store-socket-name")
        .arg(&object_store.store_socket)
        .arg("--manager-socket-name")
        .arg(&object_store.manager_socket)
        .arg("--manager-address")
        .arg(manager_address)
        .arg("--node-ip-address")
        .arg(node_ip)
        .arg("--store-address")
        .arg(store_address)
        .arg("--num-cpus")
        .arg(cpus.to_string())
        .arg("--num-gpus")
        .arg(gpus.to_string())
        .arg("--worker-path")
        .arg(worker_path.display().to_string());
    if num_workers > 0 {
        command = command.arg("--num-workers").arg(num_workers.to_string());
    }

    let handle = spawn_service(
        "local scheduling unit",
        command.logs(ctx.logs(&format!("local_scheduling_unit_{slot}"))?),
    )?;
    ctx.track(ServiceKind::LocalSchedulingUnit, handle).await;
    // Let a misconfigured unit fail fast before the next bootstrap step.
    sleep(STABILIZE).await;
    Ok(unit_socket)
}
