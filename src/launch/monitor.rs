//! Monitor launcher.

use crate::error::Result;
use crate::process::{spawn_service, ServiceCommand, ServiceKind};

use super::LaunchContext;

/// Starts the process that watches cluster health.
///
/// What the monitor does with the store is outside this crate's scope; it is
/// an external collaborator.
pub async fn start(ctx: &LaunchContext<'_>, store_address: &str) -> Result<()> {
    let logs = ctx.logs("monitor")?;
    let handle = spawn_service(
        "monitor",
        ServiceCommand::new(&ctx.binaries.monitor)
            .arg("--store-address")
            .arg(store_address)
            .logs(logs),
    )?;
    ctx.track(ServiceKind::Monitor, handle).await;
    Ok(())
}
