//! Global scheduler launcher.

use crate::error::Result;
use crate::process::{spawn_service, ServiceCommand, ServiceKind};

use super::LaunchContext;

/// Starts one global scheduler process.
///
/// The scheduler needs only the coordination-store address; it discovers
/// everything else by reading the store.
pub async fn start(ctx: &LaunchContext<'_>, store_address: &str) -> Result<()> {
    let logs = ctx.logs("global_scheduler")?;
    let handle = spawn_service(
        "global scheduler",
        ServiceCommand::new(&ctx.binaries.global_scheduler)
            .arg("--store-address")
            .arg(store_address)
            .logs(logs),
    )?;
    ctx.track(ServiceKind::GlobalScheduler, handle).await;
    Ok(())
}
