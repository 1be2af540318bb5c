//! # Dashboard launcher.
//!
//! The dashboard is best-effort: a backend server is started against the
//! coordination store, then a frontend asset server in the dashboard's
//! working directory. Launch is modeled as an explicit state machine with
//! transition-triggered cleanup, and failure never propagates past this
//! boundary — the rest of cluster bootstrap must not care.
//!
//! ```text
//! BackendStarting ──► BackendLive ──► FrontendStarting ──► BothLive
//!        │                                   │
//!        └──────────────► Failed ◄───────────┘  (kills the live backend)
//! ```

use tokio::time::sleep;
use tracing::{info, warn};

use crate::process::{spawn_service, ProcessHandle, ServiceCommand, ServiceKind};

use super::{LaunchContext, STABILIZE};

/// Port the frontend asset server listens on.
const FRONTEND_PORT: u16 = 8080;

enum Stage {
    BackendStarting,
    BackendLive,
    FrontendStarting,
    BothLive,
    Failed(&'static str),
}

/// Attempts to start the dashboard. Returns whether both stages came up.
///
/// On any stage failure the already-started backend is killed, the reason is
/// logged, and `false` is returned; this function never errors.
pub async fn start(ctx: &LaunchContext<'_>, store_address: &str) -> bool {
    let mut backend: Option<ProcessHandle> = None;
    let mut frontend: Option<ProcessHandle> = None;
    let mut stage = Stage::BackendStarting;

    loop {
        stage = match stage {
            Stage::BackendStarting => match spawn_backend(ctx, store_address).await {
                Ok(handle) => {
                    backend = Some(handle);
                    Stage::BackendLive
                }
                Err(reason) => Stage::Failed(reason),
            },
            Stage::BackendLive => Stage::FrontendStarting,
            Stage::FrontendStarting => match spawn_frontend(ctx).await {
                Ok(handle) => {
                    frontend = Some(handle);
                    Stage::BothLive
                }
                Err(reason) => Stage::Failed(reason),
            },
            Stage::BothLive => {
                // Both halves are tracked under the same kind.
                if let Some(handle) = backend.take() {
                    ctx.track(ServiceKind::Dashboard, handle).await;
                }
                if let Some(handle) = frontend.take() {
                    ctx.track(ServiceKind::Dashboard, handle).await;
                }
                info!(port = FRONTEND_PORT, "dashboard is being served");
                return true;
            }
            Stage::Failed(reason) => {
                warn!(reason, "dashboard failed to start");
                if let Some(mut handle) = backend.take() {
                    // The backend is useless without the frontend.
                    handle.kill();
                    handle.wait().await;
                }
                return false;
            }
        };
    }
}

async fn spawn_backend(
    ctx: &LaunchContext<'_>,
    store_address: &str,
) -> Result<ProcessHandle, &'static str> {
    let logs = ctx
        .logs("dashboard_backend")
        .map_err(|_| "could not provision backend log files")?;
    let mut handle = spawn_service(
        "dashboard backend",
        ServiceCommand::new(&ctx.binaries.dashboard_backend)
            .arg("--store-address")
            .arg(store_address)
            .logs(logs),
    )
    .map_err(|_| "backend failed to spawn")?;

    sleep(STABILIZE).await;
    if !handle.is_alive() {
        return Err("backend exited during startup");
    }
    Ok(handle)
}

async fn spawn_frontend(ctx: &LaunchContext<'_>) -> Result<ProcessHandle, &'static str> {
    let logs = ctx
        .logs("dashboard_frontend")
        .map_err(|_| "could not provision frontend log files")?;
    let mut handle = spawn_service(
        "dashboard frontend",
        ServiceCommand::new(&ctx.binaries.dashboard_frontend)
            .arg("serve")
            .arg("--port")
            .arg(FRONTEND_PORT.to_string())
            .cwd(&ctx.binaries.dashboard_dir)
            .logs(logs),
    )
    .map_err(|_| "frontend failed to spawn")?;

    // Startup errors here typically surface within seconds, not within this
    // window, so this mostly catches a missing frontend toolchain.
    sleep(STABILIZE).await;
    if !handle.is_alive() {
        return Err("frontend exited during startup");
    }
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launch::ServiceBinaries;
    use crate::process::{ProcessRegistry, RegistryConfig};
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    fn stub_binary(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\nexec sleep 30\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn binaries(dir: &Path, backend: PathBuf, frontend: PathBuf) -> ServiceBinaries {
        ServiceBinaries {
            dashboard_backend: backend,
            dashboard_frontend: frontend,
            dashboard_dir: dir.to_path_buf(),
            ..ServiceBinaries::default()
        }
    }

    #[tokio::test]
    async fn test_both_stages_live_tracks_two_handles() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ProcessRegistry::new(RegistryConfig::default());
        let binaries = binaries(
            dir.path(),
            stub_binary(dir.path(), "backend.sh"),
            stub_binary(dir.path(), "frontend.sh"),
        );
        let ctx = LaunchContext {
            registry: &registry,
            binaries: &binaries,
            log_dir: dir.path(),
            redirect_output: false,
            cleanup: true,
        };

        assert!(start(&ctx, "127.0.0.1:6379").await);
        let dashboards = registry
            .counts()
            .await
            .into_iter()
            .find(|(kind, _)| *kind == ServiceKind::Dashboard)
            .unwrap();
        assert_eq!(dashboards.1, 2);
        registry.teardown_all().await;
    }

    #[tokio::test]
    async fn test_frontend_failure_degrades_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ProcessRegistry::new(RegistryConfig::default());
        let binaries = binaries(
            dir.path(),
            stub_binary(dir.path(), "backend.sh"),
            // Exits immediately: the frontend never becomes live.
            PathBuf::from("true"),
        );
        let ctx = LaunchContext {
            registry: &registry,
            binaries: &binaries,
            log_dir: dir.path(),
            redirect_output: false,
            cleanup: true,
        };

        assert!(!start(&ctx, "127.0.0.1:6379").await);
        // Nothing tracked; the backend was killed on the failure transition.
        assert!(registry.counts().await.iter().all(|(_, n)| *n == 0));
    }

    #[tokio::test]
    async fn test_backend_spawn_failure_degrades_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ProcessRegistry::new(RegistryConfig::default());
        let binaries = binaries(
            dir.path(),
            PathBuf::from("no_such_dashboard_backend"),
            stub_binary(dir.path(), "frontend.sh"),
        );
        let ctx = LaunchContext {
            registry: &registry,
            binaries: &binaries,
            log_dir: dir.path(),
            redirect_output: false,
            cleanup: true,
        };

        assert!(!start(&ctx, "127.0.0.1:6379").await);
        assert!(registry.counts().await.iter().all(|(_, n)| *n == 0));
    }
}
