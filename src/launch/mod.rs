//! Service launchers.
//!
//! One narrow factory per service kind. Each launcher gets the addresses of
//! its already-running dependencies, spawns the process, registers the
//! handle under the cleanup policy, and returns whatever identifiers the
//! next layer needs. None of them know anything about the services'
//! internals; those are external collaborators.

pub mod dashboard;
pub mod global_scheduler;
pub mod local_unit;
pub mod monitor;
pub mod object_store;
pub mod worker;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::addr::random_token;
use crate::error::Result;
use crate::logs::{new_log_files, LogFiles};
use crate::process::{ProcessHandle, ProcessRegistry, ServiceKind};

/// How long a freshly spawned service gets to fail fast before the next
/// bootstrap step proceeds.
pub(crate) const STABILIZE: Duration = Duration::from_millis(100);

/// Program paths for every external service this crate can launch.
///
/// Defaults assume the service binaries are on `PATH`; deployments (and
/// tests) override them.
#[derive(Clone, Debug)]
pub struct ServiceBinaries {
    /// Coordination-store server.
    pub store: PathBuf,
    /// Global scheduler daemon.
    pub global_scheduler: PathBuf,
    /// Per-node scheduling unit.
    pub local_unit: PathBuf,
    /// Object storage process.
    pub object_store: PathBuf,
    /// Object-store manager process.
    pub object_manager: PathBuf,
    /// Cluster-health monitor.
    pub monitor: PathBuf,
    /// Dashboard backend server.
    pub dashboard_backend: PathBuf,
    /// Dashboard frontend asset server.
    pub dashboard_frontend: PathBuf,
    /// Working directory holding the dashboard's frontend assets.
    pub dashboard_dir: PathBuf,
}

impl Default for ServiceBinaries {
    fn default() -> Self {
        Self {
            store: PathBuf::from("clustervisor-store"),
            global_scheduler: PathBuf::from("clustervisor-global-scheduler"),
            local_unit: PathBuf::from("clustervisor-unit"),
            object_store: PathBuf::from("clustervisor-object-store"),
            object_manager: PathBuf::from("clustervisor-object-manager"),
            monitor: PathBuf::from("clustervisor-monitor"),
            dashboard_backend: PathBuf::from("clustervisor-dashboard"),
            dashboard_frontend: PathBuf::from("serve"),
            dashboard_dir: PathBuf::from("/usr/share/clustervisor/dashboard"),
        }
    }
}

/// Shared dependencies every launcher needs.
pub struct LaunchContext<'a> {
    /// Registry that tracked processes are appended to.
    pub registry: &'a ProcessRegistry,
    /// Program paths.
    pub binaries: &'a ServiceBinaries,
    /// Directory for redirected process output.
    pub log_dir: &'a Path,
    /// Whether spawned processes get their streams redirected to files.
    pub redirect_output: bool,
    /// Whether launched processes are registered for automatic teardown.
    pub cleanup: bool,
}

impl LaunchContext<'_> {
    /// Provisions log files for one process tag, honoring the redirect flag.
    pub(crate) fn logs(&self, tag: &str) -> Result<Option<LogFiles>> {
        new_log_files(self.log_dir, tag, self.redirect_output)
    }

    /// Registers the handle when cleanup tracking was requested; otherwise
    /// the handle is released to run untracked.
    pub(crate) async fn track(&self, kind: ServiceKind, handle: ProcessHandle) {
        if self.cleanup {
            self.registry.register(kind, handle).await;
        }
    }
}

/// Mints a fresh opaque socket name for one service process.
pub(crate) fn socket_name(tag: &str) -> String {
    format!("/tmp/clustervisor_{tag}_{}", random_token())
}
