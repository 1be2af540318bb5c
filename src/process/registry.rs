//! # Process registry - the supervision table for one orchestrator.
//!
//! The registry maps a [`ServiceKind`] to the insertion-ordered list of
//! process handles started for that kind. It is an explicit owned structure
//! injected into the orchestration driver and launchers, never ambient
//! global state; all mutation goes through an async mutex so concurrent
//! callers in the same process stay safe.
//!
//! ## Teardown order
//! Kinds are torn down in the fixed order of [`ServiceKind::ALL`]. The order
//! matters for clean log output: dependents (workers) must be killed before
//! or alongside their dependencies (schedulers, the store), never
//! conspicuously after the dependency is already gone.
//!
//! ## Rules
//! - Handles are appended only by successful launches under the cleanup flag.
//! - One stuck process never aborts teardown of the rest; the result is an
//!   aggregate flag plus a single summary warning.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use super::handle::ProcessHandle;

/// The kinds of service processes the orchestrator supervises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    /// Cluster-health monitor.
    Monitor,
    /// Work-execution process.
    Worker,
    /// Per-node scheduling unit dispatching work to local workers.
    LocalSchedulingUnit,
    /// Network-facing manager of an object store.
    ObjectStoreManager,
    /// Object storage process.
    ObjectStore,
    /// Cluster-wide scheduler daemon.
    GlobalScheduler,
    /// Shared key-value service used for discovery and signaling.
    CoordinationStore,
    /// Optional dashboard (backend and frontend processes).
    Dashboard,
}

impl ServiceKind {
    /// All kinds, in teardown order.
    pub const ALL: [ServiceKind; 8] = [
        ServiceKind::Monitor,
        ServiceKind::Worker,
        ServiceKind::LocalSchedulingUnit,
        ServiceKind::ObjectStoreManager,
        ServiceKind::ObjectStore,
        ServiceKind::GlobalScheduler,
        ServiceKind::CoordinationStore,
        ServiceKind::Dashboard,
    ];

    /// Stable snake_case tag, used in log-file names and log lines.
    pub fn label(&self) -> &'static str {
        match self {
            ServiceKind::Monitor => "monitor",
            ServiceKind::Worker => "worker",
            ServiceKind::LocalSchedulingUnit => "local_scheduling_unit",
            ServiceKind::ObjectStoreManager => "object_store_manager",
            ServiceKind::ObjectStore => "object_store",
            ServiceKind::GlobalScheduler => "global_scheduler",
            ServiceKind::CoordinationStore => "coordination_store",
            ServiceKind::Dashboard => "dashboard",
        }
    }
}

/// Termination timing knobs for the registry.
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    /// How long a process gets to exit after SIGTERM before SIGKILL.
    pub grace: Duration,
    /// Pause after the profiler-flush SIGINT, letting profiler data hit disk.
    pub profiler_flush: Duration,
}

impl Default for RegistryConfig {
    /// Defaults: `grace = 1s`, `profiler_flush = 100ms`.
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(1),
            profiler_flush: Duration::from_millis(100),
        }
    }
}

/// Supervision table mapping each service kind to its live process handles.
pub struct ProcessRegistry {
    cfg: RegistryConfig,
    table: Mutex<HashMap<ServiceKind, Vec<ProcessHandle>>>,
}

impl ProcessRegistry {
    /// Creates an empty registry with the given timing configuration.
    pub fn new(cfg: RegistryConfig) -> Self {
        Self {
            cfg,
            table: Mutex::new(HashMap::new()),
        }
    }

    /// Appends a handle under `kind`.
    ///
    /// Launchers call this only when the caller asked for cleanup tracking,
    /// so attach-only launches never register a handle they do not own.
    pub async fn register(&self, kind: ServiceKind, handle: ProcessHandle) {
        debug!(kind = kind.label(), pid = handle.pid(), "registered process");
        self.table.lock().await.entry(kind).or_default().push(handle);
    }

    /// Number of tracked handles per kind, in teardown order.
    pub async fn counts(&self) -> Vec<(ServiceKind, usize)> {
        let table = self.table.lock().await;
        ServiceKind::ALL
            .iter()
            .map(|kind| (*kind, table.get(kind).map_or(0, Vec::len)))
            .collect()
    }

    /// Terminates one process: graceful first, forceful after the grace
    /// period. Returns whether the process is confirmed exited.
    ///
    /// A process that already exited is trivially successful. Profiled
    /// processes get SIGINT and a short pause first so profiler buffers are
    /// flushed before the terminate signal lands.
    pub async fn terminate_one(&self, handle: &mut ProcessHandle) -> bool {
        if !handle.is_alive() {
            return true;
        }
        if handle.profiled() {
            handle.interrupt();
            sleep(self.cfg.profiler_flush).await;
        }

        handle.terminate();
        if timeout(self.cfg.grace, handle.wait()).await.is_ok() {
            return true;
        }

        // Did not exit within the grace period; escalate.
        handle.kill();
        if timeout(self.cfg.grace, handle.wait()).await.is_ok() {
            return true;
        }
        !handle.is_alive()
    }

    /// Terminates every tracked process, kind by kind in declared order, and
    /// clears the table. Returns false when any handle could not be
    /// confirmed dead; teardown still runs to completion for the rest.
    pub async fn teardown_all(&self) -> bool {
        let mut all_confirmed = true;
        for kind in ServiceKind::ALL {
            let handles: Vec<ProcessHandle> = {
                let mut table = self.table.lock().await;
                table.remove(&kind).unwrap_or_default()
            };
            for mut handle in handles {
                let confirmed = self.terminate_one(&mut handle).await;
                if !confirmed {
                    warn!(
                        kind = kind.label(),
                        pid = handle.pid(),
                        "process did not exit during teardown"
                    );
                }
                all_confirmed = all_confirmed && confirmed;
            }
        }
        if !all_confirmed {
            warn!("cluster did not shut down properly");
        }
        all_confirmed
    }

    /// True iff every tracked handle across all non-excluded kinds is still
    /// running. A single dead handle of an included kind flips this to false.
    pub async fn all_alive(&self, exclude: &[ServiceKind]) -> bool {
        let mut table = self.table.lock().await;
        for (kind, handles) in table.iter_mut() {
            if exclude.contains(kind) {
                continue;
            }
            for handle in handles {
                if !handle.is_alive() {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::handle::{spawn_service, ServiceCommand};
    use std::time::Instant;

    fn fast_registry() -> ProcessRegistry {
        ProcessRegistry::new(RegistryConfig {
            grace: Duration::from_millis(300),
            profiler_flush: Duration::from_millis(20),
        })
    }

    fn sleeper(seconds: u32) -> ProcessHandle {
        spawn_service(
            "test",
            ServiceCommand::new("sleep").arg(seconds.to_string()),
        )
        .unwrap()
    }

    /// A process that ignores SIGTERM and only dies to SIGKILL.
    ///
    /// The shell touches a marker file once the trap is installed; we wait
    /// for it so a SIGTERM sent right after spawn cannot beat the trap.
    fn stubborn() -> ProcessHandle {
        let marker = std::env::temp_dir().join(format!(
            "clustervisor-stubborn-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let handle = spawn_service(
            "test",
            ServiceCommand::new("sh").arg("-c").arg(format!(
                "trap '' TERM; : > '{}'; sleep 30",
                marker.display()
            )),
        )
        .unwrap();
        while !marker.exists() {
            std::thread::sleep(Duration::from_millis(5));
        }
        let _ = std::fs::remove_file(&marker);
        handle
    }

    #[test]
    fn test_teardown_order_kills_workers_before_their_dependencies() {
        let order = ServiceKind::ALL;
        let pos = |k: ServiceKind| order.iter().position(|x| *x == k).unwrap();
        assert!(pos(ServiceKind::Worker) < pos(ServiceKind::LocalSchedulingUnit));
        assert!(pos(ServiceKind::LocalSchedulingUnit) < pos(ServiceKind::ObjectStore));
        assert!(pos(ServiceKind::ObjectStore) < pos(ServiceKind::CoordinationStore));
    }

    #[tokio::test]
    async fn test_terminate_already_exited_is_trivially_successful() {
        let registry = fast_registry();
        let mut handle = spawn_service("test", ServiceCommand::new("true")).unwrap();
        handle.wait().await;

        let started = Instant::now();
        assert!(registry.terminate_one(&mut handle).await);
        // No signals sent, no grace wait burned.
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_terminate_cooperative_process() {
        let registry = fast_registry();
        let mut handle = sleeper(30);
        assert!(registry.terminate_one(&mut handle).await);
        assert!(!handle.is_alive());
    }

    #[tokio::test]
    async fn test_stubborn_process_takes_at_least_the_grace_period() {
        let registry = fast_registry();
        let mut handle = stubborn();

        let started = Instant::now();
        assert!(registry.terminate_one(&mut handle).await);
        assert!(started.elapsed() >= Duration::from_millis(300));
        assert!(!handle.is_alive());
    }

    #[tokio::test]
    async fn test_teardown_clears_every_kind_and_aggregates_success() {
        let registry = fast_registry();
        registry.register(ServiceKind::Worker, stubborn()).await;
        registry.register(ServiceKind::GlobalScheduler, sleeper(30)).await;

        // Both die (the stubborn one via SIGKILL), so the aggregate is true
        // and both lists end empty.
        assert!(registry.teardown_all().await);
        for (_, count) in registry.counts().await {
            assert_eq!(count, 0);
        }
    }

    #[tokio::test]
    async fn test_teardown_with_a_surviving_process_aggregates_false() {
        let registry = fast_registry();

        // Signals never reach this one, so its exit is never confirmed.
        let mut immortal = sleeper(10);
        immortal.suppress_signals();
        registry.register(ServiceKind::Worker, immortal).await;
        registry.register(ServiceKind::GlobalScheduler, sleeper(30)).await;

        // The killable process still goes down and both lists end empty;
        // only the aggregate reports the survivor.
        assert!(!registry.teardown_all().await);
        for (_, count) in registry.counts().await {
            assert_eq!(count, 0);
        }
    }

    #[tokio::test]
    async fn test_teardown_is_idempotent_on_empty_registry() {
        let registry = fast_registry();
        assert!(registry.teardown_all().await);
    }

    #[tokio::test]
    async fn test_all_alive_and_exclusions() {
        let registry = fast_registry();
        registry.register(ServiceKind::Worker, sleeper(30)).await;

        let mut dead = spawn_service("test", ServiceCommand::new("true")).unwrap();
        dead.wait().await;
        registry.register(ServiceKind::Monitor, dead).await;

        assert!(!registry.all_alive(&[]).await);
        assert!(registry.all_alive(&[ServiceKind::Monitor]).await);

        registry.teardown_all().await;
    }
}
