//! # Declarative description of the desired cluster shape.
//!
//! [`ClusterConfig`] is what a top-level caller hands to the
//! [`Orchestrator`](crate::Orchestrator): how many of everything, which
//! optional services to include, and where the service binaries live. The
//! driver compares this against the address book and fills only the gaps.

use std::path::PathBuf;

use crate::error::{OrchestratorError, Result};
use crate::launch::ServiceBinaries;
use crate::logs::DEFAULT_LOG_DIR;
use crate::policies::RetryPolicy;

/// Per-unit resource counts (CPUs or GPUs).
///
/// A scalar spreads uniformly over all scheduling units; an explicit vector
/// must match the unit count exactly.
#[derive(Clone, Debug, Default)]
pub enum ResourceCounts {
    /// Let each unit default (hardware threads for CPUs, 0 for GPUs).
    #[default]
    Default,
    /// The same count for every unit.
    Uniform(usize),
    /// One count per unit, index-aligned with the slots.
    PerUnit(Vec<usize>),
}

impl ResourceCounts {
    /// Normalizes to one optional count per unit.
    ///
    /// An explicit vector of the wrong length is rejected before anything
    /// spawns.
    pub fn normalize(&self, num_units: usize) -> Result<Vec<Option<usize>>> {
        match self {
            ResourceCounts::Default => Ok(vec![None; num_units]),
            ResourceCounts::Uniform(count) => Ok(vec![Some(*count); num_units]),
            ResourceCounts::PerUnit(counts) if counts.len() == num_units => {
                Ok(counts.iter().map(|c| Some(*c)).collect())
            }
            ResourceCounts::PerUnit(counts) => Err(OrchestratorError::config(format!(
                "{} resource counts given for {num_units} scheduling units",
                counts.len()
            ))),
        }
    }
}

/// Desired cluster shape and launch environment for one driver call.
#[derive(Clone, Debug)]
pub struct ClusterConfig {
    /// IP address of this node; used to build the addresses other services
    /// connect back to.
    pub node_ip: String,
    /// Total number of workers to start, partitioned round-robin across
    /// scheduling units.
    pub num_workers: usize,
    /// Number of local scheduling units — and therefore object-store pairs —
    /// this node must end up with.
    pub num_local_schedulers: usize,
    /// CPU counts per unit.
    pub cpus: ResourceCounts,
    /// GPU counts per unit.
    pub gpus: ResourceCounts,
    /// Start a coordination store unless the address book already has one.
    /// When false, the address book must carry a store address.
    pub include_store: bool,
    /// Pinned port for a newly started coordination store; `None` picks
    /// random ports with collision retry.
    pub store_port: Option<u16>,
    /// Start a global scheduler.
    pub include_global_scheduler: bool,
    /// Best-effort dashboard; its failure never fails the bootstrap.
    pub include_dashboard: bool,
    /// Let each scheduling unit spawn its own worker quota instead of the
    /// orchestrator launching workers one by one.
    pub start_workers_from_unit: bool,
    /// Register every launched process for automatic teardown.
    pub cleanup: bool,
    /// Redirect every process's stdout/stderr into per-process log files.
    pub redirect_output: bool,
    /// Work-execution entry point run by each worker.
    pub worker_path: PathBuf,
    /// Program paths for the external services.
    pub binaries: ServiceBinaries,
    /// Directory for redirected output.
    pub log_dir: PathBuf,
    /// Launch-attempt budget for an auto-port coordination store.
    pub store_retry_budget: u32,
}

impl Default for ClusterConfig {
    /// Defaults describe the smallest useful node: one scheduling unit, no
    /// workers, nothing optional, everything tracked for cleanup.
    fn default() -> Self {
        Self {
            node_ip: "127.0.0.1".into(),
            num_workers: 0,
            num_local_schedulers: 1,
            cpus: ResourceCounts::Default,
            gpus: ResourceCounts::Default,
            include_store: false,
            store_port: None,
            include_global_scheduler: false,
            include_dashboard: false,
            start_workers_from_unit: true,
            cleanup: true,
            redirect_output: false,
            worker_path: PathBuf::from("clustervisor-worker"),
            binaries: ServiceBinaries::default(),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            store_retry_budget: RetryPolicy::default().attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_counts_normalize_to_none() {
        assert_eq!(
            ResourceCounts::Default.normalize(3).unwrap(),
            vec![None, None, None]
        );
    }

    #[test]
    fn test_uniform_counts_spread() {
        assert_eq!(
            ResourceCounts::Uniform(4).normalize(2).unwrap(),
            vec![Some(4), Some(4)]
        );
    }

    #[test]
    fn test_per_unit_counts_must_match_length() {
        assert_eq!(
            ResourceCounts::PerUnit(vec![2, 8]).normalize(2).unwrap(),
            vec![Some(2), Some(8)]
        );
        let err = ResourceCounts::PerUnit(vec![2, 8]).normalize(3).unwrap_err();
        assert_eq!(err.as_label(), "invalid_config");
    }
}
