//! # The bootstrap driver.
//!
//! [`Orchestrator::bootstrap`] reconciles the desired shape in a
//! [`ClusterConfig`] with what the [`AddressBook`] says is already running,
//! and launches only the difference, in dependency order:
//!
//! ```text
//! coordination store ──► monitor
//!         │
//!         ├──► global scheduler
//!         │
//!         └──► object store pair[i] ──► scheduling unit[i] ──► workers[i]
//!         │
//!         └──► dashboard (best effort)
//! ```
//!
//! ## Rules
//! - Anything the book already records is never re-launched; repeated
//!   calls only fill the remaining slot deficit. Workers are not recorded
//!   in the book: every call launches its full `num_workers` request.
//! - Services downstream of the store are only started once the store has
//!   answered a readiness probe.
//! - Dashboard failure is logged and swallowed; everything else is fatal.

use std::sync::Arc;

use crate::addr::encode;
use crate::cluster::{AddressBook, ClusterConfig};
use crate::error::{OrchestratorError, Result};
use crate::launch::local_unit::UnitResources;
use crate::launch::{dashboard, global_scheduler, local_unit, monitor, object_store, worker};
use crate::launch::LaunchContext;
use crate::process::{ProcessRegistry, RegistryConfig};
use crate::store::{start_store, StoreStartConfig};

/// Owns the process registry and drives cluster bring-up against it.
pub struct Orchestrator {
    registry: Arc<ProcessRegistry>,
}

impl Orchestrator {
    /// Creates an orchestrator with a fresh, empty registry.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(ProcessRegistry::new(RegistryConfig::default())),
        }
    }

    /// The registry every tracked launch is recorded in. Shared so callers
    /// can tear the cluster down or poll liveness independently.
    pub fn registry(&self) -> Arc<ProcessRegistry> {
        Arc::clone(&self.registry)
    }

    /// Starts a head node: this node runs the coordination store, the global
    /// scheduler, and the dashboard alongside its scheduling units.
    pub async fn start_head(&self, cfg: &ClusterConfig) -> Result<AddressBook> {
        let mut cfg = cfg.clone();
        cfg.include_store = true;
        cfg.include_global_scheduler = true;
        cfg.include_dashboard = true;

        let mut book = AddressBook::new(cfg.node_ip.clone());
        self.bootstrap(&cfg, &mut book).await?;
        Ok(book)
    }

    /// Starts a non-head node that joins the cluster at `store_address`.
    ///
    /// `manager_ports`, when given, pins one object-manager port per
    /// scheduling unit; `None` entries auto-select.
    pub async fn start_node(
        &self,
        cfg: &ClusterConfig,
        store_address: &str,
        manager_ports: Option<Vec<Option<u16>>>,
    ) -> Result<AddressBook> {
        let mut cfg = cfg.clone();
        cfg.include_store = false;
        cfg.include_global_scheduler = false;
        cfg.include_dashboard = false;

        let mut book = AddressBook::new(cfg.node_ip.clone());
        book.set_store_address(store_address)?;
        if let Some(ports) = manager_ports {
            book.set_requested_manager_ports(ports);
        }
        self.bootstrap(&cfg, &mut book).await?;
        Ok(book)
    }

    /// Brings the node described by `book` up to the shape described by
    /// `cfg`, recording every address it creates back into `book`.
    ///
    /// # Errors
    /// Fatal on the first service (other than the dashboard) that cannot be
    /// started; the registry keeps whatever was launched before the failure,
    /// so the caller can still tear down cleanly.
    pub async fn bootstrap(&self, cfg: &ClusterConfig, book: &mut AddressBook) -> Result<()> {
        let num_units = cfg.num_local_schedulers;
        let cpus = cfg.cpus.normalize(num_units)?;
        let gpus = cfg.gpus.normalize(num_units)?;
        let manager_ports = book.normalized_manager_ports(num_units)?;

        let ctx = LaunchContext {
            registry: &self.registry,
            binaries: &cfg.binaries,
            log_dir: &cfg.log_dir,
            redirect_output: cfg.redirect_output,
            cleanup: cfg.cleanup,
        };

        // The coordination store first; everything else depends on it. An
        // address already in the book means the store is running, so only
        // the deficit case spawns one.
        if cfg.include_store && book.store_address().is_none() {
            let store_cfg = StoreStartConfig {
                program: cfg.binaries.store.clone(),
                requested_port: cfg.store_port,
                // A pinned port gets exactly one shot.
                retry_budget: match cfg.store_port {
                    Some(_) => 1,
                    None => cfg.store_retry_budget,
                },
                cleanup: cfg.cleanup,
                log_dir: cfg.log_dir.clone(),
                redirect_output: cfg.redirect_output,
            };
            // With cleanup off the store runs untracked past this call.
            let (port, _) = start_store(&store_cfg, &self.registry).await?;
            book.set_store_address(encode(&cfg.node_ip, port))?;
        }
        let store_address = book
            .store_address()
            .ok_or_else(|| {
                OrchestratorError::config(
                    "no coordination store: the address book has no store address \
                     and the config does not include one",
                )
            })?
            .to_string();

        // The monitor belongs to the node that owns the store, whether the
        // store was just spawned or was already running at the recorded
        // address.
        if cfg.include_store {
            monitor::start(&ctx, &store_address).await?;
        }

        if cfg.include_global_scheduler {
            global_scheduler::start(&ctx, &store_address).await?;
        }

        // Object-store pairs: fill the deficit, never touch existing slots.
        for slot in book.num_object_stores()..num_units {
            let address = object_store::start(
                &ctx,
                &cfg.node_ip,
                &store_address,
                slot,
                manager_ports[slot],
                None,
            )
            .await?;
            book.push_object_store(address);
        }

        // Scheduling units, each paired with the slot at its own index.
        // Every call partitions its full worker request; a freshly started
        // unit can absorb its share directly, quotas for units that already
        // run are drained by the direct worker launches below.
        let mut pending = partition_workers(cfg.num_workers, num_units);
        for slot in book.num_units()..num_units {
            let quota = if cfg.start_workers_from_unit {
                std::mem::take(&mut pending[slot])
            } else {
                0
            };
            let resources = UnitResources {
                cpus: cpus[slot],
                gpus: gpus[slot],
            };
            let object_store = book
                .object_store(slot)
                .ok_or_else(|| {
                    OrchestratorError::invariant(format!(
                        "scheduling unit {slot} has no object-store pair"
                    ))
                })?
                .clone();
            let unit_socket = local_unit::start(
                &ctx,
                &store_address,
                &cfg.node_ip,
                &object_store,
                &cfg.worker_path,
                resources,
                quota,
                slot,
            )
            .await?;
            book.set_unit_socket(slot, unit_socket)?;
        }

        if book.num_object_stores() != num_units || book.num_units() != num_units {
            return Err(OrchestratorError::invariant(format!(
                "expected {num_units} object stores and units, book has {} and {}",
                book.num_object_stores(),
                book.num_units()
            )));
        }

        // Whatever quota the units did not absorb is launched directly.
        for slot in 0..num_units {
            let quota = std::mem::take(&mut pending[slot]);
            if quota == 0 {
                continue;
            }
            let object_store = book
                .object_store(slot)
                .cloned()
                .ok_or_else(|| OrchestratorError::invariant(format!("no slot {slot}")))?;
            let unit_socket = book
                .unit_socket(slot)
                .ok_or_else(|| OrchestratorError::invariant(format!("no unit at slot {slot}")))?
                .to_string();
            for index in 0..quota {
                worker::start(
                    &ctx,
                    &cfg.node_ip,
                    &object_store,
                    &unit_socket,
                    &store_address,
                    &cfg.worker_path,
                    slot,
                    index,
                )
                .await?;
            }
        }
        if pending.iter().any(|&quota| quota != 0) {
            return Err(OrchestratorError::invariant(
                "worker quotas were not fully drained",
            ));
        }

        // Last and optional: its failure must not fail the bootstrap.
        if cfg.include_dashboard {
            dashboard::start(&ctx, &store_address).await;
        }
        Ok(())
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits `total` workers round-robin across `units` scheduling units.
///
/// The first `total % units` units get one extra worker, so any two counts
/// differ by at most one.
fn partition_workers(total: usize, units: usize) -> Vec<usize> {
    if units == 0 {
        return Vec::new();
    }
    let base = total / units;
    let extra = total % units;
    (0..units)
        .map(|i| base + usize::from(i < extra))
        .collect()
}
