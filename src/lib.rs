//! # clustervisor
//!
//! **Clustervisor** is a cluster bootstrap and process-supervision library.
//!
//! It starts the external services that make up one cluster node (the
//! coordination store, schedulers, object stores, workers, and an optional
//! dashboard), records their addresses, and tears everything down in a safe
//! order. The crate is designed as a building block for cluster launchers
//! and node agents.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!            ┌───────────────┐       ┌──────────────┐
//!            │ ClusterConfig │       │ AddressBook  │
//!            │  (desired)    │       │  (running)   │
//!            └───────┬───────┘       └──────┬───────┘
//!                    ▼                      ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │  Orchestrator (bootstrap driver)                          │
//! │  - reconciles desired vs. running, launches the deficit   │
//! │  - ProcessRegistry (handles grouped by service kind)      │
//! └──────┬──────────────┬───────────────┬──────────────┬──────┘
//!        ▼              ▼               ▼              ▼
//!  coordination    global         object store     dashboard
//!  store + monitor scheduler      pair[i] ──►      (best effort)
//!                                 scheduling unit[i] ──► workers[i]
//! ```
//!
//! ### Lifecycle
//! ```text
//! ClusterConfig ──► Orchestrator::bootstrap(cfg, book)
//!
//!   ├─► start coordination store (bounded port retry, readiness probe)
//!   ├─► start monitor, global scheduler
//!   ├─► for each missing slot:
//!   │     ├─► object store + manager  (book.push_object_store)
//!   │     └─► scheduling unit         (book.set_unit_socket)
//!   ├─► launch leftover worker quotas directly
//!   └─► dashboard (failure logged, never fatal)
//!
//! On shutdown: ProcessRegistry::teardown_all() walks the kinds in
//! teardown order, SIGTERM with a grace window, then SIGKILL.
//! ```
//!
//! ## Features
//! | Area             | Description                                              | Key types                                 |
//! |------------------|----------------------------------------------------------|-------------------------------------------|
//! | **Bootstrap**    | Reconcile a desired cluster shape against what runs.     | [`Orchestrator`], [`ClusterConfig`]       |
//! | **Addresses**    | Paired per-slot record of everything launched.           | [`AddressBook`], [`ObjectStoreAddress`]   |
//! | **Supervision**  | Track, poll, and tear down spawned services.             | [`ProcessRegistry`], [`ProcessHandle`]    |
//! | **Store access** | Probe and configure the coordination store.              | [`StoreClient`], [`Probe`]                |
//! | **Policies**     | Bounded launch retry with candidate mutation.            | [`RetryPolicy`]                           |
//! | **Errors**       | Typed errors for every bootstrap failure mode.           | [`OrchestratorError`]                     |
//!
//! ## Example
//! ```rust,no_run
//! use clustervisor::{ClusterConfig, Orchestrator};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = ClusterConfig {
//!         num_workers: 4,
//!         ..ClusterConfig::default()
//!     };
//!
//!     let orchestrator = Orchestrator::new();
//!     let book = orchestrator.start_head(&cfg).await?;
//!     println!("store at {}", book.store_address().unwrap());
//!
//!     // ... run workloads ...
//!
//!     orchestrator.registry().teardown_all().await;
//!     Ok(())
//! }
//! ```

mod addr;
mod cluster;
mod error;
mod launch;
mod logs;
mod policies;
mod process;
mod store;

// ---- Public re-exports ----

pub use addr::{encode, host_of, node_ip_address, port_of, DEFAULT_IP_PROBE};
pub use cluster::{AddressBook, ClusterConfig, NodeSlot, ObjectStoreAddress, Orchestrator, ResourceCounts};
pub use error::{OrchestratorError, Result};
pub use launch::{ServiceBinaries, LaunchContext};
pub use launch::local_unit::UnitResources;
pub use logs::{new_log_files, LogFiles, DEFAULT_LOG_DIR};
pub use policies::RetryPolicy;
pub use process::{ProcessHandle, ProcessRegistry, RegistryConfig, ServiceCommand, ServiceKind};
pub use store::{start_store, wait_until_ready, Probe, StoreClient, StoreProbe, StoreStartConfig};
