//! Process handling: spawning, liveness polling, and the supervision registry.
//!
//! Internal split:
//! - [`handle`]: one spawned OS process (spawn, poll, signal, bounded wait);
//! - [`registry`]: the per-orchestrator table of everything started so far,
//!   with graceful-then-forceful teardown in a fixed service order.

mod handle;
mod registry;

pub use handle::{spawn_service, ProcessHandle, ServiceCommand};
pub use registry::{ProcessRegistry, RegistryConfig, ServiceKind};
