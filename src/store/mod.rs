//! Coordination-store bootstrap.
//!
//! The store is an external collaborator: a pre-built key-value service this
//! crate only starts, configures, and probes. Internal split:
//! - [`client`]: the minimal wire client (no-op probe, runtime config,
//!   timestamp write) plus readiness polling;
//! - [`bootstrap`]: start-or-retry logic with port mutation and post-start
//!   configuration.

mod bootstrap;
mod client;

pub use bootstrap::{start_store, StoreStartConfig};
pub use client::{wait_until_ready, Probe, StoreClient, StoreProbe};
