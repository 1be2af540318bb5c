//! Cluster orchestration: the address book and the bootstrap driver.
//!
//! Internal modules:
//! - [`address_book`]: the cumulative record of discovered/created service
//!   addresses for one bootstrap session;
//! - [`config`]: declarative description of the desired cluster shape;
//! - [`driver`]: the top-level routine that fills the gaps between desired
//!   and running, in dependency order.

mod address_book;
mod config;
mod driver;

pub use address_book::{AddressBook, NodeSlot, ObjectStoreAddress};
pub use config::{ClusterConfig, ResourceCounts};
pub use driver::Orchestrator;
