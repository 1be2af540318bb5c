//! # The address book for one bootstrap session.
//!
//! A mutable record built incrementally by the driver. Object-store
//! addresses and scheduling-unit sockets are paired by slot index; instead
//! of two index-aligned sequences that could drift apart, the book keeps a
//! single sequence of paired [`NodeSlot`] records.
//!
//! ## Rules
//! - The coordination-store address is write-once for the life of the
//!   cluster.
//! - Slots only ever grow and never reorder; unit sockets fill the slot
//!   sequence strictly as a prefix. Repeated driver calls against the same
//!   book therefore re-attach idempotently.

use crate::error::{OrchestratorError, Result};

/// Identifies one object-store + manager pair. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectStoreAddress {
    /// Socket name of the storage process.
    pub store_socket: String,
    /// Socket name of the manager process.
    pub manager_socket: String,
    /// Port the manager listens on.
    pub manager_port: u16,
}

/// One pairing slot: an object-store pair and, once launched, the
/// scheduling unit connected to it.
#[derive(Clone, Debug)]
pub struct NodeSlot {
    object_store: ObjectStoreAddress,
    unit_socket: Option<String>,
}

impl NodeSlot {
    /// The object-store pair in this slot.
    pub fn object_store(&self) -> &ObjectStoreAddress {
        &self.object_store
    }

    /// Socket name of the paired scheduling unit, once launched.
    pub fn unit_socket(&self) -> Option<&str> {
        self.unit_socket.as_deref()
    }
}

/// Cumulative record of service addresses for one bootstrap session.
#[derive(Clone, Debug, Default)]
pub struct AddressBook {
    node_ip: String,
    store_address: Option<String>,
    slots: Vec<NodeSlot>,
    requested_manager_ports: Option<Vec<Option<u16>>>,
}

impl AddressBook {
    /// Creates an empty book for the node this orchestration call runs on.
    pub fn new(node_ip: impl Into<String>) -> Self {
        Self {
            node_ip: node_ip.into(),
            ..Self::default()
        }
    }

    /// IP of the node this orchestration call is running on.
    pub fn node_ip(&self) -> &str {
        &self.node_ip
    }

    /// Coordination-store address, once known.
    pub fn store_address(&self) -> Option<&str> {
        self.store_address.as_deref()
    }

    /// Records the coordination-store address. Write-once: setting the same
    /// value again is a no-op, a different value is an invariant violation.
    pub fn set_store_address(&mut self, address: impl Into<String>) -> Result<()> {
        let address = address.into();
        match &self.store_address {
            None => {
                self.store_address = Some(address);
                Ok(())
            }
            Some(existing) if *existing == address => Ok(()),
            Some(existing) => Err(OrchestratorError::invariant(format!(
                "store address is immutable: already {existing}, refusing {address}"
            ))),
        }
    }

    /// The paired slots, in launch order.
    pub fn slots(&self) -> &[NodeSlot] {
        &self.slots
    }

    /// Number of object-store pairs recorded so far.
    pub fn num_object_stores(&self) -> usize {
        self.slots.len()
    }

    /// Number of scheduling units recorded so far. Units fill the slot
    /// sequence as a prefix, so this is a simple prefix length.
    pub fn num_units(&self) -> usize {
        self.slots
            .iter()
            .take_while(|slot| slot.unit_socket.is_some())
            .count()
    }

    /// Object-store pair at `index`.
    pub fn object_store(&self, index: usize) -> Option<&ObjectStoreAddress> {
        self.slots.get(index).map(|slot| &slot.object_store)
    }

    /// Unit socket at `index`.
    pub fn unit_socket(&self, index: usize) -> Option<&str> {
        self.slots.get(index).and_then(|slot| slot.unit_socket.as_deref())
    }

    /// Appends a new object-store pair, opening a fresh slot. Append-only:
    /// existing slots are never replaced or reordered.
    pub fn push_object_store(&mut self, address: ObjectStoreAddress) -> usize {
        self.slots.push(NodeSlot {
            object_store: address,
            unit_socket: None,
        });
        self.slots.len() - 1
    }

    /// Records the unit socket paired with slot `index`.
    ///
    /// The slot must exist and `index` must be the first unfilled slot, so
    /// the unit sequence stays a prefix of the slot sequence.
    pub fn set_unit_socket(&mut self, index: usize, socket: impl Into<String>) -> Result<()> {
        if index != self.num_units() || index >= self.slots.len() {
            return Err(OrchestratorError::invariant(format!(
                "unit socket for slot {index} set out of order ({} filled, {} slots)",
                self.num_units(),
                self.slots.len()
            )));
        }
        self.slots[index].unit_socket = Some(socket.into());
        Ok(())
    }

    /// Declares which manager ports the driver should request, index-aligned
    /// with the slots; `None` entries mean "pick a free port".
    pub fn set_requested_manager_ports(&mut self, ports: Vec<Option<u16>>) {
        self.requested_manager_ports = Some(ports);
    }

    /// The requested manager ports normalized to `num_units` entries.
    pub(crate) fn normalized_manager_ports(&self, num_units: usize) -> Result<Vec<Option<u16>>> {
        match &self.requested_manager_ports {
            None => Ok(vec![None; num_units]),
            Some(ports) if ports.len() == num_units => Ok(ports.clone()),
            Some(ports) => Err(OrchestratorError::config(format!(
                "{} object manager ports requested for {num_units} scheduling units",
                ports.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(n: u16) -> ObjectStoreAddress {
        ObjectStoreAddress {
            store_socket: format!("/tmp/store_{n}"),
            manager_socket: format!("/tmp/manager_{n}"),
            manager_port: 10_000 + n,
        }
    }

    #[test]
    fn test_store_address_is_write_once() {
        let mut book = AddressBook::new("127.0.0.1");
        book.set_store_address("127.0.0.1:6379").unwrap();
        // Idempotent re-set of the same value.
        book.set_store_address("127.0.0.1:6379").unwrap();
        let err = book.set_store_address("127.0.0.1:7000").unwrap_err();
        assert_eq!(err.as_label(), "invariant_violation");
        assert_eq!(book.store_address(), Some("127.0.0.1:6379"));
    }

    #[test]
    fn test_slots_grow_and_pair_by_index() {
        let mut book = AddressBook::new("127.0.0.1");
        assert_eq!(book.push_object_store(pair(0)), 0);
        assert_eq!(book.push_object_store(pair(1)), 1);
        assert_eq!(book.num_object_stores(), 2);
        assert_eq!(book.num_units(), 0);

        book.set_unit_socket(0, "/tmp/unit_0").unwrap();
        assert_eq!(book.num_units(), 1);
        book.set_unit_socket(1, "/tmp/unit_1").unwrap();
        assert_eq!(book.num_units(), 2);

        assert_eq!(book.object_store(1).unwrap().manager_port, 10_001);
        assert_eq!(book.unit_socket(1), Some("/tmp/unit_1"));
    }

    #[test]
    fn test_unit_sockets_must_fill_as_a_prefix() {
        let mut book = AddressBook::new("127.0.0.1");
        book.push_object_store(pair(0));
        book.push_object_store(pair(1));

        // Slot 1 before slot 0 breaks the pairing prefix.
        let err = book.set_unit_socket(1, "/tmp/unit_1").unwrap_err();
        assert_eq!(err.as_label(), "invariant_violation");

        // A slot that does not exist yet is also rejected.
        book.set_unit_socket(0, "/tmp/unit_0").unwrap();
        book.set_unit_socket(1, "/tmp/unit_1").unwrap();
        assert!(book.set_unit_socket(2, "/tmp/unit_2").is_err());
    }

    #[test]
    fn test_manager_port_normalization() {
        let mut book = AddressBook::new("127.0.0.1");
        assert_eq!(book.normalized_manager_ports(2).unwrap(), vec![None, None]);

        book.set_requested_manager_ports(vec![Some(12345), None]);
        assert_eq!(
            book.normalized_manager_ports(2).unwrap(),
            vec![Some(12345), None]
        );
        assert!(book.normalized_manager_ports(3).is_err());
    }
}
