use core::fmt;

use serde::{Deserialize, Serialize};

/// An 8-bit node address on the bus
#[cfg_attr(feature = "defmt-v1", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct NodeAddress(pub u8);

// ---- impl NodeAddress ----

impl NodeAddress {
    /// As a destination: everyone on the current subnet
    pub const BROADCAST: Self = Self(0x00);
    /// As our own address: not (yet) a network member
    pub const UNASSIGNED: Self = Self(0x00);
    pub const COORDINATION_ARBITRATION: Self = Self(0xFE);
    pub const COORDINATOR: Self = Self(0xFF);

    #[inline]
    pub fn is_assigned(&self) -> bool {
        self.0 != 0
    }

    /// Whether a coordinator may hand this out as a node id. Zero and the
    /// coordinator's own addresses are reserved.
    #[inline]
    pub fn is_node_id(&self) -> bool {
        self.is_assigned() && *self != Self::COORDINATION_ARBITRATION && *self != Self::COORDINATOR
    }

    /// Index into per-address tables, if the address can have an entry
    #[inline]
    pub fn table_index(&self) -> Option<usize> {
        let idx = self.0 as usize;
        (idx < crate::well_known::MAX_PAYLOAD_SIZE).then_some(idx)
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// Scopes broadcast delivery
#[cfg_attr(feature = "defmt-v1", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Subnet(pub u8);

// ---- impl Subnet ----

impl Subnet {
    pub const BROADCAST: Self = Self(0x00);
    pub const MAINTENANCE: Self = Self(0x01);
    pub const VERSION_1: Self = Self(0x02);
    pub const VERSION_2: Self = Self(0x03);

    #[inline]
    pub fn is_version_1(&self) -> bool {
        *self == Self::VERSION_1
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}
