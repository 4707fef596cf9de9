//! What we know about our neighbors, indexed by node address. Only used to
//! annotate events, never to make protocol decisions.

use crate::{address::NodeAddress, identity::MacAddress, well_known::{MAX_PAYLOAD_SIZE, NodeType}};

pub struct NodeList {
    types: [NodeType; MAX_PAYLOAD_SIZE],
    len: usize,
    macs: [Option<MacAddress>; MAX_PAYLOAD_SIZE],
}

impl Default for NodeList {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeList {
    pub const fn new() -> Self {
        Self {
            types: [NodeType::ANY; MAX_PAYLOAD_SIZE],
            len: 0,
            macs: [None; MAX_PAYLOAD_SIZE],
        }
    }

    /// Replace the node type table with the coordinator's broadcast list
    pub fn set_types(&mut self, data: &[u8]) {
        let len = data.len().min(MAX_PAYLOAD_SIZE);
        self.types = [NodeType::ANY; MAX_PAYLOAD_SIZE];
        for (slot, &b) in self.types.iter_mut().zip(&data[..len]) {
            *slot = NodeType(b);
        }
        self.len = len;
    }

    /// The node type table as last set, as raw bytes
    pub fn types_raw(&self) -> impl Iterator<Item = u8> + '_ {
        self.types[..self.len].iter().map(|t| t.0)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn node_type_at(&self, addr: NodeAddress) -> NodeType {
        match addr.table_index() {
            Some(idx) => self.types[idx],
            None => NodeType::ANY,
        }
    }

    pub fn node_mac_at(&self, addr: NodeAddress) -> Option<MacAddress> {
        addr.table_index().and_then(|idx| self.macs[idx])
    }

    pub fn learn_mac(&mut self, addr: NodeAddress, mac: MacAddress) {
        if let Some(idx) = addr.table_index() {
            self.macs[idx] = Some(mac);
        }
    }
}
