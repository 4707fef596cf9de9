//! The network shared data sector: one opaque blob per node type, kept by
//! every node so the network holds redundant copies.

use std::collections::BTreeMap;

use crate::{
    wire_frames::{Payload, PayloadExt},
    well_known::NodeType,
};

/// Bit 7 of the request byte: set for read-only, clear for write
const READ_ONLY_FLAG: u8 = 0x80;

#[derive(Default, Debug)]
pub struct SharedDataSector {
    sectors: BTreeMap<NodeType, Vec<u8>>,
}

impl SharedDataSector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node_type: NodeType) -> Option<&[u8]> {
        self.sectors.get(&node_type).map(Vec::as_slice)
    }

    /// Apply a read/write request and build the response payload:
    /// the requested node type followed by the current blob.
    ///
    /// Returns `None` for an empty request.
    pub fn handle_request(&mut self, request: &[u8]) -> Option<Payload> {
        let (&first, rest) = request.split_first()?;
        let node_type = NodeType(first & !READ_ONLY_FLAG);
        let blob = self.sectors.entry(node_type).or_default();
        if first & READ_ONLY_FLAG == 0 {
            blob.clear();
            blob.extend_from_slice(rest);
        }

        let mut out = Payload::new();
        out.put(&[node_type.0]).put(blob.as_slice());
        Some(out)
    }
}
