use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, well_known::NodeType};

/// Construction parameters for a [`Node`](crate::Node)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// What we announce ourselves as
    pub device_type: NodeType,
    /// 1 or 2. Selects the version-1 packet number flag on discovery replies
    pub ct_version: u8,
    /// How long a partial frame may sit in the receive buffer
    pub receive_timeout_ms: u64,
    /// How long a request we sent waits for its answer
    pub request_timeout_ms: u64,
    /// Our address must be confirmed at least this often
    pub network_timeout_ms: u64,
    /// How long the bus may stay silent before we consider it gone
    pub silence_timeout_ms: u64,
    /// Lower slot delay bound, also the minimum silence before any send
    pub min_slot_delay_ms: u32,
    pub max_slot_delay_ms: u32,
    /// Hardware MAC. A random one is generated when absent
    pub mac: Option<[u8; 8]>,
    /// Seed for slot delays and session ids, for reproducible runs
    pub rng_seed: Option<u64>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            device_type: NodeType::DIAGNOSTIC_DEVICE,
            ct_version: 2,
            receive_timeout_ms: 500,
            request_timeout_ms: 3_000,
            network_timeout_ms: 120_000,
            silence_timeout_ms: 60_000,
            min_slot_delay_ms: 100,
            max_slot_delay_ms: 2_500,
            mac: None,
            rng_seed: None,
        }
    }
}

impl NodeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=2).contains(&self.ct_version) {
            return Err(ConfigError::CtVersion(self.ct_version));
        }
        if self.device_type == NodeType::ANY {
            return Err(ConfigError::DeviceType);
        }
        if self.min_slot_delay_ms > self.max_slot_delay_ms {
            return Err(ConfigError::SlotDelayRange {
                min: self.min_slot_delay_ms,
                max: self.max_slot_delay_ms,
            });
        }
        Ok(())
    }
}
