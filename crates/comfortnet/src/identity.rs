//! Who we are on the bus: a MAC for the life of the process, and a session
//! id per discovery attempt.

use core::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};

pub const MAC_ADDRESS_SIZE: usize = 8;
pub const SESSION_ID_SIZE: usize = 8;

/// First byte of a randomly generated MAC
const RANDOM_MAC_MARKER: u8 = 0xFF;
/// First byte of a hardware derived MAC
const HARDWARE_MAC_MARKER: u8 = 0x00;

#[cfg_attr(feature = "defmt-v1", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MacAddress(pub [u8; MAC_ADDRESS_SIZE]);

impl MacAddress {
    /// A random MAC, marked as such in the reserved first byte
    pub fn random<R: RngCore>(rng: &mut R) -> Self {
        let mut mac = [0u8; MAC_ADDRESS_SIZE];
        rng.fill_bytes(&mut mac);
        mac[0] = RANDOM_MAC_MARKER;
        Self(mac)
    }

    /// A MAC from hardware identity bytes. The reserved first byte is
    /// always the hardware marker.
    pub fn from_hardware(bytes: [u8; MAC_ADDRESS_SIZE]) -> Self {
        let mut mac = bytes;
        mac[0] = HARDWARE_MAC_MARKER;
        Self(mac)
    }

    pub fn from_slice(data: &[u8]) -> Option<Self> {
        data.try_into().ok().map(Self)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i != 0 {
                f.write_str(":")?;
            }
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// All zero means "no session"
#[cfg_attr(feature = "defmt-v1", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub [u8; SESSION_ID_SIZE]);

impl SessionId {
    pub const NONE: Self = Self([0; SESSION_ID_SIZE]);

    pub fn random<R: RngCore>(rng: &mut R) -> Self {
        let mut id = [0u8; SESSION_ID_SIZE];
        while id == Self::NONE.0 {
            rng.fill_bytes(&mut id);
        }
        Self(id)
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub mac: MacAddress,
    pub session: SessionId,
}

impl Identity {
    pub fn new(mac: MacAddress) -> Self {
        Self {
            mac,
            session: SessionId::NONE,
        }
    }

    /// MAC then session id, the trailer of most of our replies
    pub fn credentials(&self) -> [u8; MAC_ADDRESS_SIZE + SESSION_ID_SIZE] {
        let mut out = [0u8; MAC_ADDRESS_SIZE + SESSION_ID_SIZE];
        out[..MAC_ADDRESS_SIZE].copy_from_slice(&self.mac.0);
        out[MAC_ADDRESS_SIZE..].copy_from_slice(&self.session.0);
        out
    }

    /// Whether `data` starts with our MAC and live session id. An empty
    /// session never matches.
    pub fn matches(&self, data: &[u8]) -> bool {
        !self.session.is_none() && data.get(..MAC_ADDRESS_SIZE + SESSION_ID_SIZE) == Some(&self.credentials()[..])
    }
}
