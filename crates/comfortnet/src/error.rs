use core::fmt;

use serde::{Deserialize, Serialize};

use crate::well_known::MessageType;

/// Everything that can go wrong on the bus. None of these are fatal: each is
/// logged, counted, and recovered from inside `Node::tick`.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[non_exhaustive]
pub enum BusFault {
    /// A partial frame did not complete within the receive timeout
    FramingTimeout,
    /// A complete frame failed checksum validation
    ChecksumMismatch,
    /// A message addressed to us that we have no reply for
    UnhandledDirectedMessage(MessageType),
    /// The line was busy when our scheduled send came due
    ArbitrationCollision,
    /// Nothing heard for longer than the silence timeout
    SilenceTimeout,
    /// Our address was not confirmed within the network timeout
    AddressLeaseExpired,
}

impl fmt::Display for BusFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusFault::FramingTimeout => f.write_str("timed out reading partial message"),
            BusFault::ChecksumMismatch => f.write_str("checksum mismatch"),
            BusFault::UnhandledDirectedMessage(mt) => {
                write!(f, "no reply known for directed message {mt}")
            }
            BusFault::ArbitrationCollision => f.write_str("line busy at scheduled send"),
            BusFault::SilenceTimeout => f.write_str("network appears to be offline"),
            BusFault::AddressLeaseExpired => f.write_str("address lease expired"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum TransportError {
    Io(std::io::ErrorKind),
    /// The other end went away
    Closed,
}

impl From<std::io::Error> for TransportError {
    fn from(value: std::io::Error) -> Self {
        match value.kind() {
            std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::UnexpectedEof => {
                TransportError::Closed
            }
            kind => TransportError::Io(kind),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Io(kind) => write!(f, "transport i/o error: {kind}"),
            TransportError::Closed => f.write_str("transport closed"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Why a polling registration was refused
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RegisterPollError {
    /// Polls need a concrete node type to route to
    AnyNodeType,
    /// The R2R code is a grant, not something that can be polled
    RequestToReceive,
    /// Only payload-less queries can be synthesized from a registration
    NotPollable(MessageType),
}

impl fmt::Display for RegisterPollError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterPollError::AnyNodeType => f.write_str("cannot poll the ANY node type"),
            RegisterPollError::RequestToReceive => f.write_str("cannot poll with the R2R message type"),
            RegisterPollError::NotPollable(mt) => write!(f, "{mt} is not a payload-less query"),
        }
    }
}

impl std::error::Error for RegisterPollError {}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ConfigError {
    CtVersion(u8),
    DeviceType,
    SlotDelayRange { min: u32, max: u32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::CtVersion(v) => write!(f, "unsupported CT version {v}, expected 1 or 2"),
            ConfigError::DeviceType => f.write_str("device type must not be ANY (0x00)"),
            ConfigError::SlotDelayRange { min, max } => {
                write!(f, "minimum slot delay {min}ms exceeds maximum {max}ms")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
