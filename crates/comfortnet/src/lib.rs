#![doc = include_str!("../README.md")]

pub mod address;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod identity;
pub mod mdi;
pub mod mock;
pub mod node;
pub mod node_list;
pub mod queues;
pub mod scheduler;
pub mod shared_data;
pub mod transport;
pub mod well_known;
pub mod wire_frames;

pub use address::{NodeAddress, Subnet};
pub use config::NodeConfig;
pub use dispatch::{CommandEvent, DataEvent, DataValue, PacketEvent};
pub use error::{BusFault, RegisterPollError, TransportError};
pub use identity::{MacAddress, SessionId};
pub use node::{BusStats, MembershipState, Node};
pub use queues::{PendingMessage, Target};
pub use transport::Transport;
pub use well_known::{CommandType, MessageType, NodeType};
pub use wire_frames::{Frame, Header, PacketNumber};
