//! Outbound work waiting for the coordinator to grant us the bus

use std::collections::VecDeque;

use log::{error, warn};

use crate::{
    address::NodeAddress,
    error::RegisterPollError,
    well_known::{ControlCommandRoute, MessageType, NodeType, SendMethod},
};

/// How the coordinator should route one of our queued messages
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    /// No routing, straight to whoever granted us the bus
    Direct,
    /// To the node best suited for a control command
    ControlCommand(ControlCommandRoute),
    /// To the best node of a type
    NodeType(NodeType),
    /// To the node at a node list position
    NodeId(NodeAddress),
}

impl Target {
    pub fn send_method(&self) -> SendMethod {
        match self {
            Target::Direct => SendMethod::NO_ROUTE,
            Target::ControlCommand(_) => SendMethod::CONTROL_COMMAND,
            Target::NodeType(_) => SendMethod::NODE_TYPE,
            Target::NodeId(_) => SendMethod::NODE_ID,
        }
    }

    pub fn send_param_1(&self) -> u8 {
        match self {
            Target::Direct => 0,
            Target::ControlCommand(route) => route.0,
            Target::NodeType(node_type) => node_type.0,
            Target::NodeId(addr) => addr.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PendingMessage {
    pub target: Target,
    pub message_type: MessageType,
    pub payload: Vec<u8>,
}

impl PendingMessage {
    pub fn new(target: Target, message_type: MessageType, payload: &[u8]) -> Self {
        Self {
            target,
            message_type,
            payload: payload.to_vec(),
        }
    }

    pub fn by_command(route: ControlCommandRoute, message_type: MessageType, payload: &[u8]) -> Self {
        Self::new(Target::ControlCommand(route), message_type, payload)
    }

    pub fn to_type(node_type: NodeType, message_type: MessageType, payload: &[u8]) -> Self {
        Self::new(Target::NodeType(node_type), message_type, payload)
    }

    pub fn to_address(addr: NodeAddress, message_type: MessageType, payload: &[u8]) -> Self {
        Self::new(Target::NodeId(addr), message_type, payload)
    }

    /// The poll entry this message was synthesized from, if it looks like one
    pub(crate) fn as_poll(&self) -> Option<(NodeType, MessageType)> {
        match self.target {
            Target::NodeType(node_type)
                if self.payload.is_empty() && self.message_type.is_poll_query() =>
            {
                Some((node_type, self.message_type))
            }
            _ => None,
        }
    }
}

/// FIFO of application messages
#[derive(Default, Debug)]
pub struct PendingQueue {
    inner: VecDeque<PendingMessage>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, msg: PendingMessage) {
        self.inner.push_back(msg);
    }

    pub fn pop(&mut self) -> Option<PendingMessage> {
        self.inner.pop_front()
    }

    pub fn front(&self) -> Option<&PendingMessage> {
        self.inner.front()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollEntry {
    pub node_type: NodeType,
    pub poll_message: MessageType,
    pub poll_once: bool,
}

impl PollEntry {
    fn is(&self, node_type: NodeType, poll_message: MessageType) -> bool {
        self.node_type == node_type && self.poll_message == poll_message
    }
}

/// Priority list of devices to poll when we have nothing else to say.
/// The head is polled next.
#[derive(Default, Debug)]
pub struct PollQueue {
    entries: Vec<PollEntry>,
}

impl PollQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validated registration. Response codes are normalized to their request.
    pub fn register(
        &mut self,
        node_type: NodeType,
        poll_message: MessageType,
        poll_once: bool,
    ) -> Result<(), RegisterPollError> {
        let poll_message = poll_message.request();
        let res = if node_type == NodeType::ANY {
            Err(RegisterPollError::AnyNodeType)
        } else if poll_message == MessageType::REQUEST_TO_RECEIVE_RESPONSE {
            Err(RegisterPollError::RequestToReceive)
        } else if !poll_message.is_poll_query() {
            Err(RegisterPollError::NotPollable(poll_message))
        } else {
            Ok(())
        };
        if let Err(e) = res {
            error!("Cannot register polling of {poll_message} for node type {node_type}: {e}");
            return Err(e);
        }
        self.push(node_type, poll_message, poll_once);
        Ok(())
    }

    /// Unvalidated registration. Deduplicates by (node type, message); a
    /// recurring registration upgrades an existing poll-once entry.
    pub fn push(&mut self, node_type: NodeType, poll_message: MessageType, poll_once: bool) {
        match self.entries.iter_mut().find(|e| e.is(node_type, poll_message)) {
            Some(existing) => {
                if existing.poll_once && !poll_once {
                    existing.poll_once = false;
                }
            }
            None => self.entries.push(PollEntry {
                node_type,
                poll_message,
                poll_once,
            }),
        }
    }

    /// Move an entry to the back of the priority list. Poll-once entries are
    /// removed instead.
    pub fn move_to_end(&mut self, node_type: NodeType, poll_message: MessageType) {
        let Some(pos) = self.entries.iter().position(|e| e.is(node_type, poll_message)) else {
            return;
        };
        let entry = self.entries.remove(pos);
        if !entry.poll_once {
            self.entries.push(entry);
        }
    }

    /// The next entry to poll, dropping any head that cannot be expressed
    /// as a payload-less query.
    pub fn next_poll(&mut self) -> Option<PollEntry> {
        let head = *self.entries.first()?;
        if head.poll_message.is_poll_query() {
            Some(head)
        } else {
            warn!(
                "Unable to handle poll request for message type {} to node type {}",
                head.poll_message, head.node_type
            );
            self.entries.remove(0);
            None
        }
    }

    pub fn entries(&self) -> &[PollEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
