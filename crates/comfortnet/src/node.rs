//! The bus node state machine
//!
//! A [`Node`] owns everything: the transport, the receive accumulator, the
//! single outbound slot, the queues and the listener tables. It is driven by
//! calling [`Node::tick`] often (every few milliseconds); nothing happens
//! between ticks and the tick never fails. Faults are logged, counted in
//! [`BusStats`], and recovered from by dropping state or disconnecting.
//!
//! Membership is derived rather than stored: a node is `Joined` while it has
//! a node id, `AwaitingDiscoveryResponse` while a discovery attempt is open,
//! and `Unjoined` otherwise.

use std::rc::Rc;

use frame_acc::{FeedResult, FrameAccumulator};
use log::{debug, info, trace, warn};
use rand::{SeedableRng, rngs::StdRng};
use serde::Serialize;

use crate::{
    address::{NodeAddress, Subnet},
    clock::{Clock, StdClock},
    config::NodeConfig,
    dispatch::{
        CommandEvent, DATA_KEY_NETWORK_STATUS, DataEvent, DataValue, PacketEvent, Registry,
    },
    error::{BusFault, ConfigError, RegisterPollError},
    identity::{Identity, MAC_ADDRESS_SIZE, MacAddress, SESSION_ID_SIZE, SessionId},
    node_list::NodeList,
    queues::{PendingMessage, PendingQueue, PollEntry, PollQueue},
    scheduler::Scheduler,
    shared_data::SharedDataSector,
    transport::Transport,
    well_known::{
        CONTROL_COMMAND_HEADER_SIZE, CommandType, MAX_PAYLOAD_SIZE, MessageType, NodeType, R2R_ACK,
        R2R_NACK, SendMethod,
    },
    wire_frames::{
        DecodeError, EncodeError, FRAME_ROW_TITLE, Frame, FrameRow, HexSlice, LAYOUT, Header,
        PacketNumber, Payload, PayloadExt,
    },
};

/// Bytes pulled from the transport per read call
const READ_CHUNK: usize = 64;

// Payload offsets of SET_ADDRESS
const ADDRESS_NODE_ID_POS: usize = 0;
const ADDRESS_SUBNET_POS: usize = 1;
const ADDRESS_MAC_POS: usize = 2;
const ADDRESS_WRITE_POS: usize = ADDRESS_MAC_POS + MAC_ADDRESS_SIZE + SESSION_ID_SIZE;
const ADDRESS_WRITE: u8 = 0x01;

/// Payload length of another node's `[ACK, MAC, session]` acknowledgment
const ACK_FRAME_LEN: usize = 1 + MAC_ADDRESS_SIZE + SESSION_ID_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipState {
    Unjoined,
    AwaitingDiscoveryResponse,
    Joined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Rx,
    Tx,
}

impl Direction {
    fn as_str(&self) -> &'static str {
        match self {
            Direction::Rx => "RX",
            Direction::Tx => "TX",
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BusStats {
    pub frames_received: u64,
    pub frames_transmitted: u64,
    pub checksum_mismatches: u64,
    pub framing_timeouts: u64,
    pub unhandled_directed: u64,
    pub arbitration_collisions: u64,
    pub silence_timeouts: u64,
    pub lease_expiries: u64,
    pub disconnects: u64,
}

/// An open discovery attempt
struct Discovery {
    /// When our reply actually went out, the answer timeout runs from here
    replied_at: Option<u64>,
}

/// A queued message handed to the coordinator, waiting for its answer
struct InFlight {
    msg: PendingMessage,
    since: u64,
}

/// What to do with a directed message once pending traffic is ruled out
#[derive(Debug, PartialEq)]
enum AckAction {
    /// Handled, nothing to send
    None,
    Ack,
    /// We don't know how to answer
    Unknown,
}

pub struct Node<T: Transport, C: Clock = StdClock> {
    transport: T,
    clock: C,
    cfg: NodeConfig,
    rng: StdRng,

    acc: FrameAccumulator<Box<[u8]>>,
    sched: Scheduler,
    /// Answer to a directed request, sent on our next R2R grant
    r2r_reply: Option<Frame>,

    identity: Identity,
    node_id: NodeAddress,
    subnet: Subnet,
    discovery: Option<Discovery>,
    /// Only one token offer may be won per dataflow cycle
    won_token: bool,

    last_read_ms: u64,
    last_confirm_ms: u64,

    pending: PendingQueue,
    in_flight: Option<InFlight>,
    polls: PollQueue,

    nodes: NodeList,
    shared: SharedDataSector,
    listeners: Registry,
    stats: BusStats,
}

impl<T: Transport> Node<T, StdClock> {
    pub fn new_std(transport: T, cfg: NodeConfig) -> Result<Self, ConfigError> {
        Self::new(transport, StdClock::new(), cfg)
    }
}

impl<T: Transport, C: Clock> Node<T, C> {
    pub fn new(transport: T, mut clock: C, cfg: NodeConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let mut rng = match cfg.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mac = match cfg.mac {
            Some(bytes) => MacAddress::from_hardware(bytes),
            None => MacAddress::random(&mut rng),
        };
        let now = clock.now_ms();
        Ok(Self {
            transport,
            clock,
            rng,
            acc: FrameAccumulator::new_boxslice(LAYOUT),
            sched: Scheduler::new(cfg.min_slot_delay_ms, cfg.max_slot_delay_ms),
            r2r_reply: None,
            identity: Identity::new(mac),
            node_id: NodeAddress::UNASSIGNED,
            subnet: Subnet::BROADCAST,
            discovery: None,
            won_token: false,
            last_read_ms: now,
            last_confirm_ms: now,
            pending: PendingQueue::new(),
            in_flight: None,
            polls: PollQueue::new(),
            nodes: NodeList::new(),
            shared: SharedDataSector::new(),
            listeners: Registry::new(),
            stats: BusStats::default(),
            cfg,
        })
    }

    pub fn dump_config(&self) {
        info!("ComfortNet:");
        info!("  MAC: {}", self.identity.mac);
        info!("  Device Type: {}", self.cfg.device_type);
        info!("  CT Version: {}", self.cfg.ct_version);
    }

    /// One pass of the event loop: send if due, drain the transport, then
    /// check timeouts.
    pub fn tick(&mut self) {
        let now = self.clock.now_ms();

        if self.sched.is_due(now.saturating_sub(self.last_read_ms)) {
            self.try_send(now);
        }

        let available = self.transport.bytes_available();
        if available > 0 {
            self.last_read_ms = now;
            self.read_available(available, now);
        } else {
            let quiet = now.saturating_sub(self.last_read_ms);
            if self.node_id.is_assigned() && quiet > self.cfg.silence_timeout_ms {
                self.fault(BusFault::SilenceTimeout);
                self.disconnect();
            } else if quiet > self.cfg.receive_timeout_ms && !self.acc.is_empty() {
                self.fault(BusFault::FramingTimeout);
                self.acc.reset();
            }
        }

        if self.node_id.is_assigned()
            && now.saturating_sub(self.last_confirm_ms) > self.cfg.network_timeout_ms
        {
            self.fault(BusFault::AddressLeaseExpired);
            self.disconnect();
        }

        self.check_request_timeouts(now);
    }

    /// Drop all session state. Safe to call at any time, and more than once.
    pub fn disconnect(&mut self) {
        let was_joined = self.node_id.is_assigned();

        self.acc.reset();
        self.sched.cancel();
        self.r2r_reply = None;
        self.discovery = None;
        self.won_token = false;
        self.node_id = NodeAddress::UNASSIGNED;
        self.subnet = Subnet::BROADCAST;
        self.identity.session = SessionId::NONE;
        self.pending.clear();
        self.in_flight = None;

        if was_joined {
            info!("Disconnected, discarding session information");
            self.stats.disconnects += 1;
            self.notify_network_status(false);
        }
    }

    // ---- registration ----

    pub fn register_listener(&mut self, key: &str, f: impl Fn(&DataEvent) + 'static) {
        self.listeners.data.register(key.to_string(), Rc::new(f));
    }

    pub fn register_command_listener(
        &mut self,
        command: CommandType,
        f: impl Fn(&CommandEvent) + 'static,
    ) {
        self.listeners.commands.register(command, Rc::new(f));
    }

    pub fn register_packet_listener(
        &mut self,
        message_type: MessageType,
        f: impl Fn(&PacketEvent) + 'static,
    ) {
        self.listeners.packets.register(message_type, Rc::new(f));
    }

    pub fn register_device_polling(
        &mut self,
        node_type: NodeType,
        poll_message: MessageType,
        poll_once: bool,
    ) -> Result<(), RegisterPollError> {
        self.polls.register(node_type, poll_message, poll_once)
    }

    /// Move a device to the back of the poll priority list
    pub fn device_poll_to_end(&mut self, node_type: NodeType, poll_message: MessageType) {
        self.polls.move_to_end(node_type, poll_message);
    }

    /// Queue an application message for our next send opportunity
    pub fn queue_message(&mut self, msg: PendingMessage) -> Result<(), EncodeError> {
        if msg.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(EncodeError::PayloadTooLarge(msg.payload.len()));
        }
        self.pending.push(msg);
        Ok(())
    }

    // ---- accessors ----

    pub fn state(&self) -> MembershipState {
        if self.node_id.is_assigned() {
            MembershipState::Joined
        } else if self.discovery.is_some() {
            MembershipState::AwaitingDiscoveryResponse
        } else {
            MembershipState::Unjoined
        }
    }

    pub fn node_id(&self) -> NodeAddress {
        self.node_id
    }

    pub fn subnet(&self) -> Subnet {
        self.subnet
    }

    pub fn mac(&self) -> MacAddress {
        self.identity.mac
    }

    pub fn session_id(&self) -> SessionId {
        self.identity.session
    }

    pub fn node_type_at(&self, addr: NodeAddress) -> NodeType {
        self.nodes.node_type_at(addr)
    }

    pub fn node_mac_at(&self, addr: NodeAddress) -> Option<MacAddress> {
        self.nodes.node_mac_at(addr)
    }

    pub fn shared_data(&self, node_type: NodeType) -> Option<&[u8]> {
        self.shared.get(node_type)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn poll_queue(&self) -> &[PollEntry] {
        self.polls.entries()
    }

    /// The message handed out on our last grant, if still unanswered
    pub fn in_flight(&self) -> Option<&PendingMessage> {
        self.in_flight.as_ref().map(|f| &f.msg)
    }

    /// The frame waiting in the outbound slot
    pub fn queued_frame(&self) -> Option<&Frame> {
        self.sched.pending()
    }

    pub fn stats(&self) -> &BusStats {
        &self.stats
    }

    pub fn config(&self) -> &NodeConfig {
        &self.cfg
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // ---- transmit path ----

    fn try_send(&mut self, now: u64) {
        // Last chance to notice someone else talking
        if self.transport.bytes_available() > 0 {
            self.sched.cancel();
            self.fault(BusFault::ArbitrationCollision);
            self.abort_discovery();
            return;
        }
        let Some(frame) = self.sched.take() else {
            return;
        };

        let raw = frame.encode();
        self.transport.set_drive_enable(true);
        let res = self
            .transport
            .write_all(&raw)
            .and_then(|()| self.transport.flush());
        self.transport.set_drive_enable(false);

        match res {
            Ok(()) => {
                self.stats.frames_transmitted += 1;
                self.handle_frame(&frame, Direction::Tx, now);
            }
            Err(e) => {
                warn!("Dropping {} frame: {e}", frame.hdr.message_type);
                self.abort_discovery();
            }
        }
    }

    /// Buffer a frame in the outbound slot
    fn transmit(&mut self, hdr: Header, payload: Payload, arbitrate: bool) {
        self.sched.queue(Frame { hdr, payload }, arbitrate, &mut self.rng);
    }

    /// Header for a reply from our current address
    fn reply_header(&self, dst: NodeAddress, message_type: MessageType, dataflow: bool) -> Header {
        Header {
            dst,
            src: self.node_id,
            subnet: self.subnet,
            send_method: SendMethod::NO_ROUTE,
            send_param_1: 0,
            send_param_2: 0,
            src_node_type: self.cfg.device_type,
            message_type,
            packet_number: PacketNumber::new(dataflow, self.subnet.is_version_1()),
        }
    }

    /// `[ACK, MAC, session]`
    fn ack_payload(&self) -> Payload {
        let mut payload = Payload::new();
        payload.put(&[R2R_ACK]).put(&self.identity.credentials());
        payload
    }

    // ---- receive path ----

    fn read_available(&mut self, available: usize, now: u64) {
        let mut remaining = available;
        let mut buf = [0u8; READ_CHUNK];
        while remaining > 0 {
            let n = remaining.min(READ_CHUNK);
            if let Err(e) = self.transport.read_exact(&mut buf[..n]) {
                warn!("Failed to read {n} bytes: {e}");
                return;
            }
            remaining -= n;
            trace!("Read {n} bytes, {} buffered", self.acc.len());

            let mut window = &buf[..n];
            loop {
                let decoded = match self.acc.feed(window) {
                    FeedResult::Consumed => break,
                    FeedResult::OverFull(rest) => {
                        warn!("Dropping oversized frame");
                        window = rest;
                        continue;
                    }
                    FeedResult::Success { data, remaining } => {
                        window = remaining;
                        Frame::decode(data)
                    }
                };
                self.on_decoded(decoded, now);
            }
        }
    }

    fn on_decoded(&mut self, decoded: Result<Frame, DecodeError>, now: u64) {
        match decoded {
            Ok(frame) => {
                self.stats.frames_received += 1;
                self.handle_frame(&frame, Direction::Rx, now);
            }
            Err(e @ DecodeError::ChecksumMismatch { .. }) => {
                warn!("{e}");
                self.fault(BusFault::ChecksumMismatch);
            }
            Err(e) => warn!("Dropping frame: {e}"),
        }
    }

    /// Everything a frame does to our state. Transmitted frames are replayed
    /// through here only to note what we said.
    fn handle_frame(&mut self, frame: &Frame, dir: Direction, now: u64) {
        debug!("{FRAME_ROW_TITLE}");
        debug!(
            "{}",
            FrameRow {
                dir: dir.as_str(),
                frame
            }
        );

        let hdr = &frame.hdr;
        if dir == Direction::Tx {
            if hdr.message_type == MessageType::TOKEN_OFFER_RESPONSE {
                // Most likely won, leave the rest of the cycle to others
                self.won_token = true;
            } else if hdr.message_type == MessageType::NODE_DISCOVERY_RESPONSE {
                if let Some(discovery) = self.discovery.as_mut() {
                    discovery.replied_at = Some(now);
                }
            }
            return;
        }

        let is_broadcast = hdr.dst == NodeAddress::BROADCAST
            && (hdr.subnet == self.subnet || hdr.subnet == Subnet::BROADCAST);

        // Start of a new dataflow cycle
        if hdr.message_type == MessageType::NODE_DISCOVERY {
            self.won_token = false;
        }

        if self.node_id.is_assigned() {
            if is_broadcast {
                self.handle_member_broadcast(frame, now);
            } else if hdr.dst == self.node_id && hdr.subnet == self.subnet {
                self.handle_directed(frame, now);
            }
        } else if self.discovery.is_none() && hdr.message_type == MessageType::NODE_DISCOVERY {
            self.begin_discovery(frame);
        } else if is_broadcast && hdr.message_type == MessageType::SET_ADDRESS {
            self.accept_address(frame, now);
        }

        self.eavesdrop(frame);
    }

    // ---- membership ----

    fn begin_discovery(&mut self, frame: &Frame) {
        let Some(&wanted) = frame.payload.first() else {
            warn!("Ignoring discovery request without node type");
            return;
        };
        if !NodeType(wanted).matches(self.cfg.device_type) {
            return;
        }

        info!("Received discovery request, responding...");
        self.identity.session = SessionId::random(&mut self.rng);
        self.discovery = Some(Discovery { replied_at: None });

        let mut payload = Payload::new();
        payload
            .put(&[self.cfg.device_type.0, 0x00])
            .put(&self.identity.credentials());
        let hdr = Header {
            dst: NodeAddress::COORDINATOR,
            src: self.node_id,
            subnet: Subnet::BROADCAST,
            send_method: SendMethod::NO_ROUTE,
            send_param_1: 0,
            send_param_2: 0,
            src_node_type: self.cfg.device_type,
            message_type: MessageType::NODE_DISCOVERY_RESPONSE,
            packet_number: PacketNumber::new(false, self.cfg.ct_version == 1),
        };
        self.transmit(hdr, payload, true);
    }

    /// Cancel an open discovery attempt. We wait for the next discovery
    /// broadcast to try again.
    fn abort_discovery(&mut self) {
        if self.discovery.take().is_some() {
            info!("Abandoning discovery attempt");
            self.identity.session = SessionId::NONE;
        }
    }

    fn accept_address(&mut self, frame: &Frame, now: u64) {
        let payload = &frame.payload;
        let ours = payload
            .get(ADDRESS_MAC_POS..)
            .is_some_and(|creds| self.identity.matches(creds));
        if !ours {
            return;
        }
        if payload.get(ADDRESS_WRITE_POS) != Some(&ADDRESS_WRITE) {
            warn!("Failed to get address!");
            return;
        }
        let new_id = NodeAddress(payload[ADDRESS_NODE_ID_POS]);
        if !new_id.is_node_id() {
            warn!("Ignoring assignment of unusable address {new_id}");
            return;
        }

        let old_id = self.node_id;
        self.last_confirm_ms = now;
        self.node_id = new_id;
        self.subnet = Subnet(payload[ADDRESS_SUBNET_POS]);
        self.discovery = None;

        let mut reply = Payload::new();
        reply
            .put(&[self.node_id.0, self.subnet.0])
            .put(&self.identity.credentials())
            .put(&[ADDRESS_WRITE]);
        let hdr = self.reply_header(
            NodeAddress::COORDINATOR,
            MessageType::SET_ADDRESS_RESPONSE,
            false,
        );
        self.transmit(hdr, reply, false);

        if !old_id.is_assigned() {
            info!("Joined network as address: {} (subnet {})", self.node_id, self.subnet);
            self.notify_network_status(true);
        } else if old_id != self.node_id {
            info!("Network address reassigned: {} (Old: {old_id})", self.node_id);
        } else {
            debug!("Network address confirmed: {}", self.node_id);
        }
    }

    fn handle_member_broadcast(&mut self, frame: &Frame, now: u64) {
        let mt = frame.hdr.message_type;
        if mt == MessageType::ADDRESS_CONFIRMATION {
            self.last_confirm_ms = now;
            let listed = frame.payload.get(self.node_id.0 as usize).copied();
            if listed != Some(self.cfg.device_type.0) {
                warn!("Not in node list, disconnecting");
                self.disconnect();
            }
        } else if mt == MessageType::SET_ADDRESS {
            self.accept_address(frame, now);
        } else if mt == MessageType::TOKEN_OFFER
            && !self.won_token
            && !(self.pending.is_empty() && self.polls.is_empty())
        {
            let Some(&offered) = frame.payload.first() else {
                warn!("Ignoring token offer without node type");
                return;
            };
            if !NodeType(offered).matches(self.cfg.device_type) {
                return;
            }
            let mut reply = Payload::new();
            reply
                .put(&[self.node_id.0, self.subnet.0])
                .put(&self.identity.credentials());
            let hdr = self.reply_header(
                NodeAddress::COORDINATOR,
                MessageType::TOKEN_OFFER_RESPONSE,
                false,
            );
            self.transmit(hdr, reply, true);
        }
    }

    fn handle_directed(&mut self, frame: &Frame, now: u64) {
        let hdr = &frame.hdr;
        if hdr.message_type == MessageType::SET_NETWORK_NODE_LIST {
            self.nodes.set_types(&frame.payload);
            let list: Vec<u8> = self.nodes.types_raw().collect();
            let mut echo = Payload::new();
            echo.put(&list);
            let reply = self.reply_header(hdr.src, MessageType::SET_NETWORK_NODE_LIST_RESPONSE, false);
            self.transmit(reply, echo, false);
        } else if hdr.message_type == MessageType::REQUEST_TO_RECEIVE_RESPONSE {
            self.grant(hdr.src, now);
        } else {
            self.answer_directed(frame);
        }
    }

    // ---- dataflow ----

    /// The coordinator gave us the bus. Exactly one frame goes back.
    fn grant(&mut self, src: NodeAddress, now: u64) {
        let sends_message =
            self.r2r_reply.is_none() && !(self.pending.is_empty() && self.polls.is_empty());
        // Never answered, rotate it out before picking what goes next
        let superseded = self.in_flight.as_ref().map(|f| f.msg.message_type);
        if let Some(mt) = superseded.filter(|_| sends_message) {
            debug!("Unanswered {mt} superseded");
            self.finish_in_flight();
        }

        if self.pending.is_empty() {
            if let Some(poll) = self.polls.next_poll() {
                self.pending.push(PendingMessage::to_type(
                    poll.node_type,
                    poll.poll_message,
                    &[],
                ));
            }
        }

        if let Some(reply) = self.r2r_reply.take() {
            // Answers a question asked since our last grant
            self.sched.queue(reply, false, &mut self.rng);
        } else if let Some(msg) = self.pending.pop() {
            let mut hdr = self.reply_header(src, msg.message_type, false);
            hdr.send_method = msg.target.send_method();
            hdr.send_param_1 = msg.target.send_param_1();
            match Frame::new(hdr, &msg.payload) {
                Ok(frame) => {
                    self.sched.queue(frame, false, &mut self.rng);
                    self.in_flight = Some(InFlight { msg, since: now });
                }
                Err(e) => warn!("Dropping queued {}: {e}", msg.message_type),
            }
        } else {
            let hdr = self.reply_header(src, MessageType::REQUEST_TO_RECEIVE_RESPONSE, true);
            let payload = self.ack_payload();
            self.transmit(hdr, payload, false);
        }
    }

    /// The in-flight message is done with, answered or not. Polls rotate to
    /// the back of the priority list.
    fn finish_in_flight(&mut self) {
        if let Some(done) = self.in_flight.take() {
            if let Some((node_type, poll_message)) = done.msg.as_poll() {
                self.polls.move_to_end(node_type, poll_message);
            }
        }
    }

    fn check_request_timeouts(&mut self, now: u64) {
        let timeout = self.cfg.request_timeout_ms;
        let expired = self
            .in_flight
            .as_ref()
            .filter(|f| now.saturating_sub(f.since) > timeout)
            .map(|f| f.msg.message_type);
        if let Some(mt) = expired {
            warn!("No answer to our {mt}, giving up");
            self.finish_in_flight();
        }
        let discovery_expired = self
            .discovery
            .as_ref()
            .and_then(|d| d.replied_at)
            .is_some_and(|at| now.saturating_sub(at) > timeout);
        if discovery_expired {
            warn!("No address assigned after discovery reply");
            self.abort_discovery();
        }
    }

    /// Directed messages other than node list and R2R
    fn answer_directed(&mut self, frame: &Frame) {
        let hdr = &frame.hdr;
        let mt = hdr.message_type;
        let mut action = AckAction::Unknown;

        let expected = self
            .in_flight
            .as_ref()
            .filter(|f| f.msg.target.send_param_1() == hdr.send_param_1)
            .map(|f| f.msg.message_type);
        if let Some(ours) = expected {
            if mt == ours {
                // Coordinator acknowledging our request
                action = AckAction::None;
                match frame.payload.first() {
                    Some(&R2R_ACK) => {}
                    Some(&R2R_NACK) => warn!("Coordinator NAKed our {mt}"),
                    _ => warn!("Coordinator did not ACK our {mt}"),
                }
            } else if mt == ours.response() {
                action = AckAction::Ack;
                self.finish_in_flight();
            }
        }

        if action == AckAction::Unknown {
            action = match mt {
                MessageType::GET_NODE_ID => {
                    let mut payload = Payload::new();
                    payload
                        .put(&[self.cfg.device_type.0])
                        .put(&self.identity.credentials());
                    let reply = self.reply_header(hdr.src, mt.response(), false);
                    self.r2r_reply = Some(Frame {
                        hdr: reply,
                        payload,
                    });
                    AckAction::Ack
                }
                MessageType::GET_NODE_ID_RESPONSE => AckAction::Ack,
                MessageType::NETWORK_SHARED_DATA_SECTOR_IMAGE_READ_WRITE_REQUEST => {
                    match self.shared.handle_request(&frame.payload) {
                        Some(payload) => {
                            let reply = self.reply_header(hdr.src, mt.response(), false);
                            self.r2r_reply = Some(Frame {
                                hdr: reply,
                                payload,
                            });
                            AckAction::Ack
                        }
                        None => {
                            warn!("Ignoring empty shared data request");
                            AckAction::None
                        }
                    }
                }
                MessageType::NETWORK_SHARED_DATA_SECTOR_IMAGE_READ_WRITE_REQUEST_RESPONSE => {
                    if frame.payload.first() != Some(&R2R_ACK) {
                        warn!("Received error during network shared data response!");
                    }
                    AckAction::None
                }
                _ => AckAction::Unknown,
            };
        }

        match action {
            AckAction::Ack => {
                let reply = self.reply_header(hdr.src, mt, true);
                let payload = self.ack_payload();
                self.transmit(reply, payload, false);
            }
            AckAction::None => {}
            AckAction::Unknown if !hdr.packet_number.is_dataflow() => {
                self.fault(BusFault::UnhandledDirectedMessage(mt));
            }
            AckAction::Unknown => {}
        }
    }

    // ---- eavesdropping ----

    /// Passive observation of every received frame, whoever it is for
    fn eavesdrop(&mut self, frame: &Frame) {
        let hdr = &frame.hdr;
        let payload = &frame.payload;
        let dataflow = hdr.packet_number.is_dataflow();

        if dataflow
            && payload.len() == ACK_FRAME_LEN
            && payload[0] == R2R_ACK
            && hdr.src != NodeAddress::BROADCAST
        {
            if let Some(mac) = MacAddress::from_slice(&payload[1..1 + MAC_ADDRESS_SIZE]) {
                self.nodes.learn_mac(hdr.src, mac);
            }
        }

        let mt = hdr.message_type;
        if mt == MessageType::SET_CONTROL_COMMAND || mt == MessageType::SET_CONTROL_COMMAND_RESPONSE {
            if payload.len() <= CONTROL_COMMAND_HEADER_SIZE {
                // Just an acknowledgment, nothing to deliver
                return;
            }
            let (head, args) = payload.split_at(CONTROL_COMMAND_HEADER_SIZE);
            let command = CommandType::from_le_bytes([head[0], head[1]]);
            debug!("Command | Payload HEX");
            debug!("{command}  | {}", HexSlice(args));

            let response = mt == MessageType::SET_CONTROL_COMMAND_RESPONSE;
            let (node_type, node_mac) = if response {
                (hdr.src_node_type, self.nodes.node_mac_at(hdr.src))
            } else {
                (self.nodes.node_type_at(hdr.dst), self.nodes.node_mac_at(hdr.dst))
            };
            let event = CommandEvent {
                node_type,
                node_mac,
                command,
                response,
                payload: args.to_vec(),
            };
            self.listeners.commands.call(&command, &event);
        } else if !dataflow && mt.is_eavesdropped_response() {
            let event = PacketEvent {
                node_type: hdr.src_node_type,
                node_mac: self.nodes.node_mac_at(hdr.src),
                message_type: mt,
                payload: payload.to_vec(),
            };
            self.listeners.packets.call(&mt, &event);
        }
    }

    // ---- bookkeeping ----

    fn notify_network_status(&self, joined: bool) {
        let event = DataEvent {
            device_type: self.cfg.device_type,
            value: DataValue::Bool(joined),
        };
        self.listeners
            .data
            .call(&DATA_KEY_NETWORK_STATUS.to_string(), &event);
    }

    fn fault(&mut self, fault: BusFault) {
        warn!("{fault}");
        let stats = &mut self.stats;
        match fault {
            BusFault::FramingTimeout => stats.framing_timeouts += 1,
            BusFault::ChecksumMismatch => stats.checksum_mismatches += 1,
            BusFault::UnhandledDirectedMessage(_) => stats.unhandled_directed += 1,
            BusFault::ArbitrationCollision => stats.arbitration_collisions += 1,
            BusFault::SilenceTimeout => stats.silence_timeouts += 1,
            BusFault::AddressLeaseExpired => stats.lease_expiries += 1,
        }
    }
}
