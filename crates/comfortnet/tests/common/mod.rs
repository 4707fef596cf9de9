#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc};

use comfortnet::{
    DataEvent, DataValue, Frame, Header, MessageType, Node, NodeAddress, NodeConfig, NodeType,
    PacketNumber, Subnet,
    dispatch::DATA_KEY_NETWORK_STATUS,
    mock::{ManualClock, MockBus},
    well_known::SendMethod,
};

pub const OUR_ID: NodeAddress = NodeAddress(0x05);
pub const OUR_SUBNET: Subnet = Subnet::VERSION_2;
pub const DEVICE: NodeType = NodeType::THERMOSTAT;

pub struct Harness {
    pub node: Node<MockBus, ManualClock>,
    pub bus: MockBus,
    pub clock: ManualClock,
    pub status: Rc<RefCell<Vec<bool>>>,
}

pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

impl Harness {
    pub fn new() -> Self {
        init_logs();
        let bus = MockBus::new();
        let clock = ManualClock::new(1_000);
        let cfg = NodeConfig {
            device_type: DEVICE,
            rng_seed: Some(0xC0FFEE),
            ..Default::default()
        };
        let mut node = Node::new(bus.clone(), clock.clone(), cfg).unwrap();

        let status = Rc::new(RefCell::new(vec![]));
        let sink = status.clone();
        node.register_listener(DATA_KEY_NETWORK_STATUS, move |ev: &DataEvent| {
            assert_eq!(ev.device_type, DEVICE);
            match ev.value {
                DataValue::Bool(b) => sink.borrow_mut().push(b),
                ref other => panic!("unexpected {other:?}"),
            }
        });

        Self {
            node,
            bus,
            clock,
            status,
        }
    }

    /// A harness whose node has completed the join handshake as `OUR_ID`
    /// and has sent its `SET_ADDRESS_RESPONSE`.
    pub fn joined() -> Self {
        let mut h = Self::new();
        h.discover();
        h.flush_tx();
        h.assign(OUR_ID, OUR_SUBNET);
        let sent = h.flush_tx();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].hdr.message_type, MessageType::SET_ADDRESS_RESPONSE);
        h.status.borrow_mut().clear();
        h
    }

    pub fn inject(&self, hdr: Header, payload: &[u8]) {
        self.bus.inject_frame(hdr, payload).unwrap();
    }

    /// Inject and process
    pub fn rx(&mut self, hdr: Header, payload: &[u8]) {
        self.inject(hdr, payload);
        self.node.tick();
    }

    /// Let enough quiet time pass for any queued frame (even one with the
    /// longest slot delay) to go out, and collect what was written.
    pub fn flush_tx(&mut self) -> Vec<Frame> {
        self.clock.advance(2_501);
        self.node.tick();
        self.bus.take_frames()
    }

    /// Send a non-arbitrated frame after just the minimum silence
    pub fn flush_normal(&mut self) -> Vec<Frame> {
        self.clock.advance(101);
        self.node.tick();
        self.bus.take_frames()
    }

    /// Like [`Harness::flush_tx`], but the bytes as written
    pub fn flush_tx_raw(&mut self) -> Vec<Vec<u8>> {
        self.clock.advance(2_501);
        self.node.tick();
        self.bus.take_written()
    }

    /// Answer a discovery broadcast for any node type
    pub fn discover(&mut self) {
        self.rx(
            coordinator_broadcast(Subnet::BROADCAST, MessageType::NODE_DISCOVERY),
            &[NodeType::ANY.0],
        );
    }

    pub fn set_address_payload(&self, id: NodeAddress, subnet: Subnet) -> Vec<u8> {
        let mut payload = vec![id.0, subnet.0];
        payload.extend_from_slice(&self.node.mac().0);
        payload.extend_from_slice(&self.node.session_id().0);
        payload.push(0x01);
        payload
    }

    pub fn assign(&mut self, id: NodeAddress, subnet: Subnet) {
        let payload = self.set_address_payload(id, subnet);
        self.rx(
            coordinator_broadcast(Subnet::BROADCAST, MessageType::SET_ADDRESS),
            &payload,
        );
    }

    /// `[MAC, session]` as the node currently has them
    pub fn credentials(&self) -> Vec<u8> {
        let mut out = self.node.mac().0.to_vec();
        out.extend_from_slice(&self.node.session_id().0);
        out
    }

    pub fn ack_payload(&self) -> Vec<u8> {
        let mut out = vec![0x06];
        out.extend_from_slice(&self.credentials());
        out
    }
}

pub fn header(
    dst: NodeAddress,
    src: NodeAddress,
    subnet: Subnet,
    message_type: MessageType,
    dataflow: bool,
) -> Header {
    Header {
        dst,
        src,
        subnet,
        send_method: SendMethod::NO_ROUTE,
        send_param_1: 0,
        send_param_2: 0,
        src_node_type: NodeType::NETWORK_COORDINATOR,
        message_type,
        packet_number: PacketNumber::new(dataflow, false),
    }
}

pub fn coordinator_broadcast(subnet: Subnet, message_type: MessageType) -> Header {
    header(
        NodeAddress::BROADCAST,
        NodeAddress::COORDINATOR,
        subnet,
        message_type,
        false,
    )
}

/// A coordinator frame addressed to our node
pub fn to_us(message_type: MessageType, dataflow: bool) -> Header {
    header(OUR_ID, NodeAddress::COORDINATOR, OUR_SUBNET, message_type, dataflow)
}

pub fn r2r() -> Header {
    to_us(MessageType::REQUEST_TO_RECEIVE_RESPONSE, true)
}
