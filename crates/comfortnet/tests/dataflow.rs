use std::{cell::RefCell, rc::Rc};

use comfortnet::{
    MessageType, NodeAddress, NodeType, PacketEvent, PendingMessage, Subnet,
    queues::PollEntry,
    well_known::{ControlCommandRoute, SendMethod},
};

mod common;
use common::*;

#[test]
fn grant_sends_queued_message() {
    let mut h = Harness::joined();
    h.node
        .queue_message(PendingMessage::to_type(
            NodeType::GAS_FURNACE,
            MessageType::SET_CONTROL_COMMAND,
            &[0x64, 0x00, 0x50],
        ))
        .unwrap();
    h.node
        .queue_message(PendingMessage::by_command(
            ControlCommandRoute::COOL,
            MessageType::SET_CONTROL_COMMAND,
            &[0x65, 0x00, 0x00],
        ))
        .unwrap();

    h.rx(r2r(), &[]);
    assert_eq!(h.node.pending_len(), 1);
    let sent = h.flush_tx();
    assert_eq!(sent.len(), 1);
    let frame = &sent[0];
    assert_eq!(frame.hdr.dst, NodeAddress::COORDINATOR);
    assert_eq!(frame.hdr.src, OUR_ID);
    assert_eq!(frame.hdr.message_type, MessageType::SET_CONTROL_COMMAND);
    assert_eq!(frame.hdr.send_method, SendMethod::NODE_TYPE);
    assert_eq!(frame.hdr.send_param_1, NodeType::GAS_FURNACE.0);
    assert!(!frame.hdr.packet_number.is_dataflow());
    assert_eq!(&frame.payload[..], &[0x64, 0x00, 0x50]);
    assert_eq!(
        h.node.in_flight().map(|m| m.message_type),
        Some(MessageType::SET_CONTROL_COMMAND)
    );

    // One message per grant
    h.rx(r2r(), &[]);
    assert_eq!(h.node.pending_len(), 0);
    let sent = h.flush_tx();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].hdr.send_method, SendMethod::CONTROL_COMMAND);
    assert_eq!(sent[0].hdr.send_param_1, ControlCommandRoute::COOL.0);
}

#[test]
fn grant_without_work_is_acknowledged() {
    let mut h = Harness::joined();
    h.rx(r2r(), &[]);
    let sent = h.flush_tx();
    assert_eq!(sent.len(), 1);
    let ack = &sent[0];
    assert_eq!(ack.hdr.message_type, MessageType::REQUEST_TO_RECEIVE_RESPONSE);
    assert_eq!(ack.hdr.dst, NodeAddress::COORDINATOR);
    assert_eq!(ack.hdr.packet_number.0, 0x80);
    assert_eq!(&ack.payload[..], &h.ack_payload()[..]);
    assert!(h.node.in_flight().is_none());
}

#[test]
fn grants_for_others_are_ignored() {
    let mut h = Harness::joined();
    h.rx(
        header(
            NodeAddress(0x07),
            NodeAddress::COORDINATOR,
            OUR_SUBNET,
            MessageType::REQUEST_TO_RECEIVE_RESPONSE,
            true,
        ),
        &[],
    );
    // Our id, but another subnet
    h.rx(
        header(
            OUR_ID,
            NodeAddress::COORDINATOR,
            Subnet::VERSION_1,
            MessageType::REQUEST_TO_RECEIVE_RESPONSE,
            true,
        ),
        &[],
    );
    assert!(h.node.queued_frame().is_none());
    assert!(h.flush_tx().is_empty());
}

#[test]
fn node_id_answer_waits_for_grant() {
    let mut h = Harness::joined();
    h.node
        .queue_message(PendingMessage::to_address(
            NodeAddress(0x02),
            MessageType::GET_STATUS,
            &[],
        ))
        .unwrap();

    h.rx(to_us(MessageType::GET_NODE_ID, false), &[]);
    let sent = h.flush_tx();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].hdr.message_type, MessageType::GET_NODE_ID);
    assert!(sent[0].hdr.packet_number.is_dataflow());
    assert_eq!(&sent[0].payload[..], &h.ack_payload()[..]);

    // The stored answer beats the pending queue
    h.rx(r2r(), &[]);
    let sent = h.flush_tx();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].hdr.message_type, MessageType::GET_NODE_ID_RESPONSE);
    assert!(!sent[0].hdr.packet_number.is_dataflow());
    let mut expected = vec![DEVICE.0];
    expected.extend_from_slice(&h.credentials());
    assert_eq!(&sent[0].payload[..], &expected[..]);
    assert_eq!(h.node.pending_len(), 1);

    h.rx(r2r(), &[]);
    let sent = h.flush_tx();
    assert_eq!(sent[0].hdr.message_type, MessageType::GET_STATUS);
    assert_eq!(sent[0].hdr.send_method, SendMethod::NODE_ID);
    assert_eq!(sent[0].hdr.send_param_1, 0x02);
    assert_eq!(h.node.pending_len(), 0);
}

#[test]
fn shared_data_write_then_read() {
    let mut h = Harness::joined();
    let sds = MessageType::NETWORK_SHARED_DATA_SECTOR_IMAGE_READ_WRITE_REQUEST;

    h.rx(to_us(sds, false), &[NodeType::GAS_FURNACE.0, 0xAA, 0xBB]);
    assert_eq!(h.node.shared_data(NodeType::GAS_FURNACE), Some(&[0xAA, 0xBB][..]));
    let sent = h.flush_tx();
    assert_eq!(sent[0].hdr.message_type, sds);
    assert!(sent[0].hdr.packet_number.is_dataflow());

    h.rx(r2r(), &[]);
    let sent = h.flush_tx();
    assert_eq!(sent[0].hdr.message_type, sds.response());
    assert_eq!(&sent[0].payload[..], &[0x02, 0xAA, 0xBB]);

    // Read only
    h.rx(to_us(sds, false), &[0x82]);
    h.flush_tx();
    h.rx(r2r(), &[]);
    let sent = h.flush_tx();
    assert_eq!(&sent[0].payload[..], &[0x02, 0xAA, 0xBB]);
    assert_eq!(h.node.shared_data(NodeType::GAS_FURNACE), Some(&[0xAA, 0xBB][..]));

    // Empty requests get nothing, and are not faults
    h.rx(to_us(sds, false), &[]);
    assert!(h.node.queued_frame().is_none());
    assert_eq!(h.node.stats().unhandled_directed, 0);
}

#[test]
fn polls_fill_idle_grants_and_rotate() {
    let mut h = Harness::joined();
    let seen: Rc<RefCell<Vec<PacketEvent>>> = Rc::default();
    let sink = seen.clone();
    h.node
        .register_packet_listener(MessageType::GET_STATUS_RESPONSE, move |ev| {
            sink.borrow_mut().push(ev.clone())
        });

    h.node
        .register_device_polling(NodeType::GAS_FURNACE, MessageType::GET_STATUS, false)
        .unwrap();
    // Response codes register as their request
    h.node
        .register_device_polling(NodeType::HEAT_PUMP, MessageType::GET_SENSOR_DATA_RESPONSE, true)
        .unwrap();

    h.rx(r2r(), &[]);
    let sent = h.flush_tx();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].hdr.message_type, MessageType::GET_STATUS);
    assert_eq!(sent[0].hdr.send_method, SendMethod::NODE_TYPE);
    assert_eq!(sent[0].hdr.send_param_1, NodeType::GAS_FURNACE.0);
    assert!(sent[0].payload.is_empty());

    // The coordinator acknowledges our request, nothing to answer
    let mut hdr = to_us(MessageType::GET_STATUS, true);
    hdr.send_param_1 = NodeType::GAS_FURNACE.0;
    h.rx(hdr, &[0x06]);
    assert!(h.node.queued_frame().is_none());
    assert!(h.node.in_flight().is_some());

    // The routed answer arrives
    let mut hdr = to_us(MessageType::GET_STATUS_RESPONSE, false);
    hdr.send_param_1 = NodeType::GAS_FURNACE.0;
    hdr.src_node_type = NodeType::GAS_FURNACE;
    h.rx(hdr, &[0x01, 0x02, 0x03]);
    assert!(h.node.in_flight().is_none());
    assert_eq!(
        h.node.poll_queue(),
        &[
            PollEntry {
                node_type: NodeType::HEAT_PUMP,
                poll_message: MessageType::GET_SENSOR_DATA,
                poll_once: true,
            },
            PollEntry {
                node_type: NodeType::GAS_FURNACE,
                poll_message: MessageType::GET_STATUS,
                poll_once: false,
            },
        ]
    );
    {
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].node_type, NodeType::GAS_FURNACE);
        assert_eq!(seen[0].payload, vec![0x01, 0x02, 0x03]);
        assert_eq!(seen[0].request(), MessageType::GET_STATUS);
    }
    let sent = h.flush_tx();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].hdr.message_type, MessageType::GET_STATUS_RESPONSE);
    assert!(sent[0].hdr.packet_number.is_dataflow());
    assert_eq!(&sent[0].payload[..], &h.ack_payload()[..]);

    // Next grant polls the heat pump, which never answers
    h.rx(r2r(), &[]);
    let sent = h.flush_tx();
    assert_eq!(sent[0].hdr.message_type, MessageType::GET_SENSOR_DATA);
    assert_eq!(sent[0].hdr.send_param_1, NodeType::HEAT_PUMP.0);
    assert!(h.node.in_flight().is_some());

    h.clock.advance(500);
    h.node.tick();
    assert!(h.node.in_flight().is_none());
    assert_eq!(h.node.poll_queue().len(), 1);
    assert_eq!(h.node.poll_queue()[0].node_type, NodeType::GAS_FURNACE);
}

#[test]
fn bad_poll_registrations() {
    let mut h = Harness::joined();
    assert!(h
        .node
        .register_device_polling(NodeType::ANY, MessageType::GET_STATUS, false)
        .is_err());
    assert!(h
        .node
        .register_device_polling(
            NodeType::GAS_FURNACE,
            MessageType::REQUEST_TO_RECEIVE_RESPONSE,
            false
        )
        .is_err());
    assert!(h
        .node
        .register_device_polling(NodeType::GAS_FURNACE, MessageType::SET_CONTROL_COMMAND, false)
        .is_err());
    assert!(h.node.poll_queue().is_empty());
}

#[test]
fn device_poll_to_end_reorders() {
    let mut h = Harness::joined();
    for dev in [NodeType::GAS_FURNACE, NodeType::AIR_HANDLER] {
        h.node
            .register_device_polling(dev, MessageType::GET_STATUS, false)
            .unwrap();
    }
    h.node
        .device_poll_to_end(NodeType::GAS_FURNACE, MessageType::GET_STATUS);

    h.rx(r2r(), &[]);
    let sent = h.flush_tx();
    assert_eq!(sent[0].hdr.send_param_1, NodeType::AIR_HANDLER.0);
}

#[test]
fn token_offer_won_once_per_cycle() {
    let mut h = Harness::joined();
    let offer = coordinator_broadcast(OUR_SUBNET, MessageType::TOKEN_OFFER);

    // Nothing to say, no bid
    h.rx(offer, &[NodeType::ANY.0]);
    assert!(h.node.queued_frame().is_none());

    h.node
        .queue_message(PendingMessage::to_type(
            NodeType::GAS_FURNACE,
            MessageType::GET_STATUS,
            &[],
        ))
        .unwrap();

    // Offered to someone else
    h.rx(offer, &[NodeType::GAS_FURNACE.0]);
    assert!(h.node.queued_frame().is_none());

    h.rx(offer, &[NodeType::ANY.0]);
    let sent = h.flush_tx();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].hdr.message_type, MessageType::TOKEN_OFFER_RESPONSE);
    assert_eq!(sent[0].hdr.dst, NodeAddress::COORDINATOR);
    let mut expected = vec![OUR_ID.0, OUR_SUBNET.0];
    expected.extend_from_slice(&h.credentials());
    assert_eq!(&sent[0].payload[..], &expected[..]);

    h.rx(offer, &[NodeType::ANY.0]);
    assert!(h.node.queued_frame().is_none());

    // A discovery broadcast opens a new cycle
    h.rx(
        coordinator_broadcast(Subnet::BROADCAST, MessageType::NODE_DISCOVERY),
        &[NodeType::GAS_FURNACE.0],
    );
    h.rx(offer, &[DEVICE.0]);
    assert_eq!(
        h.node.queued_frame().map(|f| f.hdr.message_type),
        Some(MessageType::TOKEN_OFFER_RESPONSE)
    );
}

#[test]
fn node_list_is_stored_and_echoed() {
    let mut h = Harness::joined();
    let list = [0xA5, 0x01, 0x02, 0x02, 0x05, DEVICE.0];
    h.rx(to_us(MessageType::SET_NETWORK_NODE_LIST, false), &list);

    assert_eq!(h.node.node_type_at(NodeAddress(0x02)), NodeType::GAS_FURNACE);
    assert_eq!(h.node.node_type_at(NodeAddress(0x04)), NodeType::HEAT_PUMP);
    assert_eq!(h.node.node_type_at(NodeAddress(0x64)), NodeType::ANY);
    assert_eq!(h.node.node_type_at(NodeAddress::COORDINATOR), NodeType::ANY);

    let sent = h.flush_tx();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].hdr.message_type, MessageType::SET_NETWORK_NODE_LIST_RESPONSE);
    assert_eq!(sent[0].hdr.dst, NodeAddress::COORDINATOR);
    assert_eq!(&sent[0].payload[..], &list[..]);
}

#[test]
fn unknown_directed_messages_are_counted() {
    let mut h = Harness::joined();
    h.rx(to_us(MessageType::GET_DIAGNOSTICS, false), &[]);
    assert_eq!(h.node.stats().unhandled_directed, 1);
    assert!(h.node.queued_frame().is_none());

    // Dataflow traffic we don't follow is fine
    h.rx(to_us(MessageType::GET_DIAGNOSTICS, true), &[]);
    assert_eq!(h.node.stats().unhandled_directed, 1);
}

#[test]
fn oversized_messages_are_refused() {
    let mut h = Harness::joined();
    let big = vec![0u8; 241];
    assert!(h
        .node
        .queue_message(PendingMessage::to_type(
            NodeType::GAS_FURNACE,
            MessageType::SET_DISPLAY_MESSAGE,
            &big
        ))
        .is_err());
    assert_eq!(h.node.pending_len(), 0);
}

#[test]
fn unanswered_poll_rotates_on_next_grant() {
    let mut h = Harness::joined();
    for dev in [NodeType::GAS_FURNACE, NodeType::HEAT_PUMP] {
        h.node
            .register_device_polling(dev, MessageType::GET_STATUS, false)
            .unwrap();
    }

    // Grants come faster than the request timeout, and nobody answers
    let mut polled = vec![];
    for _ in 0..4 {
        h.rx(r2r(), &[]);
        let sent = h.flush_tx();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].hdr.message_type, MessageType::GET_STATUS);
        polled.push(sent[0].hdr.send_param_1);
    }
    assert_eq!(
        polled,
        vec![
            NodeType::GAS_FURNACE.0,
            NodeType::HEAT_PUMP.0,
            NodeType::GAS_FURNACE.0,
            NodeType::HEAT_PUMP.0,
        ]
    );
    assert_eq!(h.node.poll_queue().len(), 2);
}

#[test]
fn newer_grant_replaces_in_flight_message() {
    let mut h = Harness::joined();
    for payload in [[0x64, 0x00, 0x10], [0x64, 0x00, 0x20]] {
        h.node
            .queue_message(PendingMessage::to_type(
                NodeType::GAS_FURNACE,
                MessageType::SET_CONTROL_COMMAND,
                &payload,
            ))
            .unwrap();
    }

    h.rx(r2r(), &[]);
    h.flush_tx();
    assert_eq!(h.node.in_flight().unwrap().payload, vec![0x64, 0x00, 0x10]);

    h.rx(r2r(), &[]);
    h.flush_tx();
    assert_eq!(h.node.in_flight().unwrap().payload, vec![0x64, 0x00, 0x20]);

    // The replacement gets a full timeout of its own
    h.clock.advance(499);
    h.node.tick();
    assert!(h.node.in_flight().is_some());
    h.clock.advance(1);
    h.node.tick();
    assert!(h.node.in_flight().is_none());

    // A grant answered from the stored reply leaves the in-flight alone
    h.node
        .queue_message(PendingMessage::to_type(
            NodeType::GAS_FURNACE,
            MessageType::GET_STATUS,
            &[],
        ))
        .unwrap();
    h.rx(r2r(), &[]);
    assert_eq!(h.flush_normal().len(), 1);
    h.rx(to_us(MessageType::GET_NODE_ID, false), &[]);
    assert_eq!(h.flush_normal().len(), 1);
    h.rx(r2r(), &[]);
    let sent = h.flush_normal();
    assert_eq!(sent[0].hdr.message_type, MessageType::GET_NODE_ID_RESPONSE);
    assert_eq!(
        h.node.in_flight().map(|m| m.message_type),
        Some(MessageType::GET_STATUS)
    );
}

#[test]
fn node_id_response_is_acknowledged() {
    let mut h = Harness::joined();
    let mut payload = vec![NodeType::GAS_FURNACE.0];
    payload.extend_from_slice(&[0x00, 1, 2, 3, 4, 5, 6, 7]);
    payload.extend_from_slice(&[0x5A; 8]);
    h.rx(to_us(MessageType::GET_NODE_ID_RESPONSE, false), &payload);

    let sent = h.flush_tx();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].hdr.message_type, MessageType::GET_NODE_ID_RESPONSE);
    assert_eq!(sent[0].hdr.dst, NodeAddress::COORDINATOR);
    assert!(sent[0].hdr.packet_number.is_dataflow());
    assert_eq!(&sent[0].payload[..], &h.ack_payload()[..]);
    assert_eq!(h.node.stats().unhandled_directed, 0);

    // Nothing stored for the next grant
    h.rx(r2r(), &[]);
    let sent = h.flush_tx();
    assert_eq!(sent[0].hdr.message_type, MessageType::REQUEST_TO_RECEIVE_RESPONSE);
}

#[test]
fn shared_data_response_needs_no_reply() {
    let mut h = Harness::joined();
    let rsp = MessageType::NETWORK_SHARED_DATA_SECTOR_IMAGE_READ_WRITE_REQUEST_RESPONSE;

    h.rx(to_us(rsp, false), &[0x06]);
    assert!(h.node.queued_frame().is_none());

    // A rejection is only logged
    h.rx(to_us(rsp, false), &[0x15]);
    assert!(h.node.queued_frame().is_none());

    assert!(h.flush_tx().is_empty());
    assert_eq!(h.node.stats().unhandled_directed, 0);
}
