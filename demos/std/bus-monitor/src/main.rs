use comfortnet::{
    CommandType, MessageType, Node, NodeConfig, NodeType, dispatch::DATA_KEY_NETWORK_STATUS,
    mdi::read_mdi, transport::serial::SerialTransport, wire_frames::HexSlice,
};
use log::{info, warn};
use tokio::time::interval;

use std::{io, time::Duration};

const TICK: Duration = Duration::from_millis(5);
const STATS_EVERY_TICKS: u32 = 2_000;

#[tokio::main(flavor = "current_thread")]
async fn main() -> io::Result<()> {
    env_logger::init();

    let port = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/ttyUSB0".to_string());
    let baud = 9600;

    let transport = SerialTransport::open(&port, baud)
        .map_err(io::Error::other)?
        .with_rts_drive_enable();
    let mut node = Node::new_std(transport, NodeConfig::default())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    node.dump_config();

    node.register_listener(DATA_KEY_NETWORK_STATUS, |ev| {
        info!("Network status: {:?}", ev.value);
    });
    for cmd in [
        CommandType::HEAT_DEMAND,
        CommandType::COOL_DEMAND,
        CommandType::FAN_DEMAND,
        CommandType::BACK_UP_HEAT_DEMAND,
        CommandType::DEFROST_HEAT_DEMAND,
        CommandType::AUX_HEAT_DEMAND,
    ] {
        node.register_command_listener(cmd, move |ev| {
            info!(
                "{} {cmd} -> {} [{}]",
                if ev.response { "RSP" } else { "CMD" },
                ev.node_type,
                HexSlice(&ev.payload),
            );
        });
    }
    node.register_packet_listener(MessageType::GET_STATUS_RESPONSE, |ev| {
        info!("Status of {}: [{}]", ev.node_type, HexSlice(&ev.payload));
    });
    node.register_packet_listener(MessageType::GET_IDENTIFICATION_RESPONSE, |ev| {
        for dg in read_mdi(&ev.payload) {
            info!("Identification of {}: tag {:02X} [{}]", ev.node_type, dg.tag, HexSlice(dg.data));
        }
    });

    for dev in [NodeType::GAS_FURNACE, NodeType::AIR_HANDLER, NodeType::HEAT_PUMP] {
        if let Err(e) = node.register_device_polling(dev, MessageType::GET_STATUS, false) {
            warn!("Not polling {dev}: {e}");
        }
        if let Err(e) = node.register_device_polling(dev, MessageType::GET_IDENTIFICATION, true) {
            warn!("Not polling {dev}: {e}");
        }
    }

    let mut ival = interval(TICK);
    let mut ctr = 0u32;
    loop {
        ival.tick().await;
        node.tick();

        ctr = ctr.wrapping_add(1);
        if ctr % STATS_EVERY_TICKS == 0 {
            info!("{:?} as {}: {:?}", node.state(), node.node_id(), node.stats());
        }
    }
}
