//! CT-485 frame layout
//!
//! ```text
//! [dst src subnet send_method send_param1 send_param2 src_node_type
//!  message_type packet_number payload_len] [payload..] [checksum_hi checksum_lo]
//! ```
//!
//! Only the checksum is a multi-byte field, and it is big-endian.

use core::fmt;

use frame_acc::FrameLayout;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    address::{NodeAddress, Subnet},
    well_known::{MAX_PAYLOAD_SIZE, MessageType, NodeType, SendMethod},
};

pub const HEADER_SIZE: usize = 10;
pub const CHECKSUM_SIZE: usize = 2;
pub const PAYLOAD_LEN_POS: usize = 9;
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE + CHECKSUM_SIZE;

/// Accumulator layout for bytes coming off the bus
pub const LAYOUT: FrameLayout = FrameLayout::new(HEADER_SIZE, PAYLOAD_LEN_POS, CHECKSUM_SIZE);

pub type Payload = heapless::Vec<u8, MAX_PAYLOAD_SIZE>;
pub type RawFrame = heapless::Vec<u8, MAX_FRAME_SIZE>;

/// Sequence/flags byte of the header
#[cfg_attr(feature = "defmt-v1", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct PacketNumber(pub u8);

impl PacketNumber {
    const DATAFLOW: u8 = 0x80;
    const VERSION_1: u8 = 0x20;

    #[inline]
    pub const fn new(dataflow: bool, version_1: bool) -> Self {
        let mut val = 0;
        if dataflow {
            val |= Self::DATAFLOW;
        }
        if version_1 {
            val |= Self::VERSION_1;
        }
        Self(val)
    }

    #[inline]
    pub const fn is_dataflow(self) -> bool {
        self.0 & Self::DATAFLOW != 0
    }

    #[inline]
    pub const fn is_version_1(self) -> bool {
        self.0 & Self::VERSION_1 != 0
    }
}

#[cfg_attr(feature = "defmt-v1", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub dst: NodeAddress,
    pub src: NodeAddress,
    pub subnet: Subnet,
    pub send_method: SendMethod,
    pub send_param_1: u8,
    /// Generally 0 when sending, the coordinator fills it in when routing
    pub send_param_2: u8,
    pub src_node_type: NodeType,
    pub message_type: MessageType,
    pub packet_number: PacketNumber,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub hdr: Header,
    pub payload: Payload,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DecodeError {
    /// Fewer bytes than the header's payload length calls for
    Incomplete,
    ChecksumMismatch { expected: u16, got: u16 },
    PayloadTooLarge(usize),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum EncodeError {
    PayloadTooLarge(usize),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Incomplete => f.write_str("incomplete frame"),
            DecodeError::ChecksumMismatch { expected, got } => {
                write!(f, "checksum mismatch, expected 0x{expected:04X}, got 0x{got:04X}")
            }
            DecodeError::PayloadTooLarge(len) => write!(f, "payload of {len} bytes is too large"),
        }
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::PayloadTooLarge(len) => write!(f, "payload of {len} bytes is too large"),
        }
    }
}

impl std::error::Error for DecodeError {}
impl std::error::Error for EncodeError {}

/// Fletcher-style checksum over header and payload, seeded with 0xAA
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum1: u16 = 0xAA;
    let mut sum2: u16 = 0;
    for &b in data {
        sum1 = (sum1 + b as u16) % 0xFF;
        sum2 = (sum2 + sum1) % 0xFF;
    }
    let tmp = 0xFF - ((sum1 + sum2) % 0xFF);
    (tmp << 8) | (0xFF - ((sum1 + tmp) % 0xFF))
}

// ---- impl Frame ----

impl Frame {
    pub fn new(hdr: Header, payload: &[u8]) -> Result<Self, EncodeError> {
        let payload =
            Payload::from_slice(payload).map_err(|_| EncodeError::PayloadTooLarge(payload.len()))?;
        Ok(Self { hdr, payload })
    }

    /// Serialize, computing a fresh checksum
    pub fn encode(&self) -> RawFrame {
        let mut out = RawFrame::new();
        let hdr = &self.hdr;
        let head = [
            hdr.dst.0,
            hdr.src.0,
            hdr.subnet.0,
            hdr.send_method.0,
            hdr.send_param_1,
            hdr.send_param_2,
            hdr.src_node_type.0,
            hdr.message_type.0,
            hdr.packet_number.0,
            self.payload.len() as u8,
        ];
        // Capacity is exactly header + max payload + checksum, these can't fail
        let _ = out.extend_from_slice(&head);
        let _ = out.extend_from_slice(&self.payload);
        let crc = checksum(&out);
        let _ = out.extend_from_slice(&crc.to_be_bytes());
        out
    }

    /// Validate and parse one whole frame. Bytes past the declared length are
    /// ignored.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let Some(&declared) = data.get(PAYLOAD_LEN_POS) else {
            return Err(DecodeError::Incomplete);
        };
        let payload_len = declared as usize;
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(DecodeError::PayloadTooLarge(payload_len));
        }
        let body_len = HEADER_SIZE + payload_len;
        let Some(crc_bytes) = data.get(body_len..body_len + CHECKSUM_SIZE) else {
            return Err(DecodeError::Incomplete);
        };
        let got = u16::from_be_bytes([crc_bytes[0], crc_bytes[1]]);
        let expected = checksum(&data[..body_len]);
        if expected != got {
            return Err(DecodeError::ChecksumMismatch { expected, got });
        }

        let hdr = Header {
            dst: NodeAddress(data[0]),
            src: NodeAddress(data[1]),
            subnet: Subnet(data[2]),
            send_method: SendMethod(data[3]),
            send_param_1: data[4],
            send_param_2: data[5],
            src_node_type: NodeType(data[6]),
            message_type: MessageType(data[7]),
            packet_number: PacketNumber(data[8]),
        };
        let payload = Payload::from_slice(&data[HEADER_SIZE..body_len])
            .map_err(|_| DecodeError::PayloadTooLarge(payload_len))?;
        Ok(Self { hdr, payload })
    }
}

/// Appends to a payload under construction. Our own replies are all well
/// under the payload limit, so an overflow is logged and the bytes dropped.
pub(crate) trait PayloadExt {
    fn put(&mut self, bytes: &[u8]) -> &mut Self;
}

impl PayloadExt for Payload {
    fn put(&mut self, bytes: &[u8]) -> &mut Self {
        if self.extend_from_slice(bytes).is_err() {
            warn!("Dropping {} bytes past the payload limit", bytes.len());
        }
        self
    }
}

/// `AA.BB.CC` hex rendering of a byte slice for log lines
pub struct HexSlice<'a>(pub &'a [u8]);

impl fmt::Display for HexSlice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i != 0 {
                f.write_str(".")?;
            }
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

/// Column headings matching the [`FrameRow`] rendering
pub const FRAME_ROW_TITLE: &str =
    "Dir | Dest | Src  | Subnet | Meth | Params | SrcNode | MsgType | PktNum | Len | Payload HEX";

/// One row of the frame dump table
pub struct FrameRow<'a> {
    pub dir: &'static str,
    pub frame: &'a Frame,
}

impl fmt::Display for FrameRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hdr = &self.frame.hdr;
        write!(
            f,
            "{}  | 0x{:02X} | 0x{:02X} | 0x{:02X}   | 0x{:02X} | 0x{:02X}{:02X} | 0x{:02X}    | 0x{:02X}    | 0x{:02X}   | {:<3} | {}",
            self.dir,
            hdr.dst.0,
            hdr.src.0,
            hdr.subnet.0,
            hdr.send_method.0,
            hdr.send_param_1,
            hdr.send_param_2,
            hdr.src_node_type.0,
            hdr.message_type.0,
            hdr.packet_number.0,
            self.frame.payload.len(),
            HexSlice(&self.frame.payload),
        )
    }
}
