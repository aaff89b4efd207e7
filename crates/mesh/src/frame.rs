//! Wire frame layout and the frame types that travel between layers.
//!
//! ```text
//! +----------+----------+-----+-----+---------+-----+
//! | preamble | dst|src  | len | STX | payload | ETX |
//! |  2 bytes | 1 byte   |  1  |  1  |   len   |  1  |
//! +----------+----------+-----+-----+---------+-----+
//! ```
//!
//! The address byte packs the destination in the high nibble and the source
//! in the low nibble.

use crate::error::{MeshError, MeshResult};
use serde::{Deserialize, Serialize};

/// Preamble marking an application data frame.
pub const DATA_PREAMBLE: [u8; 2] = [0xAA, 0x55];
/// Preamble marking a link-control frame.
pub const CONTROL_PREAMBLE: [u8; 2] = [0xAA, 0x5C];
/// Preamble, address byte and length byte.
pub const HEADER_SIZE: usize = 4;
/// Start-of-payload delimiter.
pub const STX: u8 = 0x02;
/// End-of-payload delimiter.
pub const ETX: u8 = 0x03;
/// Bytes added around the payload besides the header.
pub const DELIMITER_SIZE: usize = 2;
/// Largest payload the one-byte length field can describe.
pub const MAX_PAYLOAD_SIZE: usize = u8::MAX as usize;
/// Link-control address; also the address of every switch.
pub const CONTROL_ADDRESS: u8 = 0;
/// Broadcast address (highest 4-bit value).
pub const BROADCAST: u8 = 0x0F;

/// Node address on a link (4 bits used).
pub type NodeId = u8;

/// Total wire length for a payload of `payload_len` bytes.
pub const fn wire_len(payload_len: usize) -> usize {
    HEADER_SIZE + payload_len + DELIMITER_SIZE
}

/// Pack `(src, dst)` into the address byte.
pub fn pack_addresses(src: NodeId, dst: NodeId) -> u8 {
    ((dst & 0x0F) << 4) | (src & 0x0F)
}

/// Unpack the address byte into `(src, dst)`.
pub fn unpack_addresses(byte: u8) -> (NodeId, NodeId) {
    (byte & 0x0F, byte >> 4)
}

/// Whether `id` can be the target of a route.
pub fn is_routable(id: NodeId) -> bool {
    id != CONTROL_ADDRESS && id < BROADCAST
}

/// Frame class selected by the preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameKind {
    /// Application traffic
    Data,
    /// Topology discovery traffic
    Control,
}

impl FrameKind {
    /// Preamble bytes for this kind.
    pub fn preamble(self) -> [u8; 2] {
        match self {
            FrameKind::Data => DATA_PREAMBLE,
            FrameKind::Control => CONTROL_PREAMBLE,
        }
    }

    /// Kind for a preamble, if it is one of ours.
    pub fn from_preamble(bytes: [u8; 2]) -> Option<Self> {
        match bytes {
            DATA_PREAMBLE => Some(FrameKind::Data),
            CONTROL_PREAMBLE => Some(FrameKind::Control),
            _ => None,
        }
    }
}

/// Wire-exact frame bytes, owned until consumed or queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    buf: Box<[u8]>,
}

impl RawFrame {
    /// Wrap bytes already laid out on the wire format.
    pub fn from_bytes(bytes: impl Into<Box<[u8]>>) -> Self {
        Self { buf: bytes.into() }
    }

    /// The wire bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Wire length.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True for a zero-length buffer.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Frame kind from the preamble, if recognised.
    pub fn kind(&self) -> Option<FrameKind> {
        if self.buf.len() < 2 {
            return None;
        }
        FrameKind::from_preamble([self.buf[0], self.buf[1]])
    }

    /// `(src, dst)` from the address byte.
    pub fn addresses(&self) -> Option<(NodeId, NodeId)> {
        self.buf.get(2).map(|b| unpack_addresses(*b))
    }

    /// Consume into the owned byte buffer.
    pub fn into_bytes(self) -> Box<[u8]> {
        self.buf
    }
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Data or control
    pub kind: FrameKind,
    /// Sender address
    pub src: NodeId,
    /// Destination address
    pub dst: NodeId,
    /// Payload bytes
    pub payload: Vec<u8>,
}

impl Frame {
    /// Build a data frame.
    pub fn data(src: NodeId, dst: NodeId, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: FrameKind::Data,
            src,
            dst,
            payload: payload.into(),
        }
    }

    /// Build a control frame.
    pub fn control(src: NodeId, dst: NodeId, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: FrameKind::Control,
            src,
            dst,
            payload: payload.into(),
        }
    }

    /// Payload length.
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// Addressed to the link-control address.
    pub fn is_link_control(&self) -> bool {
        self.dst == CONTROL_ADDRESS
    }

    /// Addressed to every node.
    pub fn is_broadcast(&self) -> bool {
        self.dst == BROADCAST
    }

    /// Serialise onto the wire.
    pub fn encode(&self) -> MeshResult<RawFrame> {
        if self.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(MeshError::MalformedFrame(format!(
                "payload of {} bytes exceeds {}",
                self.payload.len(),
                MAX_PAYLOAD_SIZE
            )));
        }
        if self.src > BROADCAST || self.dst > BROADCAST {
            return Err(MeshError::MalformedFrame(format!(
                "address out of range: src {} dst {}",
                self.src, self.dst
            )));
        }

        let mut buf = Vec::with_capacity(wire_len(self.payload.len()));
        buf.extend_from_slice(&self.kind.preamble());
        buf.push(pack_addresses(self.src, self.dst));
        buf.push(self.payload.len() as u8);
        buf.push(STX);
        buf.extend_from_slice(&self.payload);
        buf.push(ETX);
        Ok(RawFrame::from_bytes(buf))
    }

    /// Structural decode of a raw frame.
    pub fn decode(raw: &RawFrame) -> MeshResult<Self> {
        let bytes = raw.as_bytes();
        if bytes.len() < wire_len(0) {
            return Err(MeshError::MalformedFrame(format!(
                "{} bytes is shorter than an empty frame",
                bytes.len()
            )));
        }

        let kind = raw.kind().ok_or_else(|| {
            MeshError::MalformedFrame(format!("unknown preamble {}", hex::encode(&bytes[..2])))
        })?;
        let (src, dst) = unpack_addresses(bytes[2]);
        let len = bytes[3] as usize;

        if bytes.len() != wire_len(len) {
            return Err(MeshError::MalformedFrame(format!(
                "declared payload {} does not match {} wire bytes",
                len,
                bytes.len()
            )));
        }
        if bytes[HEADER_SIZE] != STX || bytes[bytes.len() - 1] != ETX {
            return Err(MeshError::MalformedFrame("missing STX/ETX delimiter".to_string()));
        }

        Ok(Self {
            kind,
            src,
            dst,
            payload: bytes[HEADER_SIZE + 1..bytes.len() - 1].to_vec(),
        })
    }
}
