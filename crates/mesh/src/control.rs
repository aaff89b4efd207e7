//! Topology discovery messages carried in control frame payloads.
//!
//! Every message starts with a 5-byte ASCII tag followed by a single field
//! byte. Route advertisements append `count` `(id, hops)` pairs.

use crate::error::{MeshError, MeshResult};
use crate::frame::NodeId;
use serde::{Deserialize, Serialize};

/// Length of the ASCII tag.
pub const TAG_SIZE: usize = 5;
/// Tag of a PROBE message.
pub const PROBE_TAG: &[u8; TAG_SIZE] = b"PROBE";
/// Tag of a JOIN message.
pub const JOIN_TAG: &[u8; TAG_SIZE] = b"NJOIN";
/// Tag of a ROUTE-ADVERTISEMENT message.
pub const ROUTES_TAG: &[u8; TAG_SIZE] = b"RTBLE";
/// Bytes per advertised route.
pub const ROUTE_PAIR_SIZE: usize = 2;
/// Initial hop count an endpoint announces in its JOIN.
pub const JOIN_INITIAL_HOPS: u8 = 1;

/// Classification of a link's far end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Switch / gateway node
    Gateway,
    /// Leaf node with a single link
    Endpoint,
    /// Not yet learned
    #[default]
    Unknown,
}

impl Role {
    /// Wire byte for this role.
    pub fn to_byte(self) -> u8 {
        match self {
            Role::Gateway => b's',
            Role::Endpoint => b'n',
            Role::Unknown => 0,
        }
    }

    /// Role for a wire byte; anything unrecognised is `Unknown`.
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b's' => Role::Gateway,
            b'n' => Role::Endpoint,
            _ => Role::Unknown,
        }
    }

    /// Whether the role has been learned.
    pub fn is_classified(self) -> bool {
        self != Role::Unknown
    }
}

/// A decoded control message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// Announces the sender's role when a link activates
    Probe {
        /// Sender's role
        role: Role,
    },
    /// Endpoint joining the mesh
    Join {
        /// Hops between the joiner and the receiver
        hops: u8,
    },
    /// Known routes of the sender, hop counts already inflated by one
    RouteAdvertisement {
        /// `(id, hops)` pairs
        routes: Vec<(NodeId, u8)>,
    },
}

impl ControlMessage {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ControlMessage::Probe { .. } => "PROBE",
            ControlMessage::Join { .. } => "JOIN",
            ControlMessage::RouteAdvertisement { .. } => "ROUTE-ADVERTISEMENT",
        }
    }

    /// Build an advertisement from a route listing, adding the hop for the
    /// link the advertisement is about to cross.
    pub fn advertise<I>(routes: I) -> Self
    where
        I: IntoIterator<Item = (NodeId, u8)>,
    {
        ControlMessage::RouteAdvertisement {
            routes: routes
                .into_iter()
                .map(|(id, hops)| (id, hops.saturating_add(1)))
                .collect(),
        }
    }

    /// Drop any advertised route to `id`.
    pub fn without_route_to(mut self, id: NodeId) -> Self {
        if let ControlMessage::RouteAdvertisement { routes } = &mut self {
            routes.retain(|(target, _)| *target != id);
        }
        self
    }

    /// Serialise into a control frame payload.
    pub fn encode(&self) -> MeshResult<Vec<u8>> {
        let mut out = Vec::with_capacity(TAG_SIZE + 1);
        match self {
            ControlMessage::Probe { role } => {
                out.extend_from_slice(PROBE_TAG);
                out.push(role.to_byte());
            }
            ControlMessage::Join { hops } => {
                out.extend_from_slice(JOIN_TAG);
                out.push(*hops);
            }
            ControlMessage::RouteAdvertisement { routes } => {
                let count = u8::try_from(routes.len()).map_err(|_| {
                    MeshError::MalformedControlFrame(format!(
                        "{} routes do not fit a one-byte count",
                        routes.len()
                    ))
                })?;
                out.reserve(routes.len() * ROUTE_PAIR_SIZE);
                out.extend_from_slice(ROUTES_TAG);
                out.push(count);
                for (id, hops) in routes {
                    out.push(*id);
                    out.push(*hops);
                }
            }
        }
        Ok(out)
    }

    /// Parse a control frame payload.
    pub fn decode(payload: &[u8]) -> MeshResult<Self> {
        if payload.len() < TAG_SIZE + 1 {
            return Err(MeshError::MalformedControlFrame(format!(
                "payload of {} bytes is too short",
                payload.len()
            )));
        }
        let (tag, body) = payload.split_at(TAG_SIZE);
        let field = body[0];

        match tag {
            t if t == PROBE_TAG => Ok(ControlMessage::Probe {
                role: Role::from_byte(field),
            }),
            t if t == JOIN_TAG => Ok(ControlMessage::Join { hops: field }),
            t if t == ROUTES_TAG => {
                let pairs = &body[1..];
                let count = field as usize;
                if pairs.len() < count * ROUTE_PAIR_SIZE {
                    return Err(MeshError::MalformedControlFrame(format!(
                        "advertisement declares {} routes but carries {} bytes",
                        count,
                        pairs.len()
                    )));
                }
                let routes = pairs
                    .chunks_exact(ROUTE_PAIR_SIZE)
                    .take(count)
                    .map(|pair| (pair[0], pair[1]))
                    .collect();
                Ok(ControlMessage::RouteAdvertisement { routes })
            }
            other => Err(MeshError::MalformedControlFrame(format!(
                "unknown tag {}",
                hex::encode(other)
            ))),
        }
    }
}
