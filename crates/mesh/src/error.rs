//! Error types for serialmesh link-layer operations.
//!
//! None of these halt a node: each one describes a single frame, buffer or
//! routing update that was dropped or rejected.

use thiserror::Error;

/// Errors that can occur in mesh operations.
#[derive(Debug, Error)]
pub enum MeshError {
    /// Ingress or egress queue at capacity; the item was dropped
    #[error("{queue} queue full ({capacity} slots), frame dropped")]
    QueueFull {
        /// Which queue rejected the item
        queue: &'static str,
        /// Slot count of that queue
        capacity: usize,
    },

    /// Routing table has no room for another live entry
    #[error("Routing table full ({capacity} live entries), route to {id} rejected")]
    RouteTableFull { id: u8, capacity: usize },

    /// Route update for the link-control or broadcast address
    #[error("Invalid route target {id} (hops {hops})")]
    InvalidRouteTarget { id: u8, hops: u8 },

    /// Unicast frame with no reachable egress link
    #[error("No route found to destination: {destination}")]
    NoRoute { destination: u8 },

    /// Control payload matched none of the known message kinds
    #[error("Malformed control frame: {0}")]
    MalformedControlFrame(String),

    /// Raw frame failed structural decoding
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Append would exceed the receive buffer
    #[error("Receive buffer overflow: {pending} bytes pending, {headroom} bytes of headroom")]
    BufferOverflow { pending: usize, headroom: usize },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Byte channel I/O errors
    #[error("Channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for mesh operations.
pub type MeshResult<T> = Result<T, MeshError>;
