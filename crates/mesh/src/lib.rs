//! Serialmesh - Multi-hop Frame Switching over Serial Links
//!
//! Implements addressed framing, store-and-forward queues and distance-vector
//! style topology discovery for small meshes of nodes joined by
//! point-to-point byte channels.
//!
//! # Core Components
//!
//! - **Stream Framer**: Recovers frame boundaries from a noisy byte stream
//! - **Frame Queues**: Fixed-capacity ingress (FIFO) and egress (round-robin) slots
//! - **Routing Table**: Per-link hop counts with silence-based liveness
//! - **Control Protocol**: PROBE / JOIN / ROUTE-ADVERTISEMENT messages
//! - **Switch**: Local control, flooding and directed unicast across links
//! - **Endpoint**: Single-link leaf node that joins the mesh
//!
//! # Addressing
//!
//! Addresses are 4 bits wide. `0` is the link-control address (and the
//! address every switch uses as source), `15` is broadcast, `1..=14` are
//! endpoints.
//!
//! # Example Usage
//!
//! ```rust
//! use serialmesh_mesh::{Endpoint, LinkSettings, MemoryChannel, Switch, SwitchSettings};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (switch_end, endpoint_end) = MemoryChannel::pair();
//! let mut switch = Switch::new(vec![switch_end], SwitchSettings::default());
//! let mut endpoint = Endpoint::new(3, endpoint_end, LinkSettings::default())?;
//!
//! switch.activate()?;
//! endpoint.activate()?;
//! for _ in 0..4 {
//!     endpoint.transmit_next()?;
//!     switch.run_once();
//!     endpoint.poll()?;
//! }
//!
//! assert_eq!(switch.route_for(3), Some(0));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod channel;
pub mod control;
pub mod driver;
pub mod endpoint;
pub mod error;
pub mod frame;
pub mod framer;
pub mod link;
pub mod queue;
pub mod routing;
pub mod switch;

// Re-export main types
pub use channel::{ByteChannel, MemoryChannel};
pub use control::{ControlMessage, Role};
pub use driver::{run_endpoint, run_switch};
pub use endpoint::{Delivery, Endpoint};
pub use error::{MeshError, MeshResult};
pub use frame::{Frame, FrameKind, NodeId, RawFrame, BROADCAST, CONTROL_ADDRESS};
pub use framer::StreamFramer;
pub use link::{ControlOutcome, Link, LinkSettings, LinkStatus};
pub use queue::{EgressQueue, IngressQueue};
pub use routing::{Liveness, RouteTable, RouteUpdate, RoutingEntry};
pub use switch::{Disposition, RoundStats, Switch, SwitchSettings, SwitchStatus};
