//! A single point-to-point serial link.
//!
//! Owns the byte channel, the receive framer, both frame queues and the
//! routing table for everything reachable through the link's far end.

use crate::channel::ByteChannel;
use crate::control::{ControlMessage, Role};
use crate::error::{MeshError, MeshResult};
use crate::frame::{Frame, NodeId, RawFrame};
use crate::framer::{StreamFramer, RECV_BUFFER_SIZE};
use crate::queue::{EgressQueue, IngressQueue};
use crate::routing::{RouteTable, RouteUpdate, RoutingEntry, DIRECT_HOPS};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Queue and table sizes for one link.
#[derive(Debug, Clone, Copy)]
pub struct LinkSettings {
    /// Egress slots
    pub send_queue_size: usize,
    /// Ingress slots
    pub recv_queue_size: usize,
    /// Live routes the table may hold
    pub max_routes: usize,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            send_queue_size: 6,
            recv_queue_size: 6,
            max_routes: 14,
        }
    }
}

impl LinkSettings {
    /// Reject sizes a link cannot be built with.
    pub fn validate(&self) -> MeshResult<()> {
        if self.send_queue_size == 0 || self.recv_queue_size == 0 {
            return Err(MeshError::Config(format!(
                "queue sizes must be non-zero (send {}, recv {})",
                self.send_queue_size, self.recv_queue_size
            )));
        }
        if self.max_routes == 0 {
            return Err(MeshError::Config("max_routes must be non-zero".into()));
        }
        Ok(())
    }
}

/// What applying a control message to a link did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlOutcome {
    /// PROBE on a link whose far end is already classified
    ProbeIgnored,
    /// PROBE classified the far end
    Classified(Role),
    /// JOIN recorded a route to the joiner
    Joined {
        /// Joining node
        id: NodeId,
        /// Hops announced in the JOIN
        hops: u8,
        /// Table outcome
        update: RouteUpdate,
    },
    /// Advertisement merged into the table
    RoutesMerged {
        /// Pairs that changed the table
        accepted: usize,
        /// Pairs the table refused
        rejected: usize,
    },
}

/// Serial link state
#[derive(Debug)]
pub struct Link<C> {
    index: usize,
    channel: C,
    local_role: Role,
    remote_role: Role,
    framer: StreamFramer,
    ingress: IngressQueue<Frame>,
    egress: EgressQueue<RawFrame>,
    routes: RouteTable,
    scratch: Box<[u8]>,
}

impl<C: ByteChannel> Link<C> {
    /// Bind a link to `channel` with a declared local role.
    ///
    /// # Panics
    ///
    /// Panics if a queue size is zero; see [`LinkSettings::validate`].
    pub fn new(index: usize, channel: C, local_role: Role, settings: LinkSettings) -> Self {
        Self {
            index,
            channel,
            local_role,
            remote_role: Role::Unknown,
            framer: StreamFramer::new(),
            ingress: IngressQueue::new(settings.recv_queue_size),
            egress: EgressQueue::new(settings.send_queue_size),
            routes: RouteTable::new(settings.max_routes),
            scratch: vec![0u8; RECV_BUFFER_SIZE].into_boxed_slice(),
        }
    }

    /// Position of this link on its node.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Role this node announces on the link.
    pub fn local_role(&self) -> Role {
        self.local_role
    }

    /// Role of the far end, as learned from its PROBE.
    pub fn remote_role(&self) -> Role {
        self.remote_role
    }

    /// Routing table of this link.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Mutable routing table of this link.
    pub fn routes_mut(&mut self) -> &mut RouteTable {
        &mut self.routes
    }

    /// The bound channel.
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Read whatever the channel has, bounded by the framer's headroom, and
    /// realign the buffer. Returns the number of bytes read.
    pub fn receive(&mut self) -> MeshResult<usize> {
        let want = self
            .channel
            .bytes_available()
            .min(self.framer.headroom())
            .min(self.scratch.len());
        if want == 0 {
            return Ok(0);
        }

        let read = self.channel.read_up_to(&mut self.scratch[..want])?;
        self.framer.append(&self.scratch[..read])?;
        self.framer.resynchronize();
        Ok(read)
    }

    /// Next complete raw frame in the receive buffer.
    pub fn next_frame(&mut self) -> Option<RawFrame> {
        self.framer.resynchronize();
        self.framer.extract()
    }

    /// Queue raw bytes for transmission.
    pub fn enqueue_raw(&mut self, raw: RawFrame) -> MeshResult<usize> {
        self.egress.enqueue(raw)
    }

    /// Encode and queue a frame for transmission.
    pub fn send_frame(&mut self, frame: &Frame) -> MeshResult<usize> {
        let raw = frame.encode()?;
        self.enqueue_raw(raw)
    }

    /// Encode and queue a control message.
    pub fn send_control(
        &mut self,
        src: NodeId,
        dst: NodeId,
        message: &ControlMessage,
    ) -> MeshResult<usize> {
        debug!(link = self.index, src, dst, kind = message.name(), "queueing control message");
        let payload = message.encode()?;
        self.send_frame(&Frame::control(src, dst, payload))
    }

    /// Announce the local role on this link.
    pub fn send_probe(&mut self, src: NodeId, dst: NodeId) -> MeshResult<usize> {
        let probe = ControlMessage::Probe {
            role: self.local_role,
        };
        self.send_control(src, dst, &probe)
    }

    /// Write the next queued frame to the channel.
    ///
    /// The frame's buffer is released whether or not the write succeeds.
    /// Returns the transmitted length, or `None` when nothing was queued.
    pub fn transmit_next(&mut self) -> MeshResult<Option<usize>> {
        let Some(raw) = self.egress.take_next() else {
            return Ok(None);
        };
        self.channel.write(raw.as_bytes())?;
        debug!(link = self.index, size = raw.len(), "frame transmitted");
        Ok(Some(raw.len()))
    }

    /// Store a decoded frame for the application.
    pub fn store(&mut self, frame: Frame) -> MeshResult<usize> {
        self.ingress.enqueue(frame)
    }

    /// Oldest received frame.
    pub fn pop(&mut self) -> Option<Frame> {
        self.ingress.pop()
    }

    /// Frames waiting for transmission.
    pub fn egress_len(&self) -> usize {
        self.egress.len()
    }

    /// Frames waiting for the application.
    pub fn ingress_len(&self) -> usize {
        self.ingress.len()
    }

    /// Apply the link-level effect of a control message from `src`.
    pub fn apply_control(&mut self, src: NodeId, message: &ControlMessage) -> ControlOutcome {
        match message {
            ControlMessage::Probe { role } => {
                if self.remote_role.is_classified() {
                    debug!(link = self.index, src, "ignoring PROBE from classified link");
                    return ControlOutcome::ProbeIgnored;
                }
                self.remote_role = *role;
                info!(link = self.index, src, role = ?role, "link far end classified");
                if *role == Role::Endpoint {
                    self.routes.update(src, DIRECT_HOPS);
                }
                ControlOutcome::Classified(*role)
            }
            ControlMessage::Join { hops } => {
                let update = self.routes.update(src, *hops);
                info!(link = self.index, id = src, hops, "node joined");
                ControlOutcome::Joined {
                    id: src,
                    hops: *hops,
                    update,
                }
            }
            ControlMessage::RouteAdvertisement { routes } => {
                let accepted = routes
                    .iter()
                    .filter(|(id, hops)| self.routes.update(*id, *hops).is_accepted())
                    .count();
                debug!(link = self.index, entries = routes.len(), accepted, "advertisement merged");
                ControlOutcome::RoutesMerged {
                    accepted,
                    rejected: routes.len() - accepted,
                }
            }
        }
    }

    /// Diagnostic snapshot.
    pub fn status(&self) -> LinkStatus {
        LinkStatus {
            index: self.index,
            local_role: self.local_role,
            remote_role: self.remote_role,
            ingress_pending: self.ingress.len(),
            egress_pending: self.egress.len(),
            buffered_bytes: self.framer.pending(),
            flushed_bytes: self.framer.flushed_bytes(),
            routes: self.routes.snapshot(),
        }
    }
}

/// Link operational status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkStatus {
    /// Position on the node
    pub index: usize,
    /// Announced local role
    pub local_role: Role,
    /// Learned far-end role
    pub remote_role: Role,
    /// Frames waiting for the application
    pub ingress_pending: usize,
    /// Frames waiting for transmission
    pub egress_pending: usize,
    /// Bytes in the receive buffer
    pub buffered_bytes: usize,
    /// Bytes discarded as noise
    pub flushed_bytes: u64,
    /// Live routes
    pub routes: Vec<RoutingEntry>,
}
