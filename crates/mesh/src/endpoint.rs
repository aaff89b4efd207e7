//! Endpoint node: a leaf with a single link to the mesh.

use crate::channel::ByteChannel;
use crate::control::{ControlMessage, Role, JOIN_INITIAL_HOPS};
use crate::error::{MeshError, MeshResult};
use crate::frame::{is_routable, Frame, FrameKind, NodeId, CONTROL_ADDRESS};
use crate::link::{ControlOutcome, Link, LinkSettings, LinkStatus};
use crate::routing::RouteTable;
use serialmesh_core::config::EndpointConfig;
use tracing::{debug, info, warn};

/// What the endpoint did with a received frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Control traffic applied to the link
    Control(ControlOutcome),
    /// Data frame stored for the application
    Stored,
    /// Data frame for another node
    Ignored,
}

/// Endpoint node
#[derive(Debug)]
pub struct Endpoint<C> {
    id: NodeId,
    link: Link<C>,
}

impl<C: ByteChannel> Endpoint<C> {
    /// Bind an endpoint with address `id` to `channel`.
    pub fn new(id: NodeId, channel: C, settings: LinkSettings) -> MeshResult<Self> {
        if !is_routable(id) {
            return Err(MeshError::Config(format!(
                "endpoint address {} is reserved",
                id
            )));
        }
        settings.validate()?;
        Ok(Self {
            id,
            link: Link::new(0, channel, Role::Endpoint, settings),
        })
    }

    /// Bind an endpoint from configuration.
    pub fn from_config(channel: C, config: &EndpointConfig) -> MeshResult<Self> {
        let settings = LinkSettings {
            send_queue_size: config.send_queue_size,
            recv_queue_size: config.recv_queue_size,
            max_routes: config.max_routes,
        };
        Self::new(config.node_id, channel, settings)
    }

    /// This endpoint's address.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The endpoint's only link.
    pub fn link(&self) -> &Link<C> {
        &self.link
    }

    /// Routes learned from the mesh.
    pub fn routes(&self) -> &RouteTable {
        self.link.routes()
    }

    /// Announce the endpoint role, then join the mesh.
    pub fn activate(&mut self) -> MeshResult<()> {
        self.link.send_probe(self.id, CONTROL_ADDRESS)?;
        self.link.send_control(
            self.id,
            CONTROL_ADDRESS,
            &ControlMessage::Join {
                hops: JOIN_INITIAL_HOPS,
            },
        )?;
        info!(id = self.id, "endpoint joining mesh");
        Ok(())
    }

    /// Read the link and handle every complete frame.
    pub fn poll(&mut self) -> MeshResult<usize> {
        self.link.receive()?;

        let mut frames = 0;
        while let Some(raw) = self.link.next_frame() {
            frames += 1;
            let handled = Frame::decode(&raw).and_then(|frame| self.handle(frame));
            match handled {
                Ok(delivery) => debug!(id = self.id, ?delivery, "frame handled"),
                Err(e) => warn!(id = self.id, error = %e, "frame dropped"),
            }
        }
        Ok(frames)
    }

    /// Apply a decoded frame.
    pub fn handle(&mut self, frame: Frame) -> MeshResult<Delivery> {
        if frame.kind == FrameKind::Control || frame.is_link_control() {
            let message = ControlMessage::decode(&frame.payload)?.without_route_to(self.id);
            let outcome = self.link.apply_control(frame.src, &message);

            match message {
                ControlMessage::Probe { .. } if frame.dst == self.id => {
                    self.link.send_probe(self.id, CONTROL_ADDRESS)?;
                }
                // Propagated JOINs are only recorded
                ControlMessage::Join { .. } if frame.is_link_control() => {
                    let routes = self.link.routes().entries().map(|e| (e.id, e.hops));
                    let reply = ControlMessage::advertise(routes);
                    self.link.send_control(self.id, frame.src, &reply)?;
                }
                _ => {}
            }
            return Ok(Delivery::Control(outcome));
        }

        if frame.dst == self.id || frame.is_broadcast() {
            self.link.store(frame)?;
            Ok(Delivery::Stored)
        } else {
            Ok(Delivery::Ignored)
        }
    }

    /// Queue a data frame for `dst`.
    pub fn send(&mut self, dst: NodeId, payload: impl Into<Vec<u8>>) -> MeshResult<usize> {
        self.link.send_frame(&Frame::data(self.id, dst, payload))
    }

    /// Write the next queued frame.
    pub fn transmit_next(&mut self) -> MeshResult<Option<usize>> {
        self.link.transmit_next()
    }

    /// Oldest frame delivered to this endpoint.
    pub fn pop(&mut self) -> Option<Frame> {
        self.link.pop()
    }

    /// Diagnostic snapshot.
    pub fn status(&self) -> LinkStatus {
        self.link.status()
    }
}
