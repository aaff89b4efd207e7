//! Switch forwarding engine.
//!
//! A switch owns every [`Link`] it drives and decides, for each frame that
//! arrives, whether to consume it as control traffic, flood it, or forward
//! it to the link whose routing table reaches the destination.
//!
//! All table mutation, including the liveness phase, happens through
//! `&mut Switch`, so a single owner (the cooperative loop or the async
//! driver task) serialises every update.

use crate::channel::ByteChannel;
use crate::control::{ControlMessage, Role};
use crate::error::{MeshError, MeshResult};
use crate::frame::{
    is_routable, Frame, FrameKind, NodeId, RawFrame, BROADCAST, CONTROL_ADDRESS,
};
use crate::link::{ControlOutcome, Link, LinkSettings, LinkStatus};
use crate::routing::{Liveness, RTABLE_LENGTH};
use serde::{Deserialize, Serialize};
use serialmesh_core::config::SwitchConfig;
use tracing::{debug, info, warn};

/// Address a switch uses as frame source.
pub const SWITCH_ADDRESS: NodeId = CONTROL_ADDRESS;

/// Tunables for a switch.
#[derive(Debug, Clone, Copy)]
pub struct SwitchSettings {
    /// Per-link queue and table sizes
    pub link: LinkSettings,
    /// Missed ticks before probing
    pub probe_after_ticks: u16,
    /// Missed ticks before a route is removed
    pub dead_after_ticks: u16,
}

impl Default for SwitchSettings {
    fn default() -> Self {
        Self::from(&SwitchConfig::default())
    }
}

impl From<&SwitchConfig> for SwitchSettings {
    fn from(config: &SwitchConfig) -> Self {
        Self {
            link: LinkSettings {
                send_queue_size: config.send_queue_size,
                recv_queue_size: config.recv_queue_size,
                max_routes: config.max_routes,
            },
            probe_after_ticks: config.probe_after_ticks,
            dead_after_ticks: config.dead_after_ticks,
        }
    }
}

/// What the switch did with a received frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Consumed as control traffic
    Control {
        /// Message kind
        message: &'static str,
        /// Link-level effect
        outcome: ControlOutcome,
        /// Links a propagated JOIN was flooded to
        flooded: usize,
    },
    /// Broadcast flooded to this many links
    Flooded {
        /// Links the frame was queued on
        links: usize,
    },
    /// Unicast queued on one link
    Forwarded {
        /// Egress link index
        link: usize,
    },
}

/// Counters for one cooperative round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundStats {
    /// Frames drained from receive buffers
    pub frames_received: usize,
    /// Frames written to channels
    pub frames_sent: usize,
}

/// Switch node
#[derive(Debug)]
pub struct Switch<C> {
    links: Vec<Link<C>>,
    settings: SwitchSettings,
}

impl<C: ByteChannel> Switch<C> {
    /// Create a switch with one gateway link per channel.
    ///
    /// # Panics
    ///
    /// Panics if a queue size in `settings.link` is zero.
    pub fn new(channels: Vec<C>, settings: SwitchSettings) -> Self {
        let links = channels
            .into_iter()
            .enumerate()
            .map(|(index, channel)| Link::new(index, channel, Role::Gateway, settings.link))
            .collect();
        Self { links, settings }
    }

    /// Create a switch from configuration; the channel count must match.
    pub fn from_config(channels: Vec<C>, config: &SwitchConfig) -> MeshResult<Self> {
        if channels.len() != config.links {
            return Err(MeshError::Config(format!(
                "{} channels bound but {} links configured",
                channels.len(),
                config.links
            )));
        }
        let settings = SwitchSettings::from(config);
        settings.link.validate()?;
        Ok(Self::new(channels, settings))
    }

    /// All links.
    pub fn links(&self) -> &[Link<C>] {
        &self.links
    }

    /// One link.
    pub fn link(&self, index: usize) -> Option<&Link<C>> {
        self.links.get(index)
    }

    /// One link, mutably.
    pub fn link_mut(&mut self, index: usize) -> Option<&mut Link<C>> {
        self.links.get_mut(index)
    }

    /// Announce the gateway role on every link.
    pub fn activate(&mut self) -> MeshResult<()> {
        for link in &mut self.links {
            link.send_probe(SWITCH_ADDRESS, CONTROL_ADDRESS)?;
        }
        info!(links = self.links.len(), "switch activated");
        Ok(())
    }

    /// First link whose table reaches `dst`.
    pub fn route_for(&self, dst: NodeId) -> Option<usize> {
        self.links.iter().position(|link| link.routes().reaches(dst))
    }

    /// Decide what to do with a raw frame that arrived on link `arrival`.
    pub fn process_raw(&mut self, arrival: usize, raw: RawFrame) -> MeshResult<Disposition> {
        let (src, dst) = raw
            .addresses()
            .ok_or_else(|| MeshError::MalformedFrame("frame shorter than its header".into()))?;
        let link = self
            .links
            .get_mut(arrival)
            .ok_or_else(|| MeshError::Config(format!("no link {}", arrival)))?;
        link.routes_mut().reset_liveness(src);

        if dst == CONTROL_ADDRESS || raw.kind() == Some(FrameKind::Control) {
            let frame = Frame::decode(&raw)?;
            return self.handle_control(arrival, frame);
        }

        if dst == BROADCAST {
            let links = self.flood(Some(arrival), src, raw.as_bytes());
            debug!(src, links, "broadcast forwarded");
            return Ok(Disposition::Flooded { links });
        }

        match self.route_for(dst) {
            Some(egress) => {
                debug!(src, dst, egress, "forwarding unicast");
                self.links[egress].enqueue_raw(raw)?;
                Ok(Disposition::Forwarded { link: egress })
            }
            None => {
                warn!(src, dst, "no link reaches destination, dropping");
                Err(MeshError::NoRoute { destination: dst })
            }
        }
    }

    fn handle_control(&mut self, arrival: usize, frame: Frame) -> MeshResult<Disposition> {
        let message = ControlMessage::decode(&frame.payload)?;
        let outcome = self.links[arrival].apply_control(frame.src, &message);

        let mut flooded = 0;
        if let ControlOutcome::Joined { hops, update, .. } = outcome {
            // A refused JOIN is neither answered nor spread
            if update.is_accepted() {
                if let Err(e) = self.advertise_to(frame.src) {
                    warn!(joiner = frame.src, error = %e, "route advertisement not sent");
                }

                let propagated = ControlMessage::Join {
                    hops: hops.saturating_add(1),
                };
                let raw = Frame::control(frame.src, BROADCAST, propagated.encode()?).encode()?;
                flooded = self.flood(Some(arrival), frame.src, raw.as_bytes());
                info!(joiner = frame.src, links = flooded, "JOIN propagated");
            }
        }

        Ok(Disposition::Control {
            message: message.name(),
            outcome,
            flooded,
        })
    }

    /// Queue an independent copy of `bytes` on every qualifying link.
    ///
    /// A link qualifies when it is not `exclude`, its far end is classified
    /// and its table does not already reach `src`.
    pub fn flood(&mut self, exclude: Option<usize>, src: NodeId, bytes: &[u8]) -> usize {
        let mut sent = 0;
        for link in &mut self.links {
            if Some(link.index()) == exclude
                || !link.remote_role().is_classified()
                || link.routes().reaches(src)
            {
                continue;
            }
            match link.enqueue_raw(RawFrame::from_bytes(bytes)) {
                Ok(_) => sent += 1,
                Err(e) => warn!(link = link.index(), error = %e, "flood copy dropped"),
            }
        }
        sent
    }

    /// Send the switch's combined routing table to `dst`.
    ///
    /// Routes are taken from every link, keeping the shortest hop count per
    /// id. When the advertisement leaves through a gateway link, routes
    /// learned from that same link are left out so the neighbour never
    /// learns a path back through itself.
    pub fn advertise_to(&mut self, dst: NodeId) -> MeshResult<usize> {
        let egress = self
            .route_for(dst)
            .ok_or(MeshError::NoRoute { destination: dst })?;
        let split_horizon = self.links[egress].remote_role() == Role::Gateway;

        let mut best = [0u8; RTABLE_LENGTH];
        for link in &self.links {
            if split_horizon && link.index() == egress {
                continue;
            }
            for entry in link.routes().entries() {
                let slot = &mut best[entry.id as usize];
                if *slot == 0 || entry.hops < *slot {
                    *slot = entry.hops;
                }
            }
        }

        let routes = best
            .iter()
            .enumerate()
            .filter(|(_, hops)| **hops > 0)
            .map(|(id, hops)| (id as NodeId, *hops));
        let message = ControlMessage::advertise(routes);
        debug!(dst, egress, "sending routing table");
        self.links[egress].send_control(SWITCH_ADDRESS, dst, &message)
    }

    /// Switch-originated unicast data frame.
    pub fn send(&mut self, dst: NodeId, payload: impl Into<Vec<u8>>) -> MeshResult<usize> {
        if !is_routable(dst) {
            return Err(MeshError::InvalidRouteTarget { id: dst, hops: 0 });
        }
        let egress = self
            .route_for(dst)
            .ok_or(MeshError::NoRoute { destination: dst })?;
        self.links[egress].send_frame(&Frame::data(SWITCH_ADDRESS, dst, payload))
    }

    /// Read link `index` and process every complete frame it holds.
    pub fn poll_link(&mut self, index: usize) -> MeshResult<usize> {
        let link = self
            .links
            .get_mut(index)
            .ok_or_else(|| MeshError::Config(format!("no link {}", index)))?;
        link.receive()?;

        let mut frames = 0;
        while let Some(raw) = self.links[index].next_frame() {
            frames += 1;
            match self.process_raw(index, raw) {
                Ok(disposition) => debug!(link = index, ?disposition, "frame handled"),
                Err(e) => warn!(link = index, error = %e, "frame dropped"),
            }
        }
        Ok(frames)
    }

    /// One cooperative round: drain every link, then transmit one frame each.
    pub fn run_once(&mut self) -> RoundStats {
        let mut stats = RoundStats::default();
        for index in 0..self.links.len() {
            match self.poll_link(index) {
                Ok(frames) => stats.frames_received += frames,
                Err(e) => warn!(link = index, error = %e, "receive failed"),
            }
            match self.links[index].transmit_next() {
                Ok(Some(_)) => stats.frames_sent += 1,
                Ok(None) => {}
                Err(e) => warn!(link = index, error = %e, "transmit failed"),
            }
        }
        stats
    }

    /// Liveness phase: age every route, probe silent nodes, drop dead ones.
    pub fn tick(&mut self) -> Vec<(usize, Liveness)> {
        let (probe_after, dead_after) = (
            self.settings.probe_after_ticks,
            self.settings.dead_after_ticks,
        );
        let mut events = Vec::new();
        for link in &mut self.links {
            for event in link.routes_mut().tick(probe_after, dead_after) {
                if let Liveness::Probe(id) = event {
                    if let Err(e) = link.send_probe(SWITCH_ADDRESS, id) {
                        warn!(link = link.index(), id, error = %e, "liveness probe not queued");
                    }
                }
                events.push((link.index(), event));
            }
        }
        events
    }

    /// Diagnostic snapshot of every link.
    pub fn status(&self) -> SwitchStatus {
        SwitchStatus {
            links: self.links.iter().map(Link::status).collect(),
        }
    }
}

/// Switch operational status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchStatus {
    /// Per-link status
    pub links: Vec<LinkStatus>,
}

impl SwitchStatus {
    /// Render as JSON for diagnostics.
    pub fn to_json(&self) -> MeshResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
