//! Per-link routing table with silence-based liveness.
//!
//! One slot per 4-bit address, indexed by node id. A route is live while its
//! hop count is non-zero. The live counter is tracked separately from slot
//! occupancy and bounds how many routes a single link may carry.

use crate::error::{MeshError, MeshResult};
use crate::frame::{is_routable, NodeId, BROADCAST};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Slots in a table: the whole 4-bit address space.
pub const RTABLE_LENGTH: usize = BROADCAST as usize + 1;

/// Hop count of a node attached directly to the link.
pub const DIRECT_HOPS: u8 = 1;

/// Route entry in the routing table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingEntry {
    /// Destination node ID
    pub id: NodeId,
    /// Link hops to the destination; 0 means no route
    pub hops: u8,
    /// Liveness ticks since traffic was last seen from `id`
    pub ticks: u16,
}

impl RoutingEntry {
    /// Whether this entry is a usable route.
    pub fn is_live(&self) -> bool {
        self.hops > 0
    }
}

/// Result of route update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteUpdate {
    /// New route added
    Inserted,
    /// Existing route's hop count replaced
    Overwritten {
        /// Hop count before the update
        previous_hops: u8,
    },
    /// Link-control or broadcast id, or a zero hop count
    RejectedInvalid,
    /// Live counter already at capacity
    RejectedFull,
}

impl RouteUpdate {
    /// Whether the table was changed.
    pub fn is_accepted(&self) -> bool {
        matches!(self, RouteUpdate::Inserted | RouteUpdate::Overwritten { .. })
    }

    /// Turn a rejection into the matching [`MeshError`].
    pub fn into_result(self, id: NodeId, hops: u8, capacity: usize) -> MeshResult<Self> {
        match self {
            RouteUpdate::RejectedInvalid => Err(MeshError::InvalidRouteTarget { id, hops }),
            RouteUpdate::RejectedFull => Err(MeshError::RouteTableFull { id, capacity }),
            accepted => Ok(accepted),
        }
    }
}

/// Outcome of one liveness tick for a single route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Silent long enough that the node should be probed
    Probe(NodeId),
    /// Silent past the dead threshold; the route was removed
    Dead(NodeId),
}

/// Routing table for one link
#[derive(Debug, Clone)]
pub struct RouteTable {
    entries: [RoutingEntry; RTABLE_LENGTH],
    live: usize,
    capacity: usize,
}

impl RouteTable {
    /// Create a table holding up to `capacity` live routes.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: [RoutingEntry::default(); RTABLE_LENGTH],
            live: 0,
            capacity: capacity.min(RTABLE_LENGTH),
        }
    }

    /// Insert or overwrite the route to `id`.
    pub fn update(&mut self, id: NodeId, hops: u8) -> RouteUpdate {
        if !is_routable(id) || hops == 0 {
            warn!(id, hops, "rejecting invalid route target");
            return RouteUpdate::RejectedInvalid;
        }
        if self.live >= self.capacity {
            warn!(id, capacity = self.capacity, "routing table full, dropping update");
            return RouteUpdate::RejectedFull;
        }

        let entry = &mut self.entries[id as usize];
        if entry.is_live() {
            let previous_hops = entry.hops;
            entry.hops = hops;
            warn!(id, previous_hops, hops, "overwriting existing route entry");
            return RouteUpdate::Overwritten { previous_hops };
        }

        *entry = RoutingEntry { id, hops, ticks: 0 };
        self.live += 1;
        debug!(id, hops, "route inserted");
        RouteUpdate::Inserted
    }

    /// Clear the tick count for `id`. Returns false when there is no live route.
    pub fn reset_liveness(&mut self, id: NodeId) -> bool {
        match self.entries.get_mut(id as usize) {
            Some(entry) if is_routable(id) && entry.is_live() => {
                entry.ticks = 0;
                true
            }
            _ => false,
        }
    }

    /// Age every direct-neighbour route by one tick.
    ///
    /// A route reaching `dead_after` is removed and reported once; a route
    /// reaching `probe_after` first is reported for probing. Multi-hop routes
    /// are not aged: a link-local probe cannot reach them.
    pub fn tick(&mut self, probe_after: u16, dead_after: u16) -> Vec<Liveness> {
        let mut events = Vec::new();
        for entry in self.entries.iter_mut().filter(|e| e.hops == DIRECT_HOPS) {
            entry.ticks = entry.ticks.saturating_add(1);

            if entry.ticks >= dead_after {
                entry.hops = 0;
                entry.ticks = 0;
                self.live -= 1;
                warn!(id = entry.id, "ALERT: node declared dead");
                events.push(Liveness::Dead(entry.id));
            } else if entry.ticks >= probe_after {
                debug!(id = entry.id, ticks = entry.ticks, "probing silent node");
                events.push(Liveness::Probe(entry.id));
            }
        }
        events
    }

    /// Hop count to `id`, or 0 when unreachable.
    pub fn hops(&self, id: NodeId) -> u8 {
        self.entries.get(id as usize).map_or(0, |e| e.hops)
    }

    /// Whether `id` is reachable through this link.
    pub fn reaches(&self, id: NodeId) -> bool {
        self.hops(id) > 0
    }

    /// Full entry for `id` if live.
    pub fn get(&self, id: NodeId) -> Option<&RoutingEntry> {
        self.entries.get(id as usize).filter(|e| e.is_live())
    }

    /// Live route count.
    pub fn len(&self) -> usize {
        self.live
    }

    /// True when no route is live.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live route limit.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Live entries in id order.
    pub fn entries(&self) -> impl Iterator<Item = &RoutingEntry> {
        self.entries.iter().filter(|e| e.is_live())
    }

    /// Copy of the live entries for diagnostics.
    pub fn snapshot(&self) -> Vec<RoutingEntry> {
        self.entries().copied().collect()
    }
}
