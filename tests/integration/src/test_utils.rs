//! Test utilities for simulated meshes over in-memory cables

use serialmesh_mesh::{Endpoint, LinkSettings, MemoryChannel, NodeId, Switch, SwitchSettings};
use tracing::debug;

/// A link slot on a switch: `(switch, link)`
pub type Port = (usize, usize);

/// Builder wiring switches and endpoints together with `MemoryChannel` pairs
pub struct TopologyBuilder {
    ports: Vec<Vec<Option<MemoryChannel>>>,
    taps: Vec<Vec<Option<MemoryChannel>>>,
    endpoints: Vec<(NodeId, MemoryChannel)>,
    settings: SwitchSettings,
}

impl TopologyBuilder {
    /// Start an empty topology with default switch settings
    pub fn new() -> Self {
        Self {
            ports: Vec::new(),
            taps: Vec::new(),
            endpoints: Vec::new(),
            settings: SwitchSettings::default(),
        }
    }

    /// Override switch settings
    pub fn settings(mut self, settings: SwitchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Add a switch with `links` ports
    pub fn switch(mut self, links: usize) -> Self {
        self.ports.push((0..links).map(|_| None).collect());
        self.taps.push((0..links).map(|_| None).collect());
        self
    }

    /// Attach endpoint `id` to `port`
    pub fn endpoint(mut self, id: NodeId, port: Port) -> Self {
        let far = self.cable(port);
        self.endpoints.push((id, far));
        self
    }

    /// Connect two switch ports
    pub fn trunk(mut self, a: Port, b: Port) -> Self {
        let far = self.cable(a);
        self.place(b, far);
        self
    }

    fn cable(&mut self, port: Port) -> MemoryChannel {
        let (near, far) = MemoryChannel::pair();
        self.place(port, near);
        far
    }

    fn place(&mut self, (switch, link): Port, channel: MemoryChannel) {
        assert!(self.ports[switch][link].is_none(), "port {:?} already wired", (switch, link));
        self.taps[switch][link] = Some(channel.clone());
        self.ports[switch][link] = Some(channel);
    }

    /// Build the simulation; unwired ports get a cable to nowhere
    pub fn build(self) -> Simulation {
        let settings = self.settings;
        let switches = self
            .ports
            .into_iter()
            .map(|ports| {
                let channels = ports
                    .into_iter()
                    .map(|slot| slot.unwrap_or_else(|| MemoryChannel::pair().0))
                    .collect();
                Switch::new(channels, settings)
            })
            .collect();
        let endpoints = self
            .endpoints
            .into_iter()
            .map(|(id, channel)| Endpoint::new(id, channel, LinkSettings::default()).unwrap())
            .collect();

        Simulation {
            switches,
            endpoints,
            taps: self.taps,
        }
    }
}

impl Default for TopologyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A set of nodes stepped in lockstep
pub struct Simulation {
    pub switches: Vec<Switch<MemoryChannel>>,
    pub endpoints: Vec<Endpoint<MemoryChannel>>,
    taps: Vec<Vec<Option<MemoryChannel>>>,
}

impl Simulation {
    /// Activate switches, let trunks classify, then join every endpoint
    pub fn start(&mut self) {
        for switch in &mut self.switches {
            switch.activate().unwrap();
        }
        self.settle(4);
        for endpoint in &mut self.endpoints {
            endpoint.activate().unwrap();
        }
        self.settle(20);
    }

    /// One round: every endpoint, then every switch
    pub fn step(&mut self) {
        for endpoint in &mut self.endpoints {
            endpoint.poll().unwrap();
            endpoint.transmit_next().unwrap();
        }
        for switch in &mut self.switches {
            let stats = switch.run_once();
            debug!(?stats, "switch round");
        }
    }

    /// Run `rounds` rounds
    pub fn settle(&mut self, rounds: usize) {
        for _ in 0..rounds {
            self.step();
        }
    }

    /// Endpoint with address `id`
    pub fn endpoint(&mut self, id: NodeId) -> &mut Endpoint<MemoryChannel> {
        self.endpoints
            .iter_mut()
            .find(|e| e.id() == id)
            .unwrap_or_else(|| panic!("no endpoint {}", id))
    }

    /// Inject raw bytes into a switch port as if its far end sent them
    pub fn inject(&self, (switch, link): Port, bytes: &[u8]) {
        self.taps[switch][link]
            .as_ref()
            .unwrap_or_else(|| panic!("port {:?} not wired", (switch, link)))
            .inject(bytes)
            .unwrap();
    }

    /// Drain every frame delivered to endpoint `id`
    pub fn received(&mut self, id: NodeId) -> Vec<(NodeId, Vec<u8>)> {
        let endpoint = self.endpoint(id);
        std::iter::from_fn(|| endpoint.pop())
            .map(|frame| (frame.src, frame.payload))
            .collect()
    }
}

/// E7 - S0 - S1 - E9, with the trunk on link 1 of S0 and link 0 of S1
pub fn two_switch_line() -> Simulation {
    TopologyBuilder::new()
        .switch(2)
        .switch(2)
        .endpoint(7, (0, 0))
        .trunk((0, 1), (1, 0))
        .endpoint(9, (1, 1))
        .build()
}

/// One switch with endpoints 2, 3 and 4 on links 0, 1 and 2
pub fn star() -> Simulation {
    TopologyBuilder::new()
        .switch(3)
        .endpoint(2, (0, 0))
        .endpoint(3, (0, 1))
        .endpoint(4, (0, 2))
        .build()
}
