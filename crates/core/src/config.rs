//! Configuration management for serialmesh nodes.

use serde::{Deserialize, Serialize};
#[cfg(feature = "toml")]
use std::path::Path;

/// Largest node id that can be the target of a route (15 is broadcast).
pub const MAX_NODE_ID: u8 = 14;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "SwitchConfig::default")]
    pub switch: SwitchConfig,
    #[serde(default)]
    pub endpoint: Option<EndpointConfig>,
}

/// Switch (gateway) node settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchConfig {
    /// Number of serial links the switch drives.
    pub links: usize,
    pub send_queue_size: usize,
    pub recv_queue_size: usize,
    /// Pause between cooperative rounds over all links.
    pub round_interval_ms: u64,
    /// Liveness monitoring interval.
    pub tick_interval_ms: u64,
    /// Missed ticks before a liveness probe is sent.
    pub probe_after_ticks: u16,
    /// Missed ticks before a route is declared dead.
    pub dead_after_ticks: u16,
    /// Live routes a single link table may hold.
    pub max_routes: usize,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            links: 3,
            send_queue_size: 6,
            recv_queue_size: 6,
            round_interval_ms: 100,
            tick_interval_ms: 1000,
            probe_after_ticks: 3,
            dead_after_ticks: 5,
            max_routes: MAX_NODE_ID as usize,
        }
    }
}

/// Endpoint node settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub node_id: u8,
    #[serde(default = "default_queue_size")]
    pub send_queue_size: usize,
    #[serde(default = "default_queue_size")]
    pub recv_queue_size: usize,
    #[serde(default = "default_max_routes")]
    pub max_routes: usize,
}

fn default_queue_size() -> usize {
    6
}

fn default_max_routes() -> usize {
    MAX_NODE_ID as usize
}

impl Config {
    #[cfg(feature = "toml")]
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            switch: SwitchConfig::default(),
            endpoint: None,
        }
    }

    /// Reject settings the link layer cannot honour.
    pub fn validate(&self) -> anyhow::Result<()> {
        let s = &self.switch;
        if s.links == 0 {
            anyhow::bail!("switch.links must be at least 1");
        }
        if s.send_queue_size == 0 || s.recv_queue_size == 0 {
            anyhow::bail!("queue sizes must be non-zero");
        }
        if s.probe_after_ticks == 0 || s.probe_after_ticks >= s.dead_after_ticks {
            anyhow::bail!(
                "probe_after_ticks ({}) must be non-zero and below dead_after_ticks ({})",
                s.probe_after_ticks,
                s.dead_after_ticks
            );
        }
        if s.max_routes == 0 || s.max_routes > MAX_NODE_ID as usize {
            anyhow::bail!("max_routes must be within 1..={}", MAX_NODE_ID);
        }
        if let Some(e) = &self.endpoint {
            if e.node_id == 0 || e.node_id > MAX_NODE_ID {
                anyhow::bail!("endpoint.node_id {} outside 1..={}", e.node_id, MAX_NODE_ID);
            }
            if e.send_queue_size == 0 || e.recv_queue_size == 0 {
                anyhow::bail!("endpoint queue sizes must be non-zero");
            }
            if e.max_routes == 0 || e.max_routes > MAX_NODE_ID as usize {
                anyhow::bail!("endpoint.max_routes must be within 1..={}", MAX_NODE_ID);
            }
        }
        Ok(())
    }
}
