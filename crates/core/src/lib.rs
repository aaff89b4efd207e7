//! Core functionality shared by serialmesh nodes.
//!
//! Holds node configuration and logging setup used by both switch and
//! endpoint builds.

pub mod config;
pub mod logging;

pub use config::{Config, EndpointConfig, SwitchConfig, MAX_NODE_ID};
