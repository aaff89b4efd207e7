//! Integration tests for multi-node serialmesh topologies
//!
//! This test suite validates:
//! - Endpoint join and route learning across switches
//! - Directed unicast over multiple hops
//! - Broadcast flooding without echo to the sender
//! - Liveness probing and dead-node removal
//! - Frame recovery through line noise
//! - Configuration-driven node construction and async drivers

pub mod test_utils;

#[cfg(test)]
mod topology_tests;

#[cfg(test)]
mod liveness_tests;

#[cfg(test)]
mod driver_tests;
