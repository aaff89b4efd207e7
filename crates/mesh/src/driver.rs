//! Tokio drivers for switch and endpoint nodes.
//!
//! A node is owned by exactly one task. Forwarding rounds and liveness ticks
//! are branches of the same `select!`, so table updates never race.

use crate::channel::ByteChannel;
use crate::endpoint::Endpoint;
use crate::routing::Liveness;
use crate::switch::Switch;
use serialmesh_core::config::SwitchConfig;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Run `switch` until `shutdown` turns true, then hand it back.
pub async fn run_switch<C: ByteChannel>(
    mut switch: Switch<C>,
    config: &SwitchConfig,
    mut shutdown: watch::Receiver<bool>,
) -> Switch<C> {
    if let Err(e) = switch.activate() {
        warn!(error = %e, "switch activation incomplete");
    }

    let mut round = interval(Duration::from_millis(config.round_interval_ms));
    round.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut liveness = interval(Duration::from_millis(config.tick_interval_ms));
    liveness.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of an interval fires immediately
    liveness.tick().await;

    info!(links = switch.links().len(), "switch driver started");
    loop {
        tokio::select! {
            _ = round.tick() => {
                let stats = switch.run_once();
                if stats.frames_received > 0 || stats.frames_sent > 0 {
                    debug!(?stats, "round complete");
                }
            }
            _ = liveness.tick() => {
                for (link, event) in switch.tick() {
                    if let Liveness::Dead(id) = event {
                        warn!(link, id, "route expired");
                    }
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!("switch driver stopped");
    switch
}

/// Run `endpoint` until `shutdown` turns true, then hand it back.
///
/// Each round drains the link and transmits one queued frame.
pub async fn run_endpoint<C: ByteChannel>(
    mut endpoint: Endpoint<C>,
    round_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> Endpoint<C> {
    if let Err(e) = endpoint.activate() {
        warn!(error = %e, "endpoint activation incomplete");
    }

    let mut round = interval(round_interval);
    round.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = round.tick() => {
                if let Err(e) = endpoint.poll() {
                    warn!(id = endpoint.id(), error = %e, "receive failed");
                }
                if let Err(e) = endpoint.transmit_next() {
                    warn!(id = endpoint.id(), error = %e, "transmit failed");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    endpoint
}
