//! Liveness probing and dead-node removal on a running mesh

use crate::test_utils::{star, two_switch_line, TopologyBuilder};
use serialmesh_mesh::{Liveness, SwitchSettings};

#[test]
fn test_silent_endpoint_is_declared_dead_once() {
    let mut sim = star();
    sim.start();
    // Endpoint 4 goes quiet; the others keep stepping
    let silent = sim.endpoints.remove(2);
    assert_eq!(silent.id(), 4);

    let mut events = Vec::new();
    for _ in 0..8 {
        events.extend(sim.switches[0].tick());
        sim.settle(2);
    }

    let dead: Vec<(usize, Liveness)> = events
        .into_iter()
        .filter(|(_, e)| matches!(e, Liveness::Dead(_)))
        .collect();
    assert_eq!(dead, vec![(2, Liveness::Dead(4))]);
    assert_eq!(sim.switches[0].route_for(4), None);
    assert_eq!(sim.switches[0].route_for(2), Some(0));
    assert_eq!(sim.switches[0].route_for(3), Some(1));
}

#[test]
fn test_answered_probes_keep_quiet_endpoint_alive() {
    let mut sim = star();
    sim.start();

    let mut probes = 0;
    for _ in 0..20 {
        for (_, event) in sim.switches[0].tick() {
            match event {
                Liveness::Probe(_) => probes += 1,
                Liveness::Dead(id) => panic!("endpoint {} declared dead", id),
            }
        }
        sim.settle(2);
    }

    assert!(probes > 0);
    for id in [2, 3, 4] {
        assert!(sim.switches[0].route_for(id).is_some());
    }
}

#[test]
fn test_traffic_resets_liveness() {
    let mut sim = TopologyBuilder::new()
        .settings(SwitchSettings {
            probe_after_ticks: 2,
            dead_after_ticks: 3,
            ..SwitchSettings::default()
        })
        .switch(2)
        .endpoint(5, (0, 0))
        .endpoint(6, (0, 1))
        .build();
    sim.start();

    let (mut at_five, mut at_six) = (0, 0);
    for round in 0..10u8 {
        let events = sim.switches[0].tick();
        assert!(events.is_empty(), "unexpected {:?}", events);
        sim.endpoint(5).send(6, vec![round]).unwrap();
        sim.endpoint(6).send(5, vec![round]).unwrap();
        sim.settle(3);
        at_five += sim.received(5).len();
        at_six += sim.received(6).len();
    }
    assert_eq!((at_five, at_six), (10, 10));
}

#[test]
fn test_dead_node_can_rejoin() {
    let mut sim = star();
    sim.start();
    let mut quiet = sim.endpoints.remove(1);

    for _ in 0..6 {
        sim.switches[0].tick();
        sim.settle(1);
    }
    assert_eq!(sim.switches[0].route_for(3), None);

    // Answer the probes queued while it was away, then join again
    while quiet.poll().unwrap() > 0 {}
    quiet.activate().unwrap();
    sim.endpoints.push(quiet);
    sim.settle(6);
    assert_eq!(sim.switches[0].route_for(3), Some(1));
}

#[test]
fn test_idle_multi_hop_routes_outlive_dead_threshold() {
    let mut sim = two_switch_line();
    sim.start();

    for _ in 0..3 * SwitchSettings::default().dead_after_ticks {
        for switch in &mut sim.switches {
            let dead: Vec<_> = switch
                .tick()
                .into_iter()
                .filter(|(_, e)| matches!(e, Liveness::Dead(_)))
                .collect();
            assert!(dead.is_empty(), "unexpected {:?}", dead);
        }
        sim.settle(3);
    }

    assert_eq!(sim.switches[0].route_for(9), Some(1));
    assert_eq!(sim.switches[1].route_for(7), Some(0));

    sim.endpoint(7).send(9, b"still here".to_vec()).unwrap();
    sim.settle(6);
    assert_eq!(sim.received(9), vec![(7, b"still here".to_vec())]);
}
