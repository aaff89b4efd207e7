//! Join, unicast and broadcast behaviour across multi-node topologies

use crate::test_utils::{star, two_switch_line, TopologyBuilder};
use serialmesh_core::logging;
use serialmesh_mesh::{Frame, Role, BROADCAST};

#[test]
fn test_join_teaches_routes_across_switches() {
    logging::try_init_for_tests();
    let mut sim = two_switch_line();
    sim.start();

    let s0 = &sim.switches[0];
    let s1 = &sim.switches[1];
    assert_eq!(s0.route_for(7), Some(0));
    assert_eq!(s0.route_for(9), Some(1));
    assert_eq!(s0.links()[1].routes().hops(9), 2);
    assert_eq!(s1.route_for(7), Some(0));
    assert_eq!(s1.route_for(9), Some(1));
    assert_eq!(s1.links()[0].routes().hops(7), 2);

    assert_eq!(s0.links()[0].remote_role(), Role::Endpoint);
    assert_eq!(s0.links()[1].remote_role(), Role::Gateway);

    // No switch learns a path back through the neighbour it heard it from
    assert!(!s0.links()[1].routes().reaches(7));
    assert!(!s1.links()[0].routes().reaches(9));
}

#[test]
fn test_propagated_join_reaches_far_endpoint() {
    let mut sim = two_switch_line();
    sim.start();

    assert_eq!(sim.endpoint(9).routes().hops(7), 3);
    assert_eq!(sim.endpoint(7).routes().hops(9), 3);
}

#[test]
fn test_unicast_crosses_two_switches() {
    logging::try_init_for_tests();
    let mut sim = two_switch_line();
    sim.start();

    sim.endpoint(7).send(9, b"hello nine".to_vec()).unwrap();
    sim.settle(6);

    assert_eq!(sim.received(9), vec![(7, b"hello nine".to_vec())]);
    assert!(sim.received(7).is_empty());

    sim.endpoint(9).send(7, b"ack".to_vec()).unwrap();
    sim.settle(6);
    assert_eq!(sim.received(7), vec![(9, b"ack".to_vec())]);
}

#[test]
fn test_unicast_to_unknown_node_is_dropped() {
    let mut sim = star();
    sim.start();

    sim.endpoint(2).send(11, b"nobody".to_vec()).unwrap();
    sim.settle(6);

    assert!(sim.received(3).is_empty());
    assert!(sim.received(4).is_empty());
    assert!(sim.switches[0].links().iter().all(|l| l.egress_len() == 0));
}

#[test]
fn test_unicast_in_star_reaches_only_target() {
    let mut sim = star();
    sim.start();

    sim.endpoint(2).send(4, b"direct".to_vec()).unwrap();
    sim.settle(4);

    assert_eq!(sim.received(4), vec![(2, b"direct".to_vec())]);
    assert!(sim.received(3).is_empty());
    assert!(sim.received(2).is_empty());
}

#[test]
fn test_broadcast_floods_without_echo() {
    let mut sim = star();
    sim.start();

    sim.endpoint(3).send(BROADCAST, b"everyone".to_vec()).unwrap();
    sim.settle(4);

    assert_eq!(sim.received(2), vec![(3, b"everyone".to_vec())]);
    assert_eq!(sim.received(4), vec![(3, b"everyone".to_vec())]);
    assert!(sim.received(3).is_empty());
}

#[test]
fn test_broadcast_crosses_trunk_once() {
    let mut sim = TopologyBuilder::new()
        .switch(3)
        .switch(2)
        .endpoint(7, (0, 0))
        .endpoint(8, (0, 2))
        .trunk((0, 1), (1, 0))
        .endpoint(9, (1, 1))
        .build();
    sim.start();

    sim.endpoint(7).send(BROADCAST, b"flood".to_vec()).unwrap();
    sim.settle(8);

    assert_eq!(sim.received(8), vec![(7, b"flood".to_vec())]);
    assert_eq!(sim.received(9), vec![(7, b"flood".to_vec())]);
    assert!(sim.received(7).is_empty());
}

#[test]
fn test_frames_survive_line_noise() {
    let mut sim = star();
    sim.start();

    let frame = Frame::data(2, 3, b"through the static".to_vec())
        .encode()
        .unwrap();
    let mut wire = vec![0x13, 0x37, 0xAA, 0x00];
    wire.extend_from_slice(frame.as_bytes());
    sim.inject((0, 0), &wire);
    sim.settle(4);

    assert_eq!(sim.received(3), vec![(2, b"through the static".to_vec())]);
}

#[test]
fn test_switch_status_lists_links() {
    let mut sim = star();
    sim.start();

    let status = sim.switches[0].status();
    assert_eq!(status.links.len(), 3);
    assert!(status
        .links
        .iter()
        .all(|l| l.remote_role == Role::Endpoint && l.routes.len() == 1));

    let json: serde_json::Value =
        serde_json::from_str(&status.to_json().unwrap()).unwrap();
    assert_eq!(json["links"][1]["routes"][0]["id"], 3);
}
