//! Configuration-driven nodes running under the tokio drivers

use serialmesh_core::{logging, Config};
use serialmesh_mesh::{run_endpoint, run_switch, Endpoint, MemoryChannel, Switch};
use std::time::Duration;
use tokio::sync::watch;

const CONFIG: &str = r#"
[switch]
links = 2
round_interval_ms = 5
tick_interval_ms = 2000

[endpoint]
node_id = 2
"#;

#[test]
fn test_config_builds_nodes() {
    let config = Config::from_toml_str(CONFIG).unwrap();
    let (a, b) = MemoryChannel::pair();
    let (c, _d) = MemoryChannel::pair();

    let switch = Switch::from_config(vec![a, c], &config.switch).unwrap();
    assert_eq!(switch.links().len(), 2);

    let endpoint = Endpoint::from_config(b, config.endpoint.as_ref().unwrap()).unwrap();
    assert_eq!(endpoint.id(), 2);
    assert_eq!(endpoint.routes().capacity(), 14);
}

#[tokio::test]
async fn test_drivers_converge_star() {
    logging::try_init_for_tests();
    let config = Config::from_toml_str(CONFIG).unwrap();
    let round = Duration::from_millis(config.switch.round_interval_ms);

    let (s0, e2) = MemoryChannel::pair();
    let (s1, e3) = MemoryChannel::pair();
    let switch = Switch::from_config(vec![s0, s1], &config.switch).unwrap();
    let two = Endpoint::from_config(e2, config.endpoint.as_ref().unwrap()).unwrap();
    let three = Endpoint::new(3, e3, Default::default()).unwrap();

    let (tx, rx) = watch::channel(false);
    let switch_task = {
        let (rx, switch_config) = (rx.clone(), config.switch.clone());
        tokio::spawn(async move { run_switch(switch, &switch_config, rx).await })
    };
    let two_task = tokio::spawn(run_endpoint(two, round, rx.clone()));
    let three_task = tokio::spawn(run_endpoint(three, round, rx));

    tokio::time::sleep(Duration::from_millis(300)).await;
    tx.send(true).unwrap();

    let switch = switch_task.await.unwrap();
    let two = two_task.await.unwrap();
    let three = three_task.await.unwrap();

    assert_eq!(switch.route_for(2), Some(0));
    assert_eq!(switch.route_for(3), Some(1));
    assert_eq!(two.routes().hops(3), 2);
    assert_eq!(three.routes().hops(2), 2);
}
