// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! End-to-end engine tests against fake bridge seams and short timers.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ipnet::IpNet;
use parking_lot::Mutex;

use config::routing::{BgpConfig, NeighborConfig, OspfConfig};
use config::{Protocol, RouterConfig};
use routersim_routing::testing::{FakeDaemonControl, FakeTransport};
use routersim_routing::{
    NeighborState, Route, RouterCore, RouterError, RouterParamsBuilder,
};
use tracing_test::traced_test;

const PEER: &str = "192.0.2.1";

fn scratch_dir(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("routersim-test-{tag}-{}", std::process::id()))
}

fn base_config(tag: &str) -> RouterConfig {
    let mut cfg = RouterConfig::default();
    cfg.hostname = "test-router".to_owned();
    cfg.bridge.config_dir = scratch_dir(tag).display().to_string();
    cfg.bridge.command_timeout_ms = 500;
    cfg.bridge.monitor_interval_ms = 50;
    cfg
}

fn bgp_section() -> BgpConfig {
    BgpConfig::new(65001, Ipv4Addr::new(10, 0, 0, 1)).set_timers(50, 200)
}

struct Harness {
    core: Arc<RouterCore>,
    transport: FakeTransport,
    daemons: FakeDaemonControl,
}

fn harness(cfg: RouterConfig) -> Harness {
    let transport = FakeTransport::new();
    let daemons = FakeDaemonControl::new();
    let params = RouterParamsBuilder::default()
        .config(cfg)
        .transport(Box::new(transport.clone()))
        .daemons(Box::new(daemons.clone()))
        .build()
        .expect("all params set");
    let core = RouterCore::new(params).expect("valid configuration");
    Harness {
        core,
        transport,
        daemons,
    }
}

fn wait_until(timeout: Duration, mut pred: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if pred() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    pred()
}

fn peer() -> IpAddr {
    IpAddr::from_str(PEER).unwrap()
}

fn prefix(s: &str) -> IpNet {
    IpNet::from_str(s).unwrap()
}

#[test]
fn bgp_neighbor_walks_to_established() {
    let mut cfg = base_config("bgp-up");
    cfg.protocols.bgp = Some(bgp_section());
    let h = harness(cfg);

    h.core.start().unwrap();
    h.core
        .add_neighbor(Protocol::Bgp, peer(), &NeighborConfig::bgp(65002))
        .unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        h.core
            .get_neighbors(Protocol::Bgp)
            .unwrap()
            .iter()
            .any(|n| n.state == NeighborState::Established)
    }));
    let neighbors = h.core.get_neighbors(Protocol::Bgp).unwrap();
    assert_eq!(neighbors.len(), 1);
    assert_eq!(neighbors[0].address, peer());
    assert!(neighbors[0].messages_sent >= 1);
    assert_eq!(h.core.get_statistics().total.neighbors_established, 1);

    // the neighbor was announced to the suite
    assert!(!h
        .transport
        .commands_matching("neighbor 192.0.2.1 remote-as 65002")
        .is_empty());
    h.core.stop().unwrap();
}

#[test]
fn ospf_adjacency_passes_every_state_in_order() {
    let mut cfg = base_config("ospf-seq");
    let mut ospf = OspfConfig::new(Ipv4Addr::new(10, 0, 0, 2)).add_interface("eth0");
    ospf.hello_interval_ms = 80;
    ospf.dead_interval_ms = 400;
    cfg.protocols.ospf = Some(ospf);
    let h = harness(cfg);

    h.core.start().unwrap();
    h.core
        .add_neighbor(Protocol::Ospf, peer(), &NeighborConfig::default())
        .unwrap();

    // sample faster than the hello interval so no state can be missed
    let mut observed: Vec<NeighborState> = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if let Some(n) = h
            .core
            .get_neighbors(Protocol::Ospf)
            .unwrap()
            .into_iter()
            .next()
        {
            if observed.last() != Some(&n.state) {
                observed.push(n.state);
            }
            if n.state == NeighborState::Full {
                break;
            }
        }
        std::thread::sleep(Duration::from_millis(5));
    }

    assert_eq!(
        observed,
        vec![
            NeighborState::Down,
            NeighborState::Init,
            NeighborState::TwoWay,
            NeighborState::ExStart,
            NeighborState::Exchange,
            NeighborState::Loading,
            NeighborState::Full,
        ]
    );
    h.core.stop().unwrap();
}

#[test]
fn advertise_without_established_neighbors_issues_no_commands() {
    let mut cfg = base_config("adv-quiet");
    cfg.protocols.bgp = Some(bgp_section());
    let h = harness(cfg);
    h.core.start().unwrap();

    let route = Route::new(prefix("10.0.0.0/8"), Protocol::Bgp).set_metric(10);
    h.core.advertise_route(Protocol::Bgp, route).unwrap();

    assert!(wait_until(Duration::from_secs(1), || {
        h.core.get_routes().iter().any(|r| r.prefix == prefix("10.0.0.0/8"))
    }));
    std::thread::sleep(Duration::from_millis(200));
    assert!(h.transport.commands_matching("network 10.0.0.0/8").is_empty());
    h.core.stop().unwrap();
}

#[test]
fn advertise_and_withdraw_roundtrip() {
    let mut cfg = base_config("adv-withdraw");
    cfg.protocols.bgp = Some(bgp_section());
    let h = harness(cfg);
    h.core.start().unwrap();
    h.core
        .add_neighbor(Protocol::Bgp, peer(), &NeighborConfig::bgp(65002))
        .unwrap();
    assert!(wait_until(Duration::from_secs(5), || {
        h.core
            .get_neighbors(Protocol::Bgp)
            .unwrap()
            .iter()
            .any(|n| n.state == NeighborState::Established)
    }));

    let route = Route::new(prefix("10.0.0.0/8"), Protocol::Bgp).set_metric(10);
    h.core.advertise_route(Protocol::Bgp, route).unwrap();
    assert!(wait_until(Duration::from_secs(5), || {
        !h.transport.commands_matching("network 10.0.0.0/8").is_empty()
    }));
    assert_eq!(h.core.get_statistics().total.routes_advertised, 1);

    h.core.withdraw_route(Protocol::Bgp, prefix("10.0.0.0/8")).unwrap();
    assert!(!h.core.get_routes().iter().any(|r| r.prefix == prefix("10.0.0.0/8")));
    assert_eq!(h.core.get_statistics().total.routes_withdrawn, 1);
    assert!(wait_until(Duration::from_secs(5), || {
        !h.transport
            .commands_matching("no network 10.0.0.0/8")
            .is_empty()
    }));

    // second withdraw is an error and leaves the table unchanged
    let routes_before = h.core.get_routes().len();
    assert!(matches!(
        h.core.withdraw_route(Protocol::Bgp, prefix("10.0.0.0/8")),
        Err(RouterError::RouteNotFound { .. })
    ));
    assert_eq!(h.core.get_routes().len(), routes_before);
    assert_eq!(h.core.get_statistics().total.routes_withdrawn, 1);
    h.core.stop().unwrap();
}

#[test]
fn removing_unknown_neighbor_is_an_error() {
    let mut cfg = base_config("rm-unknown");
    cfg.protocols.bgp = Some(bgp_section());
    let h = harness(cfg);
    h.core.start().unwrap();

    let before = h.core.get_statistics().total.neighbors_established;
    assert!(matches!(
        h.core.remove_neighbor(Protocol::Bgp, peer()),
        Err(RouterError::NeighborNotFound { .. })
    ));
    assert_eq!(h.core.get_statistics().total.neighbors_established, before);
    h.core.stop().unwrap();
}

#[test]
fn hold_expiry_fires_exactly_one_neighbor_down() {
    let mut cfg = base_config("hold-expiry");
    cfg.bridge.monitor_interval_ms = 60_000; // keep the monitor out of the way
    cfg.protocols.bgp = Some(bgp_section());
    let h = harness(cfg);

    let downs: Arc<Mutex<Vec<IpAddr>>> = Arc::default();
    let downs_cb = Arc::clone(&downs);
    h.core.set_neighbor_update_callback(Box::new(move |n, up| {
        if !up {
            downs_cb.lock().push(n.address);
        }
    }));

    h.core.start().unwrap();
    h.core
        .add_neighbor(Protocol::Bgp, peer(), &NeighborConfig::bgp(65002))
        .unwrap();
    assert!(wait_until(Duration::from_secs(5), || {
        h.core.get_statistics().total.neighbors_established == 1
    }));

    h.daemons.kill("bgpd");
    assert!(wait_until(Duration::from_secs(5), || {
        h.core
            .get_neighbors(Protocol::Bgp)
            .unwrap()
            .iter()
            .any(|n| n.state == NeighborState::Down)
    }));
    assert!(wait_until(Duration::from_secs(1), || downs.lock().len() == 1));

    // no further NeighborDown while the neighbor stays down
    std::thread::sleep(Duration::from_millis(500));
    assert_eq!(downs.lock().len(), 1);
    let total = h.core.get_statistics().total;
    assert_eq!(total.neighbors_established, 0);
    assert_eq!(total.neighbors_lost, 1);
    h.core.stop().unwrap();
}

#[test]
fn neighbor_reestablishes_when_daemon_returns() {
    let mut cfg = base_config("reestablish");
    cfg.bridge.monitor_interval_ms = 60_000;
    cfg.protocols.bgp = Some(bgp_section());
    let h = harness(cfg);
    h.core.start().unwrap();
    h.core
        .add_neighbor(Protocol::Bgp, peer(), &NeighborConfig::bgp(65002))
        .unwrap();
    assert!(wait_until(Duration::from_secs(5), || {
        h.core.get_statistics().total.neighbors_established == 1
    }));

    h.daemons.kill("bgpd");
    assert!(wait_until(Duration::from_secs(5), || {
        h.core.get_statistics().total.neighbors_established == 0
    }));

    h.daemons.revive("bgpd");
    assert!(wait_until(Duration::from_secs(5), || {
        h.core
            .get_neighbors(Protocol::Bgp)
            .unwrap()
            .iter()
            .any(|n| n.state == NeighborState::Established)
    }));
    h.core.stop().unwrap();
}

#[test]
fn disabling_running_protocol_tears_down_cleanly() {
    let mut cfg = base_config("disable");
    cfg.protocols.bgp = Some(bgp_section());
    let h = harness(cfg);

    let downs: Arc<Mutex<Vec<IpAddr>>> = Arc::default();
    let downs_cb = Arc::clone(&downs);
    h.core.set_neighbor_update_callback(Box::new(move |n, up| {
        if !up {
            downs_cb.lock().push(n.address);
        }
    }));

    h.core.start().unwrap();
    h.core
        .add_neighbor(Protocol::Bgp, peer(), &NeighborConfig::bgp(65002))
        .unwrap();
    assert!(wait_until(Duration::from_secs(5), || {
        h.core.get_statistics().total.neighbors_established == 1
    }));
    h.core
        .advertise_route(Protocol::Bgp, Route::new(prefix("10.0.0.0/8"), Protocol::Bgp))
        .unwrap();

    h.core.disable_protocol(Protocol::Bgp).unwrap();

    // no orphans: neighbor gone, routes gone, events fired
    assert!(matches!(
        h.core.get_neighbors(Protocol::Bgp),
        Err(RouterError::ProtocolNotEnabled(_))
    ));
    assert!(h.core.get_routes().is_empty());
    assert!(wait_until(Duration::from_secs(1), || downs.lock().len() == 1));
    assert!(!h
        .transport
        .commands_matching("neighbor 192.0.2.1 shutdown")
        .is_empty());
    h.core.stop().unwrap();
}

#[test]
#[traced_test]
fn daemon_crash_triggers_restart_and_reapply() {
    let mut cfg = base_config("crash-recover");
    cfg.protocols.bgp = Some(bgp_section());
    let h = harness(cfg);
    h.core.start().unwrap();
    h.core
        .add_neighbor(Protocol::Bgp, peer(), &NeighborConfig::bgp(65002))
        .unwrap();
    assert!(wait_until(Duration::from_secs(5), || {
        h.core.get_statistics().total.neighbors_established == 1
    }));

    h.daemons.kill("bgpd");
    assert!(wait_until(Duration::from_secs(5), || {
        h.daemons.restarts().iter().any(|d| d == "bgpd")
    }));
    assert!(h.core.get_statistics().bridge.daemon_restarts >= 1);

    // the restarted daemon answers hellos again, so the session returns
    assert!(wait_until(Duration::from_secs(5), || {
        h.core
            .get_neighbors(Protocol::Bgp)
            .unwrap()
            .iter()
            .any(|n| n.state == NeighborState::Established)
    }));
    h.core.stop().unwrap();
}

#[test]
#[traced_test]
fn exhausted_restart_budget_is_a_persistent_fault() {
    let mut cfg = base_config("crash-exhaust");
    cfg.bridge.max_restart_retries = 2;
    cfg.protocols.bgp = Some(bgp_section());
    let h = harness(cfg);
    h.core.start().unwrap();

    h.daemons.set_fail_restarts(true);
    h.daemons.kill("bgpd");
    assert!(wait_until(Duration::from_secs(5), || {
        h.core.get_statistics().bridge.daemon_failed
    }));
    assert!(h.core.get_statistics().bridge.daemon_restarts >= 2);
    h.core.stop().unwrap();
}

#[test]
fn stop_is_idempotent() {
    let mut cfg = base_config("stop-twice");
    cfg.protocols.bgp = Some(bgp_section());
    let h = harness(cfg);
    h.core.start().unwrap();
    assert!(h.core.is_running());
    h.core.stop().unwrap();
    assert!(!h.core.is_running());
    h.core.stop().unwrap();
}

#[test]
fn show_commands_feed_the_marker_parser() {
    let mut cfg = base_config("show-parse");
    cfg.protocols.bgp = Some(bgp_section());
    let h = harness(cfg);
    h.core.start().unwrap();
    h.core
        .add_neighbor(Protocol::Bgp, peer(), &NeighborConfig::bgp(65002))
        .unwrap();

    h.transport
        .push_response("some header\nroute added 172.16.0.0/12\n");
    let output = h.core.execute_show(Protocol::Bgp, "show bgp summary").unwrap();
    assert!(output.contains("route added"));
    assert!(wait_until(Duration::from_secs(2), || {
        h.core.get_routes().iter().any(|r| r.prefix == prefix("172.16.0.0/12"))
    }));
    assert!(h.core.get_statistics().bridge.parse_ignored >= 1);
    h.core.stop().unwrap();
}

#[test]
fn statistics_reset_clears_counters() {
    let mut cfg = base_config("stats-reset");
    cfg.protocols.bgp = Some(bgp_section());
    let h = harness(cfg);
    h.core.start().unwrap();
    h.core
        .advertise_route(Protocol::Bgp, Route::new(prefix("10.9.0.0/16"), Protocol::Bgp))
        .unwrap();
    assert_eq!(h.core.get_statistics().total.routes_advertised, 1);

    h.core.reset_statistics();
    assert_eq!(h.core.get_statistics().total.routes_advertised, 0);
    h.core.stop().unwrap();
}

#[test]
fn update_config_rebuilds_running_protocols() {
    let mut cfg = base_config("reconfig");
    cfg.protocols.bgp = Some(bgp_section());
    let h = harness(cfg);
    h.core.start().unwrap();
    h.core
        .add_neighbor(Protocol::Bgp, peer(), &NeighborConfig::bgp(65002))
        .unwrap();
    assert!(wait_until(Duration::from_secs(5), || {
        h.core.get_statistics().total.neighbors_established == 1
    }));

    let mut updated = base_config("reconfig");
    updated.protocols.bgp =
        Some(BgpConfig::new(65010, Ipv4Addr::new(10, 0, 0, 2)).set_timers(50, 200));
    h.core.update_config(updated).unwrap();

    assert!(h.core.is_running());
    assert!(h.core.enabled_protocols().contains(&Protocol::Bgp));
    // the rebuilt instance starts with a clean neighbor set
    assert!(h.core.get_neighbors(Protocol::Bgp).unwrap().is_empty());
    let conf = std::fs::read_to_string(scratch_dir("reconfig").join("bgpd.conf")).unwrap();
    assert!(conf.contains("router bgp 65010"));
    h.core.stop().unwrap();
}

#[test]
fn disabling_never_started_protocol_leaves_no_orphans() {
    let mut cfg = base_config("disable-cold");
    cfg.protocols.bgp = Some(bgp_section());
    let h = harness(cfg);
    h.core
        .add_neighbor(Protocol::Bgp, peer(), &NeighborConfig::bgp(65002))
        .unwrap();
    h.core
        .advertise_route(Protocol::Bgp, Route::new(prefix("10.0.0.0/8"), Protocol::Bgp))
        .unwrap();
    assert_eq!(h.core.get_routes().len(), 1);

    h.core.disable_protocol(Protocol::Bgp).unwrap();
    assert!(h.core.get_routes().is_empty());
    assert!(matches!(
        h.core.get_neighbors(Protocol::Bgp),
        Err(RouterError::ProtocolNotEnabled(Protocol::Bgp))
    ));
}

#[test]
fn per_neighbor_hello_timers_pace_each_adjacency() {
    let mut cfg = base_config("per-peer-timers");
    cfg.protocols.bgp = Some(bgp_section());
    let h = harness(cfg);
    h.core.start().unwrap();

    let slow = IpAddr::from_str("192.0.2.2").unwrap();
    h.core
        .add_neighbor(Protocol::Bgp, peer(), &NeighborConfig::bgp(65002))
        .unwrap();
    h.core
        .add_neighbor(
            Protocol::Bgp,
            slow,
            &NeighborConfig::bgp(65003).set_timers(400, 2000),
        )
        .unwrap();

    // the default-paced peer establishes long before the slow one can
    assert!(wait_until(Duration::from_secs(10), || {
        h.core
            .get_neighbors(Protocol::Bgp)
            .unwrap()
            .iter()
            .any(|n| n.address == peer() && n.state == NeighborState::Established)
    }));
    let neighbors = h.core.get_neighbors(Protocol::Bgp).unwrap();
    let laggard = neighbors
        .iter()
        .find(|n| n.address == slow)
        .expect("slow peer present");
    assert_ne!(laggard.state, NeighborState::Established);
    assert!(laggard.messages_sent < 4);
    h.core.stop().unwrap();
}
