// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! BGP handler

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use config::routing::{BgpConfig, NeighborConfig};
use config::{ConfigError, Protocol};
use ipnet::IpNet;

use crate::errors::RouterError;
use crate::event::EventSender;
use crate::frr::bridge::FrrBridge;
use crate::frr::renderer::builder::{ConfigBuilder, Render};
use crate::neighbors::{Neighbor, NeighborState, NeighborTable, PeerParams};
use crate::protocols::ProtocolHandler;
use crate::protocols::worker::{Flavor, Worker, WorkerCtx};
use crate::rib::{Route, RouteTable};
use crate::stats::{ProtocolStats, StatsRegistry};

#[allow(unused)]
use tracing::{debug, error, info};

/// Session sequence from idle to established.
const SEQUENCE: &[NeighborState] = &[
    NeighborState::Idle,
    NeighborState::Connect,
    NeighborState::OpenSent,
    NeighborState::OpenConfirm,
    NeighborState::Established,
];

struct BgpFlavor {
    cfg: BgpConfig,
}

impl Flavor for BgpFlavor {
    fn protocol(&self) -> Protocol {
        Protocol::Bgp
    }

    fn sequence(&self) -> &'static [NeighborState] {
        SEQUENCE
    }

    fn default_hello(&self) -> Duration {
        Duration::from_millis(self.cfg.keepalive_interval_ms)
    }

    fn default_hold(&self) -> Duration {
        Duration::from_millis(self.cfg.hold_time_ms)
    }

    fn peer_params(&self, cfg: &NeighborConfig) -> Result<PeerParams, RouterError> {
        let Some(remote_as) = cfg.remote_as else {
            return Err(ConfigError::MissingParameter {
                protocol: Protocol::Bgp,
                parameter: "remote_as",
            }
            .into());
        };
        Ok(PeerParams::Bgp { remote_as })
    }

    fn render_config(&self) -> ConfigBuilder {
        self.cfg.render(&())
    }

    fn neighbor_add_command(&self, neighbor: &Neighbor) -> Option<String> {
        let PeerParams::Bgp { remote_as } = &neighbor.params else {
            return None;
        };
        Some(format!(
            "router bgp {}\n neighbor {} remote-as {remote_as}",
            self.cfg.local_as, neighbor.address
        ))
    }

    fn neighbor_remove_command(&self, neighbor: &Neighbor) -> Option<String> {
        Some(format!(
            "router bgp {}\n no neighbor {}",
            self.cfg.local_as, neighbor.address
        ))
    }

    fn update_command(&self, route: &Route, _neighbor: &Neighbor) -> String {
        format!("router bgp {}\n network {}", self.cfg.local_as, route.prefix)
    }

    fn withdraw_command(&self, route: &Route, _neighbor: &Neighbor) -> String {
        format!(
            "router bgp {}\n no network {}",
            self.cfg.local_as, route.prefix
        )
    }

    fn going_down_command(&self, neighbor: &Neighbor) -> Option<String> {
        Some(format!(
            "router bgp {}\n neighbor {} shutdown",
            self.cfg.local_as, neighbor.address
        ))
    }

    fn background_interval(&self) -> Duration {
        Duration::from_millis(self.cfg.keepalive_interval_ms)
    }

    /// Periodic keepalive toward every established session.
    fn background_tick(&self, ctx: &WorkerCtx) {
        for neighbor in ctx.established() {
            ctx.neighbors.with_neighbor(&neighbor.key(), |n| {
                n.messages_sent += 1;
            });
        }
    }
}

pub struct BgpHandler {
    worker: Worker,
}

impl BgpHandler {
    pub fn new(
        cfg: BgpConfig,
        routes: Arc<RouteTable>,
        neighbors: Arc<NeighborTable>,
        stats: Arc<StatsRegistry>,
        bridge: Arc<FrrBridge>,
        events: EventSender,
    ) -> Result<Self, RouterError> {
        cfg.validate()?;
        Ok(Self {
            worker: Worker::new(
                Box::new(BgpFlavor { cfg }),
                routes,
                neighbors,
                stats,
                bridge,
                events,
            ),
        })
    }
}

impl ProtocolHandler for BgpHandler {
    fn protocol(&self) -> Protocol {
        Protocol::Bgp
    }

    fn start(&self) -> Result<(), RouterError> {
        self.worker.start()
    }

    fn stop(&self) -> Result<(), RouterError> {
        self.worker.stop()
    }

    fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    fn add_neighbor(&self, address: IpAddr, cfg: &NeighborConfig) -> Result<(), RouterError> {
        self.worker.add_neighbor(address, cfg)
    }

    fn remove_neighbor(&self, address: IpAddr) -> Result<(), RouterError> {
        self.worker.remove_neighbor(address)
    }

    fn get_neighbors(&self) -> Vec<Neighbor> {
        self.worker.get_neighbors()
    }

    fn advertise_route(&self, route: Route) -> Result<(), RouterError> {
        self.worker.advertise_route(route)
    }

    fn withdraw_route(&self, prefix: IpNet) -> Result<(), RouterError> {
        self.worker.withdraw_route(prefix)
    }

    fn get_routes(&self) -> Vec<Route> {
        self.worker.get_routes()
    }

    fn get_statistics(&self) -> ProtocolStats {
        self.worker.get_statistics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    fn flavor() -> BgpFlavor {
        BgpFlavor {
            cfg: BgpConfig::new(65001, Ipv4Addr::new(10, 0, 0, 1)),
        }
    }

    fn neighbor() -> Neighbor {
        Neighbor::new(
            IpAddr::from_str("192.0.2.1").unwrap(),
            Protocol::Bgp,
            PeerParams::Bgp { remote_as: 65002 },
            NeighborState::Idle,
            &NeighborConfig::bgp(65002),
            Duration::from_secs(1),
            Duration::from_secs(3),
        )
    }

    #[test]
    fn neighbor_requires_remote_as() {
        let missing = NeighborConfig::default();
        assert!(flavor().peer_params(&missing).is_err());
        assert_eq!(
            flavor().peer_params(&NeighborConfig::bgp(65002)).unwrap(),
            PeerParams::Bgp { remote_as: 65002 }
        );
    }

    #[test]
    fn commands_carry_local_as_context() {
        let f = flavor();
        let n = neighbor();
        assert_eq!(
            f.neighbor_add_command(&n).unwrap(),
            "router bgp 65001\n neighbor 192.0.2.1 remote-as 65002"
        );
        let route = Route::new(IpNet::from_str("10.0.0.0/8").unwrap(), Protocol::Bgp);
        assert_eq!(
            f.update_command(&route, &n),
            "router bgp 65001\n network 10.0.0.0/8"
        );
        assert_eq!(
            f.withdraw_command(&route, &n),
            "router bgp 65001\n no network 10.0.0.0/8"
        );
    }
}
