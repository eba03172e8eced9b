// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! OSPF handler

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use config::Protocol;
use config::routing::{NeighborConfig, OspfConfig};
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

/// Adjacency sequence from down to full, every state mandatory.
const SEQUENCE: &[NeighborState] = &[
    NeighborState::Down,
    NeighborState::Init,
    NeighborState::TwoWay,
    NeighborState::ExStart,
    NeighborState::Exchange,
    NeighborState::Loading,
    NeighborState::Full,
];

struct OspfFlavor {
    cfg: OspfConfig,
}

impl Flavor for OspfFlavor {
    fn protocol(&self) -> Protocol {
        Protocol::Ospf
    }

    fn sequence(&self) -> &'static [NeighborState] {
        SEQUENCE
    }

    fn default_hello(&self) -> Duration {
        Duration::from_millis(self.cfg.hello_interval_ms)
    }

    fn default_hold(&self) -> Duration {
        Duration::from_millis(self.cfg.dead_interval_ms)
    }

    fn peer_params(&self, cfg: &NeighborConfig) -> Result<PeerParams, RouterError> {
        // neighbors default into the instance's area
        let area = cfg.area.clone().unwrap_or_else(|| self.cfg.area.clone());
        Ok(PeerParams::Ospf { area })
    }

    fn render_config(&self) -> ConfigBuilder {
        self.cfg.render(&())
    }

    fn neighbor_add_command(&self, neighbor: &Neighbor) -> Option<String> {
        Some(format!("router ospf\n neighbor {}", neighbor.address))
    }

    fn neighbor_remove_command(&self, neighbor: &Neighbor) -> Option<String> {
        Some(format!("router ospf\n no neighbor {}", neighbor.address))
    }

    fn update_command(&self, route: &Route, _neighbor: &Neighbor) -> String {
        format!(
            "router ospf\n network {} area {}",
            route.prefix, self.cfg.area
        )
    }

    fn withdraw_command(&self, route: &Route, _neighbor: &Neighbor) -> String {
        format!(
            "router ospf\n no network {} area {}",
            route.prefix, self.cfg.area
        )
    }

    fn going_down_command(&self, neighbor: &Neighbor) -> Option<String> {
        Some(format!("clear ip ospf neighbor {}", neighbor.address))
    }

    fn background_interval(&self) -> Duration {
        Duration::from_millis(self.cfg.spf_interval_ms)
    }

    /// Periodic SPF recomputation over the instance's current routes.
    fn background_tick(&self, ctx: &WorkerCtx) {
        let routes = ctx.routes.list_protocol(Protocol::Ospf);
        debug!(
            "ospf: SPF recomputed over {} routes, {} full adjacencies",
            routes.len(),
            ctx.established().len()
        );
    }
}

pub struct OspfHandler {
    worker: Worker,
}

impl OspfHandler {
    pub fn new(
        cfg: OspfConfig,
        routes: Arc<RouteTable>,
        neighbors: Arc<NeighborTable>,
        stats: Arc<StatsRegistry>,
        bridge: Arc<FrrBridge>,
        events: EventSender,
    ) -> Result<Self, RouterError> {
        cfg.validate()?;
        Ok(Self {
            worker: Worker::new(
                Box::new(OspfFlavor { cfg }),
                routes,
                neighbors,
                stats,
                bridge,
                events,
            ),
        })
    }
}

impl ProtocolHandler for OspfHandler {
    fn protocol(&self) -> Protocol {
        Protocol::Ospf
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

    #[test]
    fn neighbor_inherits_instance_area() {
        let f = OspfFlavor {
            cfg: OspfConfig::new(Ipv4Addr::new(10, 0, 0, 2)).set_area("0.0.0.5"),
        };
        let params = f.peer_params(&NeighborConfig::default()).unwrap();
        assert_eq!(
            params,
            PeerParams::Ospf {
                area: "0.0.0.5".to_owned()
            }
        );
    }

    #[test]
    fn update_command_carries_area() {
        let f = OspfFlavor {
            cfg: OspfConfig::new(Ipv4Addr::new(10, 0, 0, 2)),
        };
        let route = Route::new(IpNet::from_str("10.0.0.0/8").unwrap(), Protocol::Ospf);
        let n = Neighbor::new(
            IpAddr::from_str("192.0.2.1").unwrap(),
            Protocol::Ospf,
            PeerParams::Ospf {
                area: "0.0.0.0".to_owned(),
            },
            NeighborState::Down,
            &NeighborConfig::default(),
            Duration::from_secs(1),
            Duration::from_secs(3),
        );
        assert_eq!(
            f.update_command(&route, &n),
            "router ospf\n network 10.0.0.0/8 area 0.0.0.0"
        );
    }
}
