// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! IS-IS handler

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use config::Protocol;
use config::routing::{IsisConfig, IsisLevel, NeighborConfig};
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

const SEQUENCE: &[NeighborState] = &[
    NeighborState::Down,
    NeighborState::Init,
    NeighborState::Up,
];

fn level_number(level: IsisLevel) -> u8 {
    match level {
        IsisLevel::Level1 => 1,
        IsisLevel::Level2 => 2,
        IsisLevel::Level12 => 3,
    }
}

struct IsisFlavor {
    cfg: IsisConfig,
}

impl Flavor for IsisFlavor {
    fn protocol(&self) -> Protocol {
        Protocol::Isis
    }

    fn sequence(&self) -> &'static [NeighborState] {
        SEQUENCE
    }

    fn default_hello(&self) -> Duration {
        Duration::from_millis(self.cfg.hello_interval_ms)
    }

    fn default_hold(&self) -> Duration {
        Duration::from_millis(self.cfg.hold_time_ms)
    }

    fn peer_params(&self, cfg: &NeighborConfig) -> Result<PeerParams, RouterError> {
        let level = cfg.level.unwrap_or_else(|| level_number(self.cfg.level));
        Ok(PeerParams::Isis { level })
    }

    fn render_config(&self) -> ConfigBuilder {
        self.cfg.render(&())
    }

    // IS-IS adjacencies are discovered on circuits, not configured per peer
    fn neighbor_add_command(&self, _neighbor: &Neighbor) -> Option<String> {
        None
    }

    fn neighbor_remove_command(&self, _neighbor: &Neighbor) -> Option<String> {
        None
    }

    fn update_command(&self, route: &Route, _neighbor: &Neighbor) -> String {
        format!("router isis {}\n network {}", self.cfg.tag, route.prefix)
    }

    fn withdraw_command(&self, route: &Route, _neighbor: &Neighbor) -> String {
        format!("router isis {}\n no network {}", self.cfg.tag, route.prefix)
    }

    fn going_down_command(&self, neighbor: &Neighbor) -> Option<String> {
        Some(format!("clear isis neighbor {}", neighbor.address))
    }

    fn background_interval(&self) -> Duration {
        Duration::from_millis(self.cfg.csnp_interval_ms)
    }

    /// Periodic CSNP refresh toward every up adjacency.
    fn background_tick(&self, ctx: &WorkerCtx) {
        for neighbor in ctx.established() {
            ctx.neighbors.with_neighbor(&neighbor.key(), |n| {
                n.messages_sent += 1;
            });
        }
    }
}

pub struct IsisHandler {
    worker: Worker,
}

impl IsisHandler {
    pub fn new(
        cfg: IsisConfig,
        routes: Arc<RouteTable>,
        neighbors: Arc<NeighborTable>,
        stats: Arc<StatsRegistry>,
        bridge: Arc<FrrBridge>,
        events: EventSender,
    ) -> Result<Self, RouterError> {
        cfg.validate()?;
        Ok(Self {
            worker: Worker::new(
                Box::new(IsisFlavor { cfg }),
                routes,
                neighbors,
                stats,
                bridge,
                events,
            ),
        })
    }
}

impl ProtocolHandler for IsisHandler {
    fn protocol(&self) -> Protocol {
        Protocol::Isis
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

    #[test]
    fn neighbor_level_defaults_to_instance_level() {
        let f = IsisFlavor {
            cfg: IsisConfig::new("49.0001.1921.6800.1001.00").set_level(IsisLevel::Level2),
        };
        assert_eq!(
            f.peer_params(&NeighborConfig::default()).unwrap(),
            PeerParams::Isis { level: 2 }
        );
        let explicit = NeighborConfig {
            level: Some(1),
            ..NeighborConfig::default()
        };
        assert_eq!(
            f.peer_params(&explicit).unwrap(),
            PeerParams::Isis { level: 1 }
        );
    }
}
