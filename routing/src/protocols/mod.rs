// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Protocol handlers.
//!
//! BGP, OSPF and IS-IS share one worker engine ([`worker`]); each protocol
//! supplies its state sequence, command templates and config stanza. The
//! common contract is [`ProtocolHandler`].

pub mod bgp;
pub mod isis;
pub mod ospf;
pub(crate) mod worker;

use std::net::IpAddr;

use config::routing::NeighborConfig;
use ipnet::IpNet;

use crate::errors::RouterError;
use crate::neighbors::Neighbor;
use crate::rib::Route;
use crate::stats::ProtocolStats;
use config::Protocol;

pub use bgp::BgpHandler;
pub use isis::IsisHandler;
pub use ospf::OspfHandler;

/// The polymorphic contract every protocol handler implements.
pub trait ProtocolHandler: Send + Sync {
    fn protocol(&self) -> Protocol;

    /// Apply the protocol's configuration to the suite and spawn the
    /// handler's worker loops. Idempotent.
    fn start(&self) -> Result<(), RouterError>;

    /// Tear down adjacencies gracefully, stop the worker loops and remove
    /// the protocol's entries from the shared tables. Idempotent.
    fn stop(&self) -> Result<(), RouterError>;

    fn is_running(&self) -> bool;

    /// Register a neighbor and, if running, announce it to the suite.
    fn add_neighbor(&self, address: IpAddr, cfg: &NeighborConfig) -> Result<(), RouterError>;

    /// Remove a neighbor. Unknown addresses are an error, not a no-op.
    fn remove_neighbor(&self, address: IpAddr) -> Result<(), RouterError>;

    fn get_neighbors(&self) -> Vec<Neighbor>;

    /// Store a route and queue per-neighbor update commands.
    fn advertise_route(&self, route: Route) -> Result<(), RouterError>;

    /// Withdraw a previously advertised route. Absent keys are an error so
    /// callers can tell "withdrew" from "nothing to withdraw".
    fn withdraw_route(&self, prefix: IpNet) -> Result<(), RouterError>;

    fn get_routes(&self) -> Vec<Route>;

    fn get_statistics(&self) -> ProtocolStats;
}
