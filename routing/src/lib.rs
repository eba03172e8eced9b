// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! The routing control-plane engine: per-protocol neighbor state machines,
//! the shared route/neighbor/statistics tables, and the bridge that drives
//! the external routing suite.

#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::similar_names,
    clippy::struct_field_names,
    clippy::collapsible_if,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

mod errors;
mod event;
pub mod frr;
mod interfaces;
mod neighbors;
pub mod protocols;
mod rib;
mod router;
mod stats;

#[cfg(feature = "testing")]
pub mod testing;

// re-exports
pub use config::Protocol;
pub use errors::RouterError;
pub use event::{
    EventDispatcher, EventKind, EventSender, NeighborCallback, ProtocolEvent, RouteCallback,
};
pub use frr::bridge::{FrrBridge, FrrParams};
pub use frr::daemon::{DaemonControl, SystemdDaemonControl};
pub use frr::renderer::builder::{ConfigBuilder, Render};
pub use frr::transport::{SocketTransport, Transport, VtyshTransport};
pub use interfaces::iftable::IfTable;
pub use interfaces::interface::Interface;
pub use neighbors::{Neighbor, NeighborKey, NeighborState, NeighborTable, PeerParams};
pub use protocols::{BgpHandler, IsisHandler, OspfHandler, ProtocolHandler};
pub use rib::{Route, RouteKey, RouteTable};
pub use router::{ProtocolConfig, RouterCore, RouterParams, RouterParamsBuilder};
pub use stats::{BridgeStats, ProtocolStats, StatsRegistry, StatsSnapshot};
