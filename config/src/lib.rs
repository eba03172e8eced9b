// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Configuration model for the router simulator.
//!
//! The model is split in two: the router-level configuration (hostname,
//! interfaces, bridge settings) and the per-protocol routing configurations
//! under [`routing`]. All of it can be loaded from a single YAML file.

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

mod errors;
mod interface;
mod protocol;
mod router;
pub mod routing;

pub use errors::{ConfigError, ConfigResult};
pub use interface::InterfaceConfig;
pub use protocol::Protocol;
pub use router::{BridgeConfig, ProtocolsConfig, RouterConfig, TransportKind};
