// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Per-protocol routing configuration models

pub mod bgp;
pub mod isis;
pub mod neighbor;
pub mod ospf;

pub use bgp::BgpConfig;
pub use isis::{IsisConfig, IsisLevel};
pub use neighbor::NeighborConfig;
pub use ospf::OspfConfig;

/// Default hello interval, in milliseconds.
pub const DEFAULT_HELLO_INTERVAL_MS: u64 = 1_000;
/// Default hold time, in milliseconds. A neighbor that stays silent for
/// longer than this is declared down.
pub const DEFAULT_HOLD_TIME_MS: u64 = 3_000;
