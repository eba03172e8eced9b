// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Per-neighbor configuration, shared by all protocols

use serde::{Deserialize, Serialize};

/// Parameters supplied when adding a neighbor. Which fields are required
/// depends on the owning protocol: BGP needs `remote_as`, OSPF uses `area`,
/// IS-IS uses `level`. Timer overrides apply to any protocol.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborConfig {
    #[serde(default)]
    pub remote_as: Option<u32>,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub level: Option<u8>,
    #[serde(default)]
    pub hello_interval_ms: Option<u64>,
    #[serde(default)]
    pub hold_time_ms: Option<u64>,
}

impl NeighborConfig {
    #[must_use]
    pub fn bgp(remote_as: u32) -> Self {
        Self {
            remote_as: Some(remote_as),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn set_timers(mut self, hello_ms: u64, hold_ms: u64) -> Self {
        self.hello_interval_ms = Some(hello_ms);
        self.hold_time_ms = Some(hold_ms);
        self
    }
}
