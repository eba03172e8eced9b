// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Routing configuration model: BGP

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

use crate::errors::{ConfigError, ConfigResult};
use crate::protocol::Protocol;
use crate::routing::{DEFAULT_HELLO_INTERVAL_MS, DEFAULT_HOLD_TIME_MS};

fn default_keepalive() -> u64 {
    DEFAULT_HELLO_INTERVAL_MS
}
fn default_hold() -> u64 {
    DEFAULT_HOLD_TIME_MS
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BgpConfig {
    /// Local autonomous system number. Required, must be non-zero.
    pub local_as: u32,
    /// BGP router id. Required.
    pub router_id: Option<Ipv4Addr>,
    #[serde(default = "default_keepalive")]
    pub keepalive_interval_ms: u64,
    #[serde(default = "default_hold")]
    pub hold_time_ms: u64,
    #[serde(default)]
    pub graceful_restart: bool,
}

impl BgpConfig {
    #[must_use]
    pub fn new(local_as: u32, router_id: Ipv4Addr) -> Self {
        Self {
            local_as,
            router_id: Some(router_id),
            keepalive_interval_ms: default_keepalive(),
            hold_time_ms: default_hold(),
            graceful_restart: false,
        }
    }

    #[must_use]
    pub fn set_graceful_restart(mut self, value: bool) -> Self {
        self.graceful_restart = value;
        self
    }

    #[must_use]
    pub fn set_timers(mut self, keepalive_ms: u64, hold_ms: u64) -> Self {
        self.keepalive_interval_ms = keepalive_ms;
        self.hold_time_ms = hold_ms;
        self
    }

    pub fn validate(&self) -> ConfigResult {
        if self.local_as == 0 {
            return Err(ConfigError::MissingParameter {
                protocol: Protocol::Bgp,
                parameter: "local_as",
            });
        }
        if self.router_id.is_none() {
            return Err(ConfigError::MissingParameter {
                protocol: Protocol::Bgp,
                parameter: "router_id",
            });
        }
        if self.hold_time_ms <= self.keepalive_interval_ms {
            return Err(ConfigError::InvalidParameter {
                protocol: Protocol::Bgp,
                parameter: "hold_time_ms",
                reason: "hold time must exceed the keepalive interval".to_owned(),
            });
        }
        Ok(())
    }
}
