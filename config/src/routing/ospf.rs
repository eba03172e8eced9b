// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Routing configuration model: OSPF

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

use crate::errors::{ConfigError, ConfigResult};
use crate::protocol::Protocol;
use crate::routing::{DEFAULT_HELLO_INTERVAL_MS, DEFAULT_HOLD_TIME_MS};

fn default_hello() -> u64 {
    DEFAULT_HELLO_INTERVAL_MS
}
fn default_dead() -> u64 {
    DEFAULT_HOLD_TIME_MS
}
fn default_area() -> String {
    "0.0.0.0".to_owned()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OspfConfig {
    /// OSPF router id. Required.
    pub router_id: Option<Ipv4Addr>,
    /// Backbone or stub area this instance participates in.
    #[serde(default = "default_area")]
    pub area: String,
    /// Interfaces running OSPF, by name.
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default = "default_hello")]
    pub hello_interval_ms: u64,
    #[serde(default = "default_dead")]
    pub dead_interval_ms: u64,
    /// SPF recomputation interval.
    #[serde(default = "default_dead")]
    pub spf_interval_ms: u64,
}

impl OspfConfig {
    #[must_use]
    pub fn new(router_id: Ipv4Addr) -> Self {
        Self {
            router_id: Some(router_id),
            area: default_area(),
            interfaces: Vec::new(),
            hello_interval_ms: default_hello(),
            dead_interval_ms: default_dead(),
            spf_interval_ms: default_dead(),
        }
    }

    #[must_use]
    pub fn set_area<T: Into<String>>(mut self, area: T) -> Self {
        self.area = area.into();
        self
    }

    #[must_use]
    pub fn add_interface<T: Into<String>>(mut self, name: T) -> Self {
        self.interfaces.push(name.into());
        self
    }

    pub fn validate(&self) -> ConfigResult {
        if self.router_id.is_none() {
            return Err(ConfigError::MissingParameter {
                protocol: Protocol::Ospf,
                parameter: "router_id",
            });
        }
        if self.area.parse::<Ipv4Addr>().is_err() {
            return Err(ConfigError::InvalidParameter {
                protocol: Protocol::Ospf,
                parameter: "area",
                reason: format!("'{}' is not a dotted-quad area id", self.area),
            });
        }
        if self.dead_interval_ms <= self.hello_interval_ms {
            return Err(ConfigError::InvalidParameter {
                protocol: Protocol::Ospf,
                parameter: "dead_interval_ms",
                reason: "dead interval must exceed the hello interval".to_owned(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ospf_config_validates_area() {
        let cfg = OspfConfig::new(Ipv4Addr::new(1, 1, 1, 1)).set_area("backbone");
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidParameter { parameter: "area", .. })
        ));
        let cfg = OspfConfig::new(Ipv4Addr::new(1, 1, 1, 1)).set_area("0.0.0.0");
        assert!(cfg.validate().is_ok());
    }
}
