// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Network interface model

use config::InterfaceConfig;
use std::net::IpAddr;

#[allow(unused)]
use tracing::{debug, error, info};

/// An object representing a router interface. Owned exclusively by the
/// router core; protocol handlers refer to interfaces by name only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub address: IpAddr,
    pub prefix_len: u8,
    pub mtu: u32,
    pub enabled: bool,
}

impl Interface {
    #[must_use]
    pub(crate) fn new(config: &InterfaceConfig) -> Self {
        Interface {
            name: config.name.clone(),
            address: config.address,
            prefix_len: config.prefix_len,
            mtu: config.mtu,
            enabled: config.enabled,
        }
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            info!(
                "Interface {} is now {}",
                self.name,
                if enabled { "enabled" } else { "disabled" }
            );
            self.enabled = enabled;
        }
    }
}
