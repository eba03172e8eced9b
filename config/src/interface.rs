// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Interface configuration

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::errors::{ConfigError, ConfigResult};

fn default_mtu() -> u32 {
    1500
}
fn default_enabled() -> bool {
    true
}

/// Configuration for a router interface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceConfig {
    pub name: String,
    pub address: IpAddr,
    pub prefix_len: u8,
    #[serde(default = "default_mtu")]
    pub mtu: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl InterfaceConfig {
    #[must_use]
    pub fn new(name: &str, address: IpAddr, prefix_len: u8) -> Self {
        Self {
            name: name.to_owned(),
            address,
            prefix_len,
            mtu: default_mtu(),
            enabled: default_enabled(),
        }
    }

    /// The connected network of this interface.
    pub fn network(&self) -> ConfigResult<IpNet> {
        IpNet::new(self.address, self.prefix_len).map_err(|e| ConfigError::InvalidInterface {
            name: self.name.clone(),
            reason: e.to_string(),
        })
    }

    pub fn validate(&self) -> ConfigResult {
        if self.name.is_empty() {
            return Err(ConfigError::InvalidInterface {
                name: self.name.clone(),
                reason: "empty name".to_owned(),
            });
        }
        let max_len = match self.address {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if self.prefix_len > max_len {
            return Err(ConfigError::InvalidInterface {
                name: self.name.clone(),
                reason: format!("prefix length {} exceeds {max_len}", self.prefix_len),
            });
        }
        Ok(())
    }
}
