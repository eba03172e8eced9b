// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Routing configuration model: IS-IS

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::errors::{ConfigError, ConfigResult};
use crate::protocol::Protocol;
use crate::routing::{DEFAULT_HELLO_INTERVAL_MS, DEFAULT_HOLD_TIME_MS};

fn default_hello() -> u64 {
    DEFAULT_HELLO_INTERVAL_MS
}
fn default_hold() -> u64 {
    DEFAULT_HOLD_TIME_MS
}
fn default_tag() -> String {
    "core".to_owned()
}

/// IS level of the instance, rendered as `is-type level-<n>`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum IsisLevel {
    #[strum(serialize = "level-1")]
    #[serde(rename = "level-1")]
    Level1,
    #[strum(serialize = "level-2")]
    #[serde(rename = "level-2")]
    Level2,
    #[default]
    #[strum(serialize = "level-1-2")]
    #[serde(rename = "level-1-2")]
    Level12,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsisConfig {
    /// Network entity title (NSAP), e.g. `49.0001.1921.6800.1001.00`. Required.
    pub net: Option<String>,
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub level: IsisLevel,
    /// Interfaces running IS-IS, by name.
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default = "default_hello")]
    pub hello_interval_ms: u64,
    #[serde(default = "default_hold")]
    pub hold_time_ms: u64,
    /// CSNP refresh interval for the background loop.
    #[serde(default = "default_hold")]
    pub csnp_interval_ms: u64,
}

impl IsisConfig {
    #[must_use]
    pub fn new<T: Into<String>>(net: T) -> Self {
        Self {
            net: Some(net.into()),
            tag: default_tag(),
            level: IsisLevel::default(),
            interfaces: Vec::new(),
            hello_interval_ms: default_hello(),
            hold_time_ms: default_hold(),
            csnp_interval_ms: default_hold(),
        }
    }

    #[must_use]
    pub fn set_level(mut self, level: IsisLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn add_interface<T: Into<String>>(mut self, name: T) -> Self {
        self.interfaces.push(name.into());
        self
    }

    pub fn validate(&self) -> ConfigResult {
        let Some(net) = self.net.as_ref() else {
            return Err(ConfigError::MissingParameter {
                protocol: Protocol::Isis,
                parameter: "net",
            });
        };
        // NSAPs are dotted hex groups starting with an AFI and ending in .00
        let well_formed = net.split('.').count() >= 3
            && net
                .chars()
                .all(|c| c.is_ascii_hexdigit() || c == '.')
            && net.ends_with(".00");
        if !well_formed {
            return Err(ConfigError::InvalidParameter {
                protocol: Protocol::Isis,
                parameter: "net",
                reason: format!("'{net}' is not a valid network entity title"),
            });
        }
        Ok(())
    }
}
