// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Top-level router configuration and YAML loading

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::errors::{ConfigError, ConfigResult};
use crate::interface::InterfaceConfig;
use crate::routing::{BgpConfig, IsisConfig, OspfConfig};

/// How the bridge talks to the control-plane suite.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Shell out to the suite's interactive vty shell.
    #[default]
    Vtysh,
    /// Structured line exchange over a local unix socket.
    Socket,
}

fn default_hostname() -> String {
    "router-sim".to_owned()
}
fn default_config_dir() -> String {
    "/etc/frr".to_owned()
}
fn default_vtysh_path() -> String {
    "/usr/bin/vtysh".to_owned()
}
fn default_socket_path() -> String {
    "/var/run/frr/vtysh.sock".to_owned()
}
fn default_command_timeout() -> u64 {
    3_000
}
fn default_monitor_interval() -> u64 {
    5_000
}
fn default_restart_retries() -> u32 {
    3
}

/// Settings for the control-plane bridge and its daemon supervision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub transport: TransportKind,
    #[serde(default = "default_config_dir")]
    pub config_dir: String,
    #[serde(default = "default_vtysh_path")]
    pub vtysh_path: String,
    #[serde(default = "default_socket_path")]
    pub socket_path: String,
    /// Access password written into generated configuration files.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_command_timeout")]
    pub command_timeout_ms: u64,
    /// Daemon liveness poll interval.
    #[serde(default = "default_monitor_interval")]
    pub monitor_interval_ms: u64,
    /// Restart attempts before a dead daemon becomes a persistent fault.
    #[serde(default = "default_restart_retries")]
    pub max_restart_retries: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            config_dir: default_config_dir(),
            vtysh_path: default_vtysh_path(),
            socket_path: default_socket_path(),
            password: None,
            command_timeout_ms: default_command_timeout(),
            monitor_interval_ms: default_monitor_interval(),
            max_restart_retries: default_restart_retries(),
        }
    }
}

/// The set of protocol instances to run. Absent entries are disabled.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolsConfig {
    #[serde(default)]
    pub bgp: Option<BgpConfig>,
    #[serde(default)]
    pub ospf: Option<OspfConfig>,
    #[serde(default)]
    pub isis: Option<IsisConfig>,
}

/// Full router configuration, typically loaded from a YAML file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default = "default_hostname")]
    pub hostname: String,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub interfaces: Vec<InterfaceConfig>,
    #[serde(default)]
    pub protocols: ProtocolsConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            bridge: BridgeConfig::default(),
            interfaces: Vec::new(),
            protocols: ProtocolsConfig::default(),
        }
    }
}

impl RouterConfig {
    /// Load and validate a configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailure {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config = Self::from_yaml(&text)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a configuration from YAML text.
    pub fn from_yaml(text: &str) -> ConfigResult<Self> {
        let config: RouterConfig = serde_yaml_ng::from_str(text)
            .map_err(|e| ConfigError::ParseFailure(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section. Fails on the first missing or invalid
    /// required parameter; protocols never start with a bad config.
    pub fn validate(&self) -> ConfigResult {
        for iface in &self.interfaces {
            iface.validate()?;
        }
        if let Some(bgp) = &self.protocols.bgp {
            bgp.validate()?;
        }
        if let Some(ospf) = &self.protocols.ospf {
            ospf.validate()?;
        }
        if let Some(isis) = &self.protocols.isis {
            isis.validate()?;
        }
        Ok(())
    }
}
