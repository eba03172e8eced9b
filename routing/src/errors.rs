// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Errors produced by the routing engine

use config::Protocol;
use ipnet::IpNet;
use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("no such interface '{0}'")]
    NoSuchInterface(String),

    #[error("{protocol}: no such neighbor {address}")]
    NeighborNotFound { protocol: Protocol, address: IpAddr },

    #[error("{protocol}: no such route {prefix}")]
    RouteNotFound { protocol: Protocol, prefix: IpNet },

    #[error("protocol {0} is not enabled")]
    ProtocolNotEnabled(Protocol),

    #[error("protocol {0} is not running")]
    ProtocolNotRunning(Protocol),

    #[error("command failed: {command}: {output}")]
    Command { command: String, output: String },

    #[error("command timed out after {timeout:?}: {command}")]
    CommandTimeout { command: String, timeout: Duration },

    #[error("daemon '{daemon}' unreachable: {reason}")]
    Daemon { daemon: String, reason: String },

    #[error("unrecognized suite output: {0}")]
    Parse(String),

    #[error("thread '{0}' did not stop within the shutdown deadline")]
    ShutdownTimeout(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RouterError {
    /// Whether this error should trigger the bridge's restart-and-reapply
    /// recovery path rather than being surfaced to the caller as-is.
    #[must_use]
    pub fn is_daemon_fault(&self) -> bool {
        matches!(self, RouterError::Daemon { .. } | RouterError::CommandTimeout { .. })
    }
}
