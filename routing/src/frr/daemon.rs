// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Daemon supervision.
//!
//! The bridge polls daemon liveness through a [`DaemonControl`] and asks it
//! to restart dead daemons. The real implementation drives systemd;
//! tests substitute a fake.

use std::process::{Command, Stdio};

use crate::errors::RouterError;

#[allow(unused)]
use tracing::{debug, error, info, warn};

/// Liveness and lifecycle of the suite's per-protocol daemons.
///
/// Implementations are shared across the monitor and worker threads.
pub trait DaemonControl: Send + Sync {
    /// Whether the named daemon (e.g. `bgpd`) is currently running.
    fn is_alive(&self, daemon: &str) -> bool;

    /// Start the named daemon.
    fn start(&self, daemon: &str) -> Result<(), RouterError>;

    /// Stop the named daemon.
    fn stop(&self, daemon: &str) -> Result<(), RouterError>;

    /// Restart the named daemon.
    fn restart(&self, daemon: &str) -> Result<(), RouterError>;
}

/// Drives daemons through `systemctl`.
#[derive(Default)]
pub struct SystemdDaemonControl {}

impl SystemdDaemonControl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn unit_action(action: &str, daemon: &str) -> Result<(), RouterError> {
        let output = Command::new("systemctl")
            .args([action, daemon])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| RouterError::Daemon {
                daemon: daemon.to_owned(),
                reason: e.to_string(),
            })?;
        if output.status.success() {
            info!("systemctl {action} {daemon} succeeded");
            Ok(())
        } else {
            Err(RouterError::Daemon {
                daemon: daemon.to_owned(),
                reason: String::from_utf8_lossy(&output.stderr).to_string(),
            })
        }
    }
}

impl DaemonControl for SystemdDaemonControl {
    fn is_alive(&self, daemon: &str) -> bool {
        Command::new("systemctl")
            .args(["is-active", "--quiet", daemon])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success())
    }

    fn start(&self, daemon: &str) -> Result<(), RouterError> {
        Self::unit_action("start", daemon)
    }

    fn stop(&self, daemon: &str) -> Result<(), RouterError> {
        Self::unit_action("stop", daemon)
    }

    fn restart(&self, daemon: &str) -> Result<(), RouterError> {
        Self::unit_action("restart", daemon)
    }
}
