// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Test doubles for the bridge seams, behind the `testing` feature.
//!
//! Both fakes are cheap clones around shared state: one clone is boxed
//! into the bridge, the test keeps another to script behavior and inspect
//! what the engine did.

use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::RouterError;
use crate::frr::daemon::DaemonControl;
use crate::frr::transport::Transport;

#[derive(Default)]
struct FakeTransportInner {
    commands: Vec<String>,
    responses: VecDeque<String>,
    failing: bool,
}

/// Records every command and replays scripted responses.
#[derive(Clone, Default)]
pub struct FakeTransport {
    inner: Arc<Mutex<FakeTransportInner>>,
}

impl FakeTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command executed so far, in order.
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.inner.lock().commands.clone()
    }

    /// Commands containing the given substring.
    #[must_use]
    pub fn commands_matching(&self, needle: &str) -> Vec<String> {
        self.inner
            .lock()
            .commands
            .iter()
            .filter(|c| c.contains(needle))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.inner.lock().commands.clear();
    }

    /// Queue an output blob; each executed command consumes one. Commands
    /// beyond the queue return an empty output.
    pub fn push_response<T: Into<String>>(&self, output: T) {
        self.inner.lock().responses.push_back(output.into());
    }

    /// Make every subsequent command fail as a daemon fault.
    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().failing = failing;
    }
}

impl Transport for FakeTransport {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn execute(&mut self, command: &str, _timeout: Duration) -> Result<String, RouterError> {
        let mut inner = self.inner.lock();
        if inner.failing {
            return Err(RouterError::Daemon {
                daemon: "fake".to_owned(),
                reason: "scripted failure".to_owned(),
            });
        }
        inner.commands.push(command.to_owned());
        Ok(inner.responses.pop_front().unwrap_or_default())
    }
}

#[derive(Default)]
struct FakeDaemonInner {
    down: HashSet<String>,
    restarts: Vec<String>,
    fail_restarts: bool,
}

/// Scriptable daemon liveness: every daemon is alive until killed.
#[derive(Clone, Default)]
pub struct FakeDaemonControl {
    inner: Arc<Mutex<FakeDaemonInner>>,
}

impl FakeDaemonControl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a daemon crash.
    pub fn kill(&self, daemon: &str) {
        self.inner.lock().down.insert(daemon.to_owned());
    }

    /// Bring a killed daemon back without a restart call.
    pub fn revive(&self, daemon: &str) {
        self.inner.lock().down.remove(daemon);
    }

    /// Make every restart attempt fail, to exhaust the retry budget.
    pub fn set_fail_restarts(&self, fail: bool) {
        self.inner.lock().fail_restarts = fail;
    }

    /// Daemons restarted so far, in order.
    #[must_use]
    pub fn restarts(&self) -> Vec<String> {
        self.inner.lock().restarts.clone()
    }
}

impl DaemonControl for FakeDaemonControl {
    fn is_alive(&self, daemon: &str) -> bool {
        !self.inner.lock().down.contains(daemon)
    }

    fn start(&self, daemon: &str) -> Result<(), RouterError> {
        self.inner.lock().down.remove(daemon);
        Ok(())
    }

    fn stop(&self, daemon: &str) -> Result<(), RouterError> {
        self.inner.lock().down.insert(daemon.to_owned());
        Ok(())
    }

    fn restart(&self, daemon: &str) -> Result<(), RouterError> {
        let mut inner = self.inner.lock();
        if inner.fail_restarts {
            return Err(RouterError::Daemon {
                daemon: daemon.to_owned(),
                reason: "scripted restart failure".to_owned(),
            });
        }
        inner.restarts.push(daemon.to_owned());
        inner.down.remove(daemon);
        Ok(())
    }
}
