// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! The statistics registry: per-protocol counters plus bridge counters,
//! each behind the registry's own lock. Counters are monotonically
//! increasing except the established-neighbor gauge; they reset only on
//! explicit operator action.

use chrono::{DateTime, Utc};
use config::Protocol;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Counters kept for one protocol instance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProtocolStats {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub routes_advertised: u64,
    pub routes_withdrawn: u64,
    /// Currently established neighbors: incremented on establishment,
    /// decremented when one is lost.
    pub neighbors_established: u64,
    pub neighbors_lost: u64,
    pub errors: u64,
}

impl ProtocolStats {
    fn merge(&mut self, other: &ProtocolStats) {
        self.messages_sent += other.messages_sent;
        self.messages_received += other.messages_received;
        self.routes_advertised += other.routes_advertised;
        self.routes_withdrawn += other.routes_withdrawn;
        self.neighbors_established += other.neighbors_established;
        self.neighbors_lost += other.neighbors_lost;
        self.errors += other.errors;
    }
}

/// Counters kept by the control-plane bridge.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub commands_executed: u64,
    pub commands_failed: u64,
    pub daemon_restarts: u64,
    pub parse_ignored: u64,
    /// Set when a daemon exhausted its restart budget; cleared on reset.
    pub daemon_failed: bool,
}

/// A consistent copy of every counter, taken under lock and released
/// before it is returned.
#[derive(Clone, Debug, Default)]
pub struct StatsSnapshot {
    pub protocols: HashMap<Protocol, ProtocolStats>,
    pub bridge: BridgeStats,
    pub total: ProtocolStats,
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct StatsInner {
    protocols: HashMap<Protocol, ProtocolStats>,
    bridge: BridgeStats,
    last_update: Option<DateTime<Utc>>,
}

/// Registry shared by the handlers and the bridge.
#[derive(Default)]
pub struct StatsRegistry {
    inner: Mutex<StatsInner>,
}

impl StatsRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutate the counters of one protocol under the registry lock.
    pub fn with_protocol(&self, protocol: Protocol, f: impl FnOnce(&mut ProtocolStats)) {
        let mut inner = self.inner.lock();
        f(inner.protocols.entry(protocol).or_default());
        inner.last_update = Some(Utc::now());
    }

    /// Mutate the bridge counters under the registry lock.
    pub fn with_bridge(&self, f: impl FnOnce(&mut BridgeStats)) {
        let mut inner = self.inner.lock();
        f(&mut inner.bridge);
        inner.last_update = Some(Utc::now());
    }

    #[must_use]
    pub fn protocol(&self, protocol: Protocol) -> ProtocolStats {
        self.inner
            .lock()
            .protocols
            .get(&protocol)
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn bridge(&self) -> BridgeStats {
        self.inner.lock().bridge.clone()
    }

    /// Merge every per-protocol counter set into one snapshot. Copies
    /// under the lock, then releases; never blocks on protocol threads.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let inner = self.inner.lock();
        let mut total = ProtocolStats::default();
        for stats in inner.protocols.values() {
            total.merge(stats);
        }
        StatsSnapshot {
            protocols: inner.protocols.clone(),
            bridge: inner.bridge.clone(),
            total,
            last_update: inner.last_update,
        }
    }

    /// Reset every counter. Explicit operator action only.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.protocols.clear();
        inner.bridge = BridgeStats::default();
        inner.last_update = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_merges_protocols() {
        let registry = StatsRegistry::new();
        registry.with_protocol(Protocol::Bgp, |s| s.routes_advertised += 2);
        registry.with_protocol(Protocol::Ospf, |s| s.routes_advertised += 3);
        registry.with_bridge(|b| b.commands_executed += 1);
        let snap = registry.snapshot();
        assert_eq!(snap.total.routes_advertised, 5);
        assert_eq!(snap.bridge.commands_executed, 1);
        assert_eq!(snap.protocols[&Protocol::Bgp].routes_advertised, 2);
    }

    #[test]
    fn reset_clears_counters() {
        let registry = StatsRegistry::new();
        registry.with_protocol(Protocol::Isis, |s| s.errors += 1);
        registry.reset();
        assert_eq!(registry.protocol(Protocol::Isis), ProtocolStats::default());
    }
}
