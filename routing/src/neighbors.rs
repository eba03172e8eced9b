// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Neighbor state objects and the shared neighbor table.
//!
//! Every protocol handler stores its neighbors here keyed by
//! (address, protocol); a handler only ever mutates its own entries, and it
//! does so from its single adjacency-loop thread, so transitions of one
//! neighbor are strictly ordered.

use ahash::RandomState;
use config::Protocol;
use config::routing::NeighborConfig;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use strum::Display;

#[allow(unused)]
use tracing::{debug, error, info};

/// Adjacency state. One enum covers the vocabularies of all three
/// protocols; each protocol only ever walks its own fixed sequence.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Display)]
pub enum NeighborState {
    Down,
    Idle,
    Connect,
    OpenSent,
    OpenConfirm,
    Established,
    Init,
    #[strum(serialize = "2-Way")]
    TwoWay,
    ExStart,
    Exchange,
    Loading,
    Full,
    Up,
}

/// Protocol-specific identity carried by a neighbor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerParams {
    Bgp { remote_as: u32 },
    Ospf { area: String },
    Isis { level: u8 },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NeighborKey {
    pub address: IpAddr,
    pub protocol: Protocol,
}

/// A neighbor and the state of its adjacency.
#[derive(Clone, Debug)]
pub struct Neighbor {
    pub address: IpAddr,
    pub protocol: Protocol,
    pub params: PeerParams,
    pub state: NeighborState,
    pub hello_interval: Duration,
    pub hold_time: Duration,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub last_seen: Instant,
    pub last_error: Option<String>,
    /// When this neighbor's next hello is due.
    pub(crate) next_hello: Instant,
}

impl Neighbor {
    #[must_use]
    pub fn new(
        address: IpAddr,
        protocol: Protocol,
        params: PeerParams,
        initial: NeighborState,
        cfg: &NeighborConfig,
        default_hello: Duration,
        default_hold: Duration,
    ) -> Self {
        let hello_interval = cfg
            .hello_interval_ms
            .map_or(default_hello, Duration::from_millis);
        let hold_time = cfg.hold_time_ms.map_or(default_hold, Duration::from_millis);
        Self {
            address,
            protocol,
            params,
            state: initial,
            hello_interval,
            hold_time,
            messages_sent: 0,
            messages_received: 0,
            last_seen: Instant::now(),
            last_error: None,
            next_hello: Instant::now(),
        }
    }

    #[must_use]
    pub fn key(&self) -> NeighborKey {
        NeighborKey {
            address: self.address,
            protocol: self.protocol,
        }
    }

    /// Transition to a new state, logging the change.
    pub(crate) fn set_state(&mut self, state: NeighborState) {
        if self.state != state {
            info!(
                "{} neighbor {}: {} -> {}",
                self.protocol, self.address, self.state, state
            );
            self.state = state;
        }
    }

    /// Whether the hold timer has expired: no hello observed within
    /// `hold_time` of the last one.
    #[must_use]
    pub fn hold_expired(&self) -> bool {
        self.last_seen.elapsed() > self.hold_time
    }
}

/// Table of neighbors keyed by (address, protocol), shared among handlers
/// under its own lock.
pub struct NeighborTable {
    neighbors: Mutex<HashMap<NeighborKey, Neighbor, RandomState>>,
}

impl Default for NeighborTable {
    fn default() -> Self {
        Self::new()
    }
}

impl NeighborTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            neighbors: Mutex::new(HashMap::with_hasher(RandomState::with_seed(0))),
        }
    }

    /// Insert or replace a neighbor.
    pub fn insert(&self, neighbor: Neighbor) {
        self.neighbors.lock().insert(neighbor.key(), neighbor);
    }

    pub fn remove(&self, key: &NeighborKey) -> Option<Neighbor> {
        self.neighbors.lock().remove(key)
    }

    /// Cascade removal of every neighbor owned by a protocol.
    pub fn remove_protocol(&self, protocol: Protocol) -> Vec<Neighbor> {
        let mut neighbors = self.neighbors.lock();
        let keys: Vec<NeighborKey> = neighbors
            .keys()
            .filter(|k| k.protocol == protocol)
            .copied()
            .collect();
        keys.iter().filter_map(|k| neighbors.remove(k)).collect()
    }

    #[must_use]
    pub fn get(&self, key: &NeighborKey) -> Option<Neighbor> {
        self.neighbors.lock().get(key).cloned()
    }

    #[must_use]
    pub fn contains(&self, key: &NeighborKey) -> bool {
        self.neighbors.lock().contains_key(key)
    }

    /// Run a closure against a neighbor under the table lock. The closure
    /// must not block; bridge calls are issued outside of it.
    pub fn with_neighbor<R>(
        &self,
        key: &NeighborKey,
        f: impl FnOnce(&mut Neighbor) -> R,
    ) -> Option<R> {
        self.neighbors.lock().get_mut(key).map(f)
    }

    #[must_use]
    pub fn keys_for(&self, protocol: Protocol) -> Vec<NeighborKey> {
        self.neighbors
            .lock()
            .keys()
            .filter(|k| k.protocol == protocol)
            .copied()
            .collect()
    }

    /// Copy of the neighbors owned by one protocol.
    #[must_use]
    pub fn list_protocol(&self, protocol: Protocol) -> Vec<Neighbor> {
        self.neighbors
            .lock()
            .values()
            .filter(|n| n.protocol == protocol)
            .cloned()
            .collect()
    }

    /// Neighbors of a protocol currently in the given state.
    #[must_use]
    pub fn list_in_state(&self, protocol: Protocol, state: NeighborState) -> Vec<Neighbor> {
        self.neighbors
            .lock()
            .values()
            .filter(|n| n.protocol == protocol && n.state == state)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.neighbors.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.neighbors.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn neighbor(addr: &str) -> Neighbor {
        Neighbor::new(
            IpAddr::from_str(addr).unwrap(),
            Protocol::Bgp,
            PeerParams::Bgp { remote_as: 65002 },
            NeighborState::Idle,
            &NeighborConfig::bgp(65002),
            Duration::from_millis(100),
            Duration::from_millis(300),
        )
    }

    #[test]
    fn state_labels() {
        assert_eq!(NeighborState::TwoWay.to_string(), "2-Way");
        assert_eq!(NeighborState::OpenConfirm.to_string(), "OpenConfirm");
    }

    #[test]
    fn table_scopes_by_protocol() {
        let table = NeighborTable::new();
        table.insert(neighbor("192.0.2.1"));
        table.insert(neighbor("192.0.2.2"));
        assert_eq!(table.list_protocol(Protocol::Bgp).len(), 2);
        assert!(table.list_protocol(Protocol::Ospf).is_empty());
        assert_eq!(table.keys_for(Protocol::Bgp).len(), 2);
    }

    #[test]
    fn with_neighbor_mutates_in_place() {
        let table = NeighborTable::new();
        let n = neighbor("192.0.2.1");
        let key = n.key();
        table.insert(n);
        table.with_neighbor(&key, |n| n.set_state(NeighborState::Connect));
        assert_eq!(table.get(&key).unwrap().state, NeighborState::Connect);
        assert!(table.with_neighbor(
            &NeighborKey {
                address: IpAddr::from_str("203.0.113.9").unwrap(),
                protocol: Protocol::Bgp
            },
            |_| ()
        )
        .is_none());
    }

    #[test]
    fn timer_overrides_apply() {
        let cfg = NeighborConfig::bgp(65002).set_timers(10, 50);
        let n = Neighbor::new(
            IpAddr::from_str("192.0.2.1").unwrap(),
            Protocol::Bgp,
            PeerParams::Bgp { remote_as: 65002 },
            NeighborState::Idle,
            &cfg,
            Duration::from_secs(1),
            Duration::from_secs(3),
        );
        assert_eq!(n.hello_interval, Duration::from_millis(10));
        assert_eq!(n.hold_time, Duration::from_millis(50));
    }
}
