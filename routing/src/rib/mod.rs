// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! The shared route table. All protocol handlers write their advertised
//! routes here; readers get copies taken under a short-lived lock.

use ahash::RandomState;
use chrono::{DateTime, Utc};
use config::Protocol;
use ipnet::IpNet;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::IpAddr;

#[allow(unused)]
use tracing::{debug, error, info};

/// Identity of a route: at most one active route per key, re-advertisement
/// overwrites in place.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct RouteKey {
    pub prefix: IpNet,
    pub protocol: Protocol,
}

/// A route advertised by one of the protocol handlers.
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    pub prefix: IpNet,
    pub next_hop: Option<IpAddr>,
    pub metric: u32,
    pub protocol: Protocol,
    pub valid: bool,
    pub last_update: DateTime<Utc>,
}

impl Route {
    #[must_use]
    pub fn new(prefix: IpNet, protocol: Protocol) -> Self {
        Self {
            prefix,
            next_hop: None,
            metric: 0,
            protocol,
            valid: true,
            last_update: Utc::now(),
        }
    }

    #[must_use]
    pub fn set_next_hop(mut self, next_hop: IpAddr) -> Self {
        self.next_hop = Some(next_hop);
        self
    }

    #[must_use]
    pub fn set_metric(mut self, metric: u32) -> Self {
        self.metric = metric;
        self
    }

    #[must_use]
    pub fn key(&self) -> RouteKey {
        RouteKey {
            prefix: self.prefix,
            protocol: self.protocol,
        }
    }
}

/// Table of routes keyed by (prefix, protocol), shared by reference among
/// all handlers under its own lock.
pub struct RouteTable {
    routes: Mutex<HashMap<RouteKey, Route, RandomState>>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::with_hasher(RandomState::with_seed(0))),
        }
    }

    /// Insert or overwrite a route. Returns true if the key was new.
    pub fn insert(&self, mut route: Route) -> bool {
        route.last_update = Utc::now();
        let mut routes = self.routes.lock();
        routes.insert(route.key(), route).is_none()
    }

    pub fn remove(&self, key: &RouteKey) -> Option<Route> {
        self.routes.lock().remove(key)
    }

    /// Cascade removal of every route owned by a protocol, used when the
    /// protocol is stopped or disabled.
    pub fn remove_protocol(&self, protocol: Protocol) -> Vec<Route> {
        let mut routes = self.routes.lock();
        let keys: Vec<RouteKey> = routes
            .keys()
            .filter(|k| k.protocol == protocol)
            .copied()
            .collect();
        let removed: Vec<Route> = keys.iter().filter_map(|k| routes.remove(k)).collect();
        if !removed.is_empty() {
            debug!("Removed {} routes owned by {protocol}", removed.len());
        }
        removed
    }

    #[must_use]
    pub fn get(&self, key: &RouteKey) -> Option<Route> {
        self.routes.lock().get(key).cloned()
    }

    #[must_use]
    pub fn contains(&self, key: &RouteKey) -> bool {
        self.routes.lock().contains_key(key)
    }

    /// Copy of every route in the table.
    #[must_use]
    pub fn list(&self) -> Vec<Route> {
        self.routes.lock().values().cloned().collect()
    }

    /// Copy of the routes owned by one protocol.
    #[must_use]
    pub fn list_protocol(&self, protocol: Protocol) -> Vec<Route> {
        self.routes
            .lock()
            .values()
            .filter(|r| r.protocol == protocol)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.lock().is_empty()
    }
}
