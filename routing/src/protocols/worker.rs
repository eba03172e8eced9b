// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! The shared worker engine behind the three protocol handlers.
//!
//! A [`Worker`] runs three loops on OS threads: the hello/adjacency loop
//! that walks each neighbor through its protocol's state sequence, the
//! route loop that drains queued advertisements into bridge commands, and
//! a protocol-specific background loop. Protocol differences live in the
//! [`Flavor`] implementations.

use ahash::RandomState;
use ipnet::IpNet;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use config::Protocol;
use config::routing::NeighborConfig;

use crate::errors::RouterError;
use crate::event::{EventKind, EventSender};
use crate::frr::bridge::FrrBridge;
use crate::frr::renderer::builder::ConfigBuilder;
use crate::neighbors::{Neighbor, NeighborKey, NeighborState, NeighborTable, PeerParams};
use crate::rib::{Route, RouteKey, RouteTable};
use crate::stats::{ProtocolStats, StatsRegistry};

#[allow(unused)]
use tracing::{debug, error, info, warn};

const POLL_SLICE: Duration = Duration::from_millis(10);
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(5);

/// Join a worker thread, bounded by `deadline`. A thread that will not
/// exit is reported, never silently abandoned.
pub(crate) fn join_bounded(
    name: &str,
    handle: JoinHandle<()>,
    deadline: Duration,
) -> Result<(), RouterError> {
    let start = Instant::now();
    while !handle.is_finished() {
        if start.elapsed() > deadline {
            return Err(RouterError::ShutdownTimeout(name.to_owned()));
        }
        std::thread::sleep(POLL_SLICE);
    }
    if handle.join().is_err() {
        error!("Worker thread '{name}' panicked");
    }
    Ok(())
}

/// Sleep in short slices so the running flag is observed promptly.
pub(crate) fn sleep_while_running(running: &AtomicBool, total: Duration) {
    let mut slept = Duration::ZERO;
    while slept < total && running.load(Ordering::SeqCst) {
        let slice = POLL_SLICE.min(total - slept);
        std::thread::sleep(slice);
        slept += slice;
    }
}

/// A queued route operation, drained by the route loop.
pub(crate) enum RouteOp {
    Advertise(Route),
    Withdraw(Route),
}

/// Per-protocol behavior plugged into the worker engine.
pub(crate) trait Flavor: Send + Sync + 'static {
    fn protocol(&self) -> Protocol;

    /// Ordered adjacency states from initial to terminal. A neighbor in a
    /// state outside the sequence (forced Down) restarts at the front.
    fn sequence(&self) -> &'static [NeighborState];

    /// Default hello interval from the protocol's configuration.
    fn default_hello(&self) -> Duration;

    /// Default hold time from the protocol's configuration.
    fn default_hold(&self) -> Duration;

    /// Validate per-neighbor parameters and build the peer identity.
    fn peer_params(&self, cfg: &NeighborConfig) -> Result<PeerParams, RouterError>;

    /// Configuration stanza applied to the suite at start.
    fn render_config(&self) -> ConfigBuilder;

    fn neighbor_add_command(&self, neighbor: &Neighbor) -> Option<String>;
    fn neighbor_remove_command(&self, neighbor: &Neighbor) -> Option<String>;
    fn update_command(&self, route: &Route, neighbor: &Neighbor) -> String;
    fn withdraw_command(&self, route: &Route, neighbor: &Neighbor) -> String;
    fn going_down_command(&self, neighbor: &Neighbor) -> Option<String>;

    fn background_interval(&self) -> Duration;
    fn background_tick(&self, ctx: &WorkerCtx);
}

/// State shared between a handler facade and its worker threads.
pub(crate) struct WorkerCtx {
    pub flavor: Box<dyn Flavor>,
    pub running: AtomicBool,
    pub routes: Arc<RouteTable>,
    pub neighbors: Arc<NeighborTable>,
    pub stats: Arc<StatsRegistry>,
    pub bridge: Arc<FrrBridge>,
    pub events: EventSender,
    /// Prefixes this handler itself advertised, the keys `withdraw_route`
    /// accepts.
    pub advertised: Mutex<HashSet<IpNet, RandomState>>,
    route_tx: kanal::Sender<RouteOp>,
    route_rx: kanal::Receiver<RouteOp>,
}

impl WorkerCtx {
    fn protocol(&self) -> Protocol {
        self.flavor.protocol()
    }

    fn terminal_state(&self) -> NeighborState {
        let seq = self.flavor.sequence();
        seq[seq.len() - 1]
    }

    fn initial_state(&self) -> NeighborState {
        self.flavor.sequence()[0]
    }

    /// One step along the sequence; forced-Down neighbors restart at the
    /// front, terminal neighbors stay put.
    fn next_state(&self, current: NeighborState) -> NeighborState {
        let seq = self.flavor.sequence();
        match seq.iter().position(|s| *s == current) {
            Some(i) if i + 1 < seq.len() => seq[i + 1],
            Some(_) => current,
            None => seq[0],
        }
    }

    /// Established neighbors of this protocol.
    pub(crate) fn established(&self) -> Vec<Neighbor> {
        self.neighbors
            .list_in_state(self.protocol(), self.terminal_state())
    }
}

/// Outcome of one hello exchange with one neighbor, computed under the
/// table lock and acted on outside of it.
enum HelloOutcome {
    /// Advanced into the terminal state.
    CameUp(Neighbor),
    /// Hold timer expired on an established neighbor.
    Expired(Neighbor),
    Quiet,
    /// This neighbor's hello interval has not elapsed yet.
    NotDue,
}

pub(crate) struct Worker {
    ctx: Arc<WorkerCtx>,
    threads: Mutex<Vec<(String, JoinHandle<()>)>>,
}

impl Worker {
    pub(crate) fn new(
        flavor: Box<dyn Flavor>,
        routes: Arc<RouteTable>,
        neighbors: Arc<NeighborTable>,
        stats: Arc<StatsRegistry>,
        bridge: Arc<FrrBridge>,
        events: EventSender,
    ) -> Self {
        let (route_tx, route_rx) = kanal::bounded::<RouteOp>(256);
        Self {
            ctx: Arc::new(WorkerCtx {
                flavor,
                running: AtomicBool::new(false),
                routes,
                neighbors,
                stats,
                bridge,
                events,
                advertised: Mutex::new(HashSet::with_hasher(RandomState::with_seed(0))),
                route_tx,
                route_rx,
            }),
            threads: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn protocol(&self) -> Protocol {
        self.ctx.protocol()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.ctx.running.load(Ordering::SeqCst)
    }

    pub(crate) fn start(&self) -> Result<(), RouterError> {
        if self.is_running() {
            return Ok(());
        }
        let protocol = self.protocol();
        self.ctx
            .bridge
            .apply_config(protocol, &self.ctx.flavor.render_config())?;
        self.ctx.running.store(true, Ordering::SeqCst);

        let mut threads = self.threads.lock();
        for (suffix, body) in [
            ("adjacency", Self::adjacency_loop as fn(&WorkerCtx)),
            ("routes", Self::route_loop as fn(&WorkerCtx)),
            ("background", Self::background_loop as fn(&WorkerCtx)),
        ] {
            let name = format!("{protocol}-{suffix}");
            let ctx = Arc::clone(&self.ctx);
            let thread_name = name.clone();
            let handle = std::thread::Builder::new()
                .name(thread_name)
                .spawn(move || body(&ctx))?;
            threads.push((name, handle));
        }
        info!("{protocol}: handler started");
        Ok(())
    }

    pub(crate) fn stop(&self) -> Result<(), RouterError> {
        let protocol = self.protocol();
        let was_running = self.is_running();
        self.ctx.running.store(false, Ordering::SeqCst);

        let mut result = Ok(());
        for (name, handle) in self.threads.lock().drain(..) {
            if let Err(e) = join_bounded(&name, handle, SHUTDOWN_DEADLINE) {
                error!("{e}");
                result = Err(e);
            }
        }

        // graceful teardown: notify established neighbors before removal
        if was_running {
            for neighbor in self.ctx.established() {
                if let Some(cmd) = self.ctx.flavor.going_down_command(&neighbor) {
                    if let Err(e) = self.ctx.bridge.execute_command(protocol, &cmd) {
                        debug!("{protocol}: going-down notification failed: {e}");
                    }
                }
            }
        }
        // table cleanup runs regardless: neighbors and routes can be added
        // before the handler ever starts
        for mut neighbor in self.ctx.neighbors.remove_protocol(protocol) {
            if neighbor.state == self.ctx.terminal_state() {
                self.ctx.stats.with_protocol(protocol, |s| {
                    s.neighbors_established = s.neighbors_established.saturating_sub(1);
                    s.neighbors_lost += 1;
                });
            }
            neighbor.set_state(NeighborState::Down);
            self.ctx.events.emit(EventKind::NeighborDown(neighbor));
        }

        // no orphaned routes: cascade-remove everything this handler owns
        for route in self.ctx.routes.remove_protocol(protocol) {
            self.ctx.events.emit(EventKind::RouteRemoved(route));
        }
        self.ctx.advertised.lock().clear();
        self.ctx.bridge.clear_config(protocol);
        if was_running {
            info!("{protocol}: handler stopped");
        }
        result
    }

    pub(crate) fn add_neighbor(
        &self,
        address: IpAddr,
        cfg: &NeighborConfig,
    ) -> Result<(), RouterError> {
        let protocol = self.protocol();
        let params = self.ctx.flavor.peer_params(cfg)?;
        let neighbor = Neighbor::new(
            address,
            protocol,
            params,
            self.ctx.initial_state(),
            cfg,
            self.ctx.flavor.default_hello(),
            self.ctx.flavor.default_hold(),
        );
        if self.is_running() {
            if let Some(cmd) = self.ctx.flavor.neighbor_add_command(&neighbor) {
                self.ctx.bridge.execute_command(protocol, &cmd)?;
            }
        }
        info!("{protocol}: added neighbor {address}");
        self.ctx.neighbors.insert(neighbor);
        Ok(())
    }

    pub(crate) fn remove_neighbor(&self, address: IpAddr) -> Result<(), RouterError> {
        let protocol = self.protocol();
        let key = NeighborKey { address, protocol };
        let Some(neighbor) = self.ctx.neighbors.remove(&key) else {
            return Err(RouterError::NeighborNotFound { protocol, address });
        };
        if self.is_running() {
            if let Some(cmd) = self.ctx.flavor.neighbor_remove_command(&neighbor) {
                if let Err(e) = self.ctx.bridge.execute_command(protocol, &cmd) {
                    debug!("{protocol}: neighbor removal command failed: {e}");
                }
            }
        }
        if neighbor.state == self.ctx.terminal_state() {
            self.ctx.stats.with_protocol(protocol, |s| {
                s.neighbors_established = s.neighbors_established.saturating_sub(1);
                s.neighbors_lost += 1;
            });
            self.ctx.events.emit(EventKind::NeighborDown(neighbor));
        }
        info!("{protocol}: removed neighbor {address}");
        Ok(())
    }

    pub(crate) fn advertise_route(&self, mut route: Route) -> Result<(), RouterError> {
        let protocol = self.protocol();
        route.protocol = protocol;
        self.ctx.advertised.lock().insert(route.prefix);
        self.ctx.routes.insert(route.clone());
        self.ctx.stats.with_protocol(protocol, |s| s.routes_advertised += 1);
        self.ctx.events.emit(EventKind::RouteAdded(route.clone()));
        if self.ctx.route_tx.send(RouteOp::Advertise(route)).is_err() {
            debug!("{protocol}: route queue closed");
        }
        Ok(())
    }

    pub(crate) fn withdraw_route(&self, prefix: IpNet) -> Result<(), RouterError> {
        let protocol = self.protocol();
        if !self.ctx.advertised.lock().remove(&prefix) {
            return Err(RouterError::RouteNotFound { protocol, prefix });
        }
        let key = RouteKey { prefix, protocol };
        let route = self
            .ctx
            .routes
            .remove(&key)
            .unwrap_or_else(|| Route::new(prefix, protocol));
        self.ctx.stats.with_protocol(protocol, |s| s.routes_withdrawn += 1);
        self.ctx.events.emit(EventKind::RouteRemoved(route.clone()));
        if self.ctx.route_tx.send(RouteOp::Withdraw(route)).is_err() {
            debug!("{protocol}: route queue closed");
        }
        Ok(())
    }

    pub(crate) fn get_neighbors(&self) -> Vec<Neighbor> {
        self.ctx.neighbors.list_protocol(self.protocol())
    }

    pub(crate) fn get_routes(&self) -> Vec<Route> {
        self.ctx.routes.list_protocol(self.protocol())
    }

    pub(crate) fn get_statistics(&self) -> ProtocolStats {
        self.ctx.stats.protocol(self.protocol())
    }

    ////////////////////////////////////////////////////////////////////////
    // worker loops
    ////////////////////////////////////////////////////////////////////////

    /// Hello/adjacency loop. Each pass sends a hello to every neighbor
    /// whose own interval has elapsed and advances or expires it; a hello
    /// counts as observed when the protocol's daemon answers liveness
    /// checks.
    fn adjacency_loop(ctx: &WorkerCtx) {
        let protocol = ctx.protocol();
        debug!("{protocol}: adjacency loop started");
        while ctx.running.load(Ordering::SeqCst) {
            let observed = ctx.bridge.daemon_alive(protocol);
            let terminal = ctx.terminal_state();
            for key in ctx.neighbors.keys_for(protocol) {
                let outcome = ctx.neighbors.with_neighbor(&key, |n| {
                    let now = Instant::now();
                    if now < n.next_hello {
                        return HelloOutcome::NotDue;
                    }
                    n.next_hello = now + n.hello_interval;
                    n.messages_sent += 1;
                    if observed {
                        n.messages_received += 1;
                        n.last_seen = now;
                        n.last_error = None;
                        if n.state != terminal {
                            // one step per hello, no skipping
                            let next = ctx.next_state(n.state);
                            n.set_state(next);
                            if n.state == terminal {
                                return HelloOutcome::CameUp(n.clone());
                            }
                        }
                    } else if n.state == terminal && n.hold_expired() {
                        n.set_state(NeighborState::Down);
                        n.last_error = Some("hold timer expired".to_owned());
                        return HelloOutcome::Expired(n.clone());
                    }
                    HelloOutcome::Quiet
                });
                let Some(outcome) = outcome else {
                    continue;
                };
                if matches!(outcome, HelloOutcome::NotDue) {
                    continue;
                }
                ctx.stats.with_protocol(protocol, |s| {
                    s.messages_sent += 1;
                    if observed {
                        s.messages_received += 1;
                    }
                });
                match outcome {
                    HelloOutcome::CameUp(neighbor) => {
                        ctx.stats
                            .with_protocol(protocol, |s| s.neighbors_established += 1);
                        ctx.events.emit(EventKind::NeighborUp(neighbor));
                    }
                    HelloOutcome::Expired(neighbor) => {
                        warn!(
                            "{protocol}: neighbor {} held down, hold timer expired",
                            neighbor.address
                        );
                        ctx.stats.with_protocol(protocol, |s| {
                            s.neighbors_established = s.neighbors_established.saturating_sub(1);
                            s.neighbors_lost += 1;
                        });
                        ctx.events.emit(EventKind::NeighborDown(neighbor));
                    }
                    HelloOutcome::Quiet | HelloOutcome::NotDue => {}
                }
            }
            // wake often enough for the fastest neighbor
            let tick = ctx
                .neighbors
                .list_protocol(protocol)
                .iter()
                .map(|n| n.hello_interval)
                .min()
                .map_or_else(
                    || ctx.flavor.default_hello(),
                    |fastest| fastest.min(ctx.flavor.default_hello()),
                );
            sleep_while_running(&ctx.running, tick);
        }
        debug!("{protocol}: adjacency loop stopped");
    }

    /// Route loop: drains queued operations into one bridge command per
    /// established neighbor. Zero established neighbors means zero
    /// commands.
    fn route_loop(ctx: &WorkerCtx) {
        let protocol = ctx.protocol();
        debug!("{protocol}: route loop started");
        while ctx.running.load(Ordering::SeqCst) {
            match ctx.route_rx.try_recv() {
                Ok(Some(op)) => Self::process_route_op(ctx, &op),
                Ok(None) => sleep_while_running(&ctx.running, POLL_SLICE),
                Err(_) => break,
            }
        }
        debug!("{protocol}: route loop stopped");
    }

    fn process_route_op(ctx: &WorkerCtx, op: &RouteOp) {
        let protocol = ctx.protocol();
        let (route, advertise) = match op {
            RouteOp::Advertise(route) => (route, true),
            RouteOp::Withdraw(route) => (route, false),
        };
        for neighbor in ctx.established() {
            let cmd = if advertise {
                ctx.flavor.update_command(route, &neighbor)
            } else {
                ctx.flavor.withdraw_command(route, &neighbor)
            };
            if let Err(e) = ctx.bridge.execute_command(protocol, &cmd) {
                ctx.stats.with_protocol(protocol, |s| s.errors += 1);
                warn!(
                    "{protocol}: route command toward {} failed: {e}",
                    neighbor.address
                );
            }
        }
    }

    /// Protocol-specific periodic work (SPF, keepalives, CSNP refresh).
    fn background_loop(ctx: &WorkerCtx) {
        let protocol = ctx.protocol();
        debug!("{protocol}: background loop started");
        while ctx.running.load(Ordering::SeqCst) {
            sleep_while_running(&ctx.running, ctx.flavor.background_interval());
            if ctx.running.load(Ordering::SeqCst) {
                ctx.flavor.background_tick(ctx);
            }
        }
        debug!("{protocol}: background loop stopped");
    }
}
