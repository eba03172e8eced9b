// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Router core: owns the shared tables, the bridge, the event dispatcher
//! and the protocol handlers, and orchestrates startup and shutdown.

use ahash::RandomState;
use derive_builder::Builder;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use config::routing::{BgpConfig, IsisConfig, NeighborConfig, OspfConfig};
use config::{InterfaceConfig, Protocol, RouterConfig, TransportKind};
use ipnet::IpNet;

use crate::errors::RouterError;
use crate::event::{EventDispatcher, NeighborCallback, RouteCallback};
use crate::frr::bridge::{FrrBridge, FrrParams};
use crate::frr::daemon::{DaemonControl, SystemdDaemonControl};
use crate::frr::transport::{SocketTransport, Transport, VtyshTransport};
use crate::interfaces::iftable::IfTable;
use crate::interfaces::interface::Interface;
use crate::neighbors::{Neighbor, NeighborTable};
use crate::protocols::worker::{join_bounded, sleep_while_running};
use crate::protocols::{BgpHandler, IsisHandler, OspfHandler, ProtocolHandler};
use crate::rib::{Route, RouteTable};
use crate::stats::{StatsRegistry, StatsSnapshot};

#[allow(unused)]
use tracing::{debug, error, info, warn};

const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(5);
const STATS_INTERVAL: Duration = Duration::from_secs(10);

/// Configuration for one protocol instance, used when enabling a protocol
/// after startup.
pub enum ProtocolConfig {
    Bgp(BgpConfig),
    Ospf(OspfConfig),
    Isis(IsisConfig),
}

impl ProtocolConfig {
    #[must_use]
    pub fn protocol(&self) -> Protocol {
        match self {
            ProtocolConfig::Bgp(_) => Protocol::Bgp,
            ProtocolConfig::Ospf(_) => Protocol::Ospf,
            ProtocolConfig::Isis(_) => Protocol::Isis,
        }
    }
}

/// Everything needed to build a [`RouterCore`].
#[derive(Builder)]
#[builder(pattern = "owned")]
pub struct RouterParams {
    pub config: RouterConfig,
    pub transport: Box<dyn Transport>,
    pub daemons: Box<dyn DaemonControl>,
}

impl RouterParams {
    /// Build params from configuration alone, picking the transport the
    /// configuration names and real systemd daemon control.
    #[must_use]
    pub fn from_config(config: RouterConfig) -> Self {
        let transport: Box<dyn Transport> = match config.bridge.transport {
            TransportKind::Vtysh => Box::new(VtyshTransport::new(&config.bridge.vtysh_path)),
            TransportKind::Socket => Box::new(SocketTransport::new(&config.bridge.socket_path)),
        };
        Self {
            config,
            transport,
            daemons: Box::new(SystemdDaemonControl::new()),
        }
    }
}

pub struct RouterCore {
    config: Mutex<RouterConfig>,
    interfaces: Mutex<IfTable>,
    routes: Arc<RouteTable>,
    neighbors: Arc<NeighborTable>,
    stats: Arc<StatsRegistry>,
    dispatcher: Mutex<EventDispatcher>,
    bridge: Arc<FrrBridge>,
    handlers: Mutex<HashMap<Protocol, Box<dyn ProtocolHandler>, RandomState>>,
    running: Arc<AtomicBool>,
    stats_thread: Mutex<Option<JoinHandle<()>>>,
}

impl RouterCore {
    /// Validate the configuration and build the core. Nothing is started
    /// and no suite command is issued yet.
    pub fn new(params: RouterParams) -> Result<Arc<Self>, RouterError> {
        params.config.validate()?;

        let routes = Arc::new(RouteTable::new());
        let neighbors = Arc::new(NeighborTable::new());
        let stats = Arc::new(StatsRegistry::new());
        let dispatcher = EventDispatcher::new();
        let events = dispatcher.sender();
        let bridge = FrrBridge::new(
            FrrParams {
                config: params.config.bridge.clone(),
                transport: params.transport,
                daemons: params.daemons,
            },
            Arc::clone(&routes),
            Arc::clone(&neighbors),
            Arc::clone(&stats),
            events,
        );

        let core = Arc::new(Self {
            config: Mutex::new(params.config),
            interfaces: Mutex::new(IfTable::new()),
            routes,
            neighbors,
            stats,
            dispatcher: Mutex::new(dispatcher),
            bridge,
            handlers: Mutex::new(HashMap::with_hasher(RandomState::with_seed(0))),
            running: Arc::new(AtomicBool::new(false)),
            stats_thread: Mutex::new(None),
        });

        let config = core.config.lock().clone();
        for iface in &config.interfaces {
            core.interfaces.lock().add_interface(iface)?;
        }
        if let Some(bgp) = config.protocols.bgp {
            core.install_handler(ProtocolConfig::Bgp(bgp))?;
        }
        if let Some(ospf) = config.protocols.ospf {
            core.install_handler(ProtocolConfig::Ospf(ospf))?;
        }
        if let Some(isis) = config.protocols.isis {
            core.install_handler(ProtocolConfig::Isis(isis))?;
        }
        Ok(core)
    }

    fn build_handler(&self, cfg: ProtocolConfig) -> Result<Box<dyn ProtocolHandler>, RouterError> {
        let routes = Arc::clone(&self.routes);
        let neighbors = Arc::clone(&self.neighbors);
        let stats = Arc::clone(&self.stats);
        let bridge = Arc::clone(&self.bridge);
        let events = self.dispatcher.lock().sender();
        Ok(match cfg {
            ProtocolConfig::Bgp(c) => {
                Box::new(BgpHandler::new(c, routes, neighbors, stats, bridge, events)?)
            }
            ProtocolConfig::Ospf(c) => {
                Box::new(OspfHandler::new(c, routes, neighbors, stats, bridge, events)?)
            }
            ProtocolConfig::Isis(c) => {
                Box::new(IsisHandler::new(c, routes, neighbors, stats, bridge, events)?)
            }
        })
    }

    /// Build and register a handler without starting it. An existing
    /// handler for the protocol is stopped and replaced.
    fn install_handler(&self, cfg: ProtocolConfig) -> Result<(), RouterError> {
        let protocol = cfg.protocol();
        let handler = self.build_handler(cfg)?;
        let old = self.handlers.lock().insert(protocol, handler);
        if let Some(old) = old {
            if old.is_running() {
                old.stop()?;
            }
        }
        Ok(())
    }

    /// Bring up bridge supervision, then every registered handler, then the
    /// statistics loop.
    pub fn start(self: &Arc<Self>) -> Result<(), RouterError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!("Starting router core");
        let config = self.config.lock().clone();
        self.bridge.start(&config)?;
        for handler in self.handlers.lock().values() {
            handler.start()?;
        }

        let running = Arc::clone(&self.running);
        let stats = Arc::clone(&self.stats);
        let handle = std::thread::Builder::new()
            .name("router-stats".to_owned())
            .spawn(move || {
                while running.load(Ordering::SeqCst) {
                    sleep_while_running(&running, STATS_INTERVAL);
                    if running.load(Ordering::SeqCst) {
                        let snapshot = stats.snapshot();
                        info!(
                            "stats: {} msgs sent, {} received, {} routes advertised, {} established neighbors, {} bridge commands",
                            snapshot.total.messages_sent,
                            snapshot.total.messages_received,
                            snapshot.total.routes_advertised,
                            snapshot.total.neighbors_established,
                            snapshot.bridge.commands_executed
                        );
                    }
                }
            })?;
        *self.stats_thread.lock() = Some(handle);
        Ok(())
    }

    /// Stop handlers, then bridge supervision, then the event dispatcher.
    /// Idempotent; the first join failure is reported after everything
    /// else has been brought down.
    pub fn stop(&self) -> Result<(), RouterError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        info!("Stopping router core");
        let mut result = Ok(());
        for handler in self.handlers.lock().values() {
            if let Err(e) = handler.stop() {
                error!("Handler shutdown failed: {e}");
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        if let Err(e) = self.bridge.stop(SHUTDOWN_DEADLINE) {
            error!("Bridge shutdown failed: {e}");
            if result.is_ok() {
                result = Err(e);
            }
        }
        if let Some(handle) = self.stats_thread.lock().take() {
            if let Err(e) = join_bounded("router-stats", handle, SHUTDOWN_DEADLINE) {
                error!("{e}");
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        self.dispatcher.lock().shutdown();
        result
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    ////////////////////////////////////////////////////////////////////////
    // interfaces
    ////////////////////////////////////////////////////////////////////////

    pub fn add_interface(&self, cfg: &InterfaceConfig) -> Result<(), RouterError> {
        self.interfaces.lock().add_interface(cfg)
    }

    pub fn remove_interface(&self, name: &str) -> Result<Interface, RouterError> {
        self.interfaces.lock().del_interface(name)
    }

    pub fn set_interface_enabled(&self, name: &str, enabled: bool) -> Result<(), RouterError> {
        self.interfaces.lock().set_iface_enabled(name, enabled)
    }

    #[must_use]
    pub fn get_interfaces(&self) -> Vec<Interface> {
        self.interfaces.lock().values().cloned().collect()
    }

    ////////////////////////////////////////////////////////////////////////
    // protocols
    ////////////////////////////////////////////////////////////////////////

    /// Register a protocol instance; if the core is running the handler is
    /// started immediately.
    pub fn enable_protocol(&self, cfg: ProtocolConfig) -> Result<(), RouterError> {
        let protocol = cfg.protocol();
        self.install_handler(cfg)?;
        if self.is_running() {
            let handlers = self.handlers.lock();
            if let Some(handler) = handlers.get(&protocol) {
                handler.start()?;
            }
        }
        info!("Enabled protocol {protocol}");
        Ok(())
    }

    /// Tear down a protocol instance gracefully and unregister it.
    pub fn disable_protocol(&self, protocol: Protocol) -> Result<(), RouterError> {
        let removed = self.handlers.lock().remove(&protocol);
        let Some(handler) = removed else {
            return Err(RouterError::ProtocolNotEnabled(protocol));
        };
        handler.stop()?;
        info!("Disabled protocol {protocol}");
        Ok(())
    }

    #[must_use]
    pub fn enabled_protocols(&self) -> Vec<Protocol> {
        self.handlers.lock().keys().copied().collect()
    }

    fn with_handler<R>(
        &self,
        protocol: Protocol,
        f: impl FnOnce(&dyn ProtocolHandler) -> Result<R, RouterError>,
    ) -> Result<R, RouterError> {
        let handlers = self.handlers.lock();
        let handler = handlers
            .get(&protocol)
            .ok_or(RouterError::ProtocolNotEnabled(protocol))?;
        f(handler.as_ref())
    }

    pub fn add_neighbor(
        &self,
        protocol: Protocol,
        address: IpAddr,
        cfg: &NeighborConfig,
    ) -> Result<(), RouterError> {
        self.with_handler(protocol, |h| h.add_neighbor(address, cfg))
    }

    pub fn remove_neighbor(&self, protocol: Protocol, address: IpAddr) -> Result<(), RouterError> {
        self.with_handler(protocol, |h| h.remove_neighbor(address))
    }

    pub fn advertise_route(&self, protocol: Protocol, route: Route) -> Result<(), RouterError> {
        self.with_handler(protocol, |h| h.advertise_route(route))
    }

    pub fn withdraw_route(&self, protocol: Protocol, prefix: IpNet) -> Result<(), RouterError> {
        self.with_handler(protocol, |h| h.withdraw_route(prefix))
    }

    pub fn get_neighbors(&self, protocol: Protocol) -> Result<Vec<Neighbor>, RouterError> {
        self.with_handler(protocol, |h| Ok(h.get_neighbors()))
    }

    /// Every route in the shared table, across all protocols.
    #[must_use]
    pub fn get_routes(&self) -> Vec<Route> {
        self.routes.list()
    }

    ////////////////////////////////////////////////////////////////////////
    // statistics, events, introspection
    ////////////////////////////////////////////////////////////////////////

    #[must_use]
    pub fn get_statistics(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_statistics(&self) {
        self.stats.reset();
    }

    pub fn set_route_update_callback(&self, cb: RouteCallback) {
        self.dispatcher.lock().set_route_update_callback(cb);
    }

    pub fn set_neighbor_update_callback(&self, cb: NeighborCallback) {
        self.dispatcher.lock().set_neighbor_update_callback(cb);
    }

    /// Run a `show`-style introspection command for a protocol; the output
    /// is fed through the marker parser before being returned raw.
    pub fn execute_show(&self, protocol: Protocol, command: &str) -> Result<String, RouterError> {
        if !self.handlers.lock().contains_key(&protocol) {
            return Err(RouterError::ProtocolNotEnabled(protocol));
        }
        self.bridge.execute_command(protocol, command)
    }

    /// Apply a revalidated configuration: interfaces are merged with
    /// last-write-wins, and each configured protocol instance is rebuilt
    /// (restarting it if it was running).
    pub fn update_config(&self, config: RouterConfig) -> Result<(), RouterError> {
        config.validate()?;
        for iface in &config.interfaces {
            self.interfaces.lock().add_interface(iface)?;
        }
        let sections = [
            config.protocols.bgp.clone().map(ProtocolConfig::Bgp),
            config.protocols.ospf.clone().map(ProtocolConfig::Ospf),
            config.protocols.isis.clone().map(ProtocolConfig::Isis),
        ];
        for cfg in sections.into_iter().flatten() {
            let protocol = cfg.protocol();
            let was_running = self
                .handlers
                .lock()
                .get(&protocol)
                .is_some_and(|h| h.is_running());
            self.install_handler(cfg)?;
            if was_running {
                let handlers = self.handlers.lock();
                if let Some(handler) = handlers.get(&protocol) {
                    handler.start()?;
                }
            }
        }
        *self.config.lock() = config;
        info!("Configuration updated");
        Ok(())
    }
}

impl Drop for RouterCore {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(e) = self.stop() {
                error!("Shutdown on drop failed: {e}");
            }
        }
    }
}
