// SPDX-License-Identifier: Apache-2.0
// Copyright RouterSim Authors

//! Event dispatching.
//!
//! Handlers and the bridge produce [`ProtocolEvent`]s on a bounded channel;
//! a single consumer thread drains the channel and invokes the registered
//! callbacks. Producers never call callbacks directly, so a slow or
//! reentrant callback cannot corrupt a handler's adjacency loop. Delivery
//! is at-least-once, in the order detected by the producing thread.

use chrono::{DateTime, Utc};
use config::Protocol;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::neighbors::Neighbor;
use crate::rib::Route;

#[allow(unused)]
use tracing::{debug, error, info, warn};

const EVENT_QUEUE_DEPTH: usize = 1024;

/// What happened.
#[derive(Clone, Debug)]
pub enum EventKind {
    RouteAdded(Route),
    RouteRemoved(Route),
    NeighborUp(Neighbor),
    NeighborDown(Neighbor),
    Error { protocol: Protocol, message: String },
}

/// An event with the time it was produced.
#[derive(Clone, Debug)]
pub struct ProtocolEvent {
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
}

impl ProtocolEvent {
    #[must_use]
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
        }
    }
}

/// Called with a route and whether it was added (true) or removed.
pub type RouteCallback = Box<dyn Fn(&Route, bool) + Send>;
/// Called with a neighbor and whether it came up (true) or went down.
pub type NeighborCallback = Box<dyn Fn(&Neighbor, bool) + Send>;

#[derive(Default)]
struct Callbacks {
    route: Option<RouteCallback>,
    neighbor: Option<NeighborCallback>,
}

/// What travels on the dispatch channel: an event, or the shutdown
/// sentinel that flushes everything queued ahead of it.
enum DispatchMsg {
    Event(ProtocolEvent),
    Shutdown,
}

/// Cloneable producer handle given to handlers and the bridge.
#[derive(Clone)]
pub struct EventSender {
    tx: kanal::Sender<DispatchMsg>,
}

impl EventSender {
    /// Queue an event. Errors only when the dispatcher has shut down,
    /// which producers treat as "nobody is listening any more".
    pub fn emit(&self, kind: EventKind) {
        if self
            .tx
            .send(DispatchMsg::Event(ProtocolEvent::new(kind)))
            .is_err()
        {
            debug!("Event dropped: dispatcher is shut down");
        }
    }
}

/// Owns the consumer thread and the callback registry.
pub struct EventDispatcher {
    tx: kanal::Sender<DispatchMsg>,
    callbacks: Arc<Mutex<Callbacks>>,
    consumer: Option<JoinHandle<()>>,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDispatcher {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = kanal::bounded::<DispatchMsg>(EVENT_QUEUE_DEPTH);
        let callbacks: Arc<Mutex<Callbacks>> = Arc::default();
        let cbs = Arc::clone(&callbacks);
        let consumer = std::thread::Builder::new()
            .name("event-dispatch".to_owned())
            .spawn(move || {
                while let Ok(msg) = rx.recv() {
                    match msg {
                        DispatchMsg::Event(event) => Self::deliver(&cbs, &event),
                        DispatchMsg::Shutdown => break,
                    }
                }
                debug!("Event dispatcher exiting");
            })
            .ok();
        Self {
            tx,
            callbacks,
            consumer,
        }
    }

    fn deliver(callbacks: &Mutex<Callbacks>, event: &ProtocolEvent) {
        let callbacks = callbacks.lock();
        match &event.kind {
            EventKind::RouteAdded(route) => {
                if let Some(cb) = &callbacks.route {
                    cb(route, true);
                }
            }
            EventKind::RouteRemoved(route) => {
                if let Some(cb) = &callbacks.route {
                    cb(route, false);
                }
            }
            EventKind::NeighborUp(neighbor) => {
                if let Some(cb) = &callbacks.neighbor {
                    cb(neighbor, true);
                }
            }
            EventKind::NeighborDown(neighbor) => {
                if let Some(cb) = &callbacks.neighbor {
                    cb(neighbor, false);
                }
            }
            EventKind::Error { protocol, message } => {
                warn!("{protocol}: {message}");
            }
        }
    }

    /// Producer handle for handlers and the bridge.
    #[must_use]
    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    pub fn set_route_update_callback(&self, cb: RouteCallback) {
        self.callbacks.lock().route = Some(cb);
    }

    pub fn set_neighbor_update_callback(&self, cb: NeighborCallback) {
        self.callbacks.lock().neighbor = Some(cb);
    }

    /// Flush and join the consumer thread. The shutdown sentinel queues
    /// behind every event emitted so far, so those are all delivered
    /// before the thread exits; the channel is closed afterwards so late
    /// producers fail fast instead of filling a dead queue.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.consumer.take() {
            let _ = self.tx.send(DispatchMsg::Shutdown);
            if handle.join().is_err() {
                error!("Event dispatcher thread panicked");
            }
        }
        self.tx.close();
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
