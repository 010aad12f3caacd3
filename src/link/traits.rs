//! Fleet handler trait and utilities.
//!
//! This module defines the object-safe `FleetHandler` trait through which
//! firmware reacts to everything the link does on its behalf: routed
//! messages, discovered peers and session transitions.
//!
//! # Object Safety
//!
//! The `FleetHandler` trait is designed to be dyn-compatible, meaning you
//! can pass `&mut dyn FleetHandler` into the link on every call. This is
//! essential for `no_std` embedded environments where you want to:
//!
//! - Keep the link free of a handler type parameter
//! - Store handlers in `StaticCell` and share them across tasks
//! - Compose independent handlers without boxing
//!
//! # Re-entrancy
//!
//! Handler methods are called from inside [`FleetLink::tick`], so they
//! must not call back into the link. Record what happened, then act on it
//! from the main loop once `tick` returns.
//!
//! [`FleetLink::tick`]: crate::link::FleetLink::tick

use crate::config::Vitals;
use crate::registry::PeerNode;
use crate::router::Route;

/// One inbound message as delivered to the firmware.
///
/// The borrows are only valid for the duration of the handler call;
/// copy whatever must outlive it.
#[derive(Debug, Clone, Copy)]
pub struct InboundMessage<'a> {
    pub topic: &'a str,
    pub payload: &'a [u8],
    /// Set when the broker delivered this from its retained store.
    pub retained: bool,
}

/// Object-safe trait for reacting to fleet traffic and session events.
///
/// # Example
///
/// ```ignore
/// struct Luminaria {
///     brightness: u8,
/// }
///
/// impl FleetHandler for Luminaria {
///     fn on_route(&mut self, route: Route, msg: &InboundMessage<'_>) {
///         if let Route::NodeCommand | Route::FleetCommand = route {
///             if let Ok(cmd) = proto::decode_command(msg.payload) {
///                 // apply cmd.command to the lamp driver
///             }
///         }
///     }
///
///     fn vitals(&mut self) -> Vitals {
///         Vitals { rssi: wifi_rssi(), heap: free_heap() }
///     }
/// }
/// ```
pub trait FleetHandler {
    /// Handle one routed inbound message.
    ///
    /// Called once per matching subscription, so a message crossing
    /// several patterns arrives several times with different routes.
    /// Discovery announces and heartbeats are consumed by the link and
    /// never reach this method.
    fn on_route(&mut self, route: Route, msg: &InboundMessage<'_>);

    /// Called when a node id appears in the registry for the first time.
    ///
    /// Re-announces from known nodes, including nodes currently marked
    /// offline, do not fire this. The default implementation does nothing.
    fn on_node_discovered(&mut self, _node: &PeerNode) {}

    /// Called on session transitions: `true` once a connect completes,
    /// `false` when the session is lost or closed. Individual failed
    /// connect attempts do not fire this. The default implementation
    /// does nothing.
    fn on_connection_change(&mut self, _connected: bool) {}

    /// Supplies live readings for status records and heartbeats.
    ///
    /// The default implementation reports zeros, which the fleet reads
    /// as "unknown".
    fn vitals(&mut self) -> Vitals {
        Vitals::default()
    }
}

/// A no-op handler that ignores everything.
///
/// Useful as a placeholder or for testing.
pub struct NoopHandler;

impl FleetHandler for NoopHandler {
    fn on_route(&mut self, _route: Route, _msg: &InboundMessage<'_>) {}
}

/// A composite handler that combines two handlers into one.
///
/// Both handlers see every routed message and every event. Vitals come
/// from `first`; keep the handler that owns the real readings in that
/// slot.
pub struct HandlerPair<H1, H2> {
    /// First handler, also the vitals source.
    pub first: H1,
    /// Second handler.
    pub second: H2,
}

impl<H1, H2> HandlerPair<H1, H2> {
    /// Create a combined handler from two handlers.
    pub fn new(first: H1, second: H2) -> Self {
        Self { first, second }
    }
}

impl<H1, H2> FleetHandler for HandlerPair<H1, H2>
where
    H1: FleetHandler,
    H2: FleetHandler,
{
    fn on_route(&mut self, route: Route, msg: &InboundMessage<'_>) {
        self.first.on_route(route, msg);
        self.second.on_route(route, msg);
    }

    fn on_node_discovered(&mut self, node: &PeerNode) {
        self.first.on_node_discovered(node);
        self.second.on_node_discovered(node);
    }

    fn on_connection_change(&mut self, connected: bool) {
        self.first.on_connection_change(connected);
        self.second.on_connection_change(connected);
    }

    fn vitals(&mut self) -> Vitals {
        self.first.vitals()
    }
}

/// Blanket implementation for mutable references to trait objects.
///
/// This allows using `&mut dyn FleetHandler` wherever `FleetHandler` is
/// expected.
impl<H: FleetHandler + ?Sized> FleetHandler for &mut H {
    fn on_route(&mut self, route: Route, msg: &InboundMessage<'_>) {
        (**self).on_route(route, msg)
    }

    fn on_node_discovered(&mut self, node: &PeerNode) {
        (**self).on_node_discovered(node)
    }

    fn on_connection_change(&mut self, connected: bool) {
        (**self).on_connection_change(connected)
    }

    fn vitals(&mut self) -> Vitals {
        (**self).vitals()
    }
}
