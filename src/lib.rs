//! # Fleet Messaging Core for Streetlight Networks
//!
//! `farola-net` is a `no_std` compatible messaging and discovery core for
//! fleets of networked luminaires ("luces"), designed for embedded targets
//! in the [Embassy](https://embassy.dev/) ecosystem.
//!
//! ## Core Features
//!
//! - **`no_std` & `no_alloc`:** Designed to run on bare-metal microcontrollers without requiring a
//!   standard library or dynamic memory allocation. Buffers are managed using `heapless`.
//! - **Sans-IO Core:** The link owns no socket and never sleeps. The firmware passes the current
//!   time into [`tick`](link::FleetLink::tick) and the link does everything that is due, which
//!   keeps the whole crate testable on synthetic time.
//! - **Transport Agnostic:** A flexible [`Transport`] trait runs the link over any MQTT-like
//!   pub/sub session, whether that is a TCP stack, a cellular modem, or a radio bridge.
//! - **Store and Forward:** Publishes while offline are parked in a bounded FIFO and flushed
//!   after the next reconnect; overflow drops the oldest entry rather than the newest.
//! - **Node Discovery:** Nodes announce themselves on a shared topic and every link keeps a
//!   registry of its peers, refreshed by heartbeats and swept for staleness.
//! - **Typed Wire Format:** Every payload crosses the wire as a compact JSON record with a typed
//!   counterpart in [`proto`]; nothing else in the crate touches serialization.
//!
//! ## Architecture
//!
//! One [`FleetLink`] per node drives the whole protocol. The firmware hands
//! it a transport and an identity, then calls `tick` from its main loop:
//!
//! ```ignore
//! let identity = Identity::new("LUM_7", NodeRole::Fixture).unwrap();
//! let mut link = DefaultFleetLink::new(transport, LinkConfig::new(identity));
//! let mut handler = Firmware::new();
//!
//! link.connect(Instant::now(), &mut handler)?;
//! loop {
//!     link.tick(Instant::now(), &mut handler);
//!     Timer::after_millis(50).await;
//! }
//! ```
//!
//! Inbound traffic reaches the firmware through the [`FleetHandler`] trait,
//! tagged with the [`Route`] that matched:
//!
//! ```ignore
//! struct Firmware {
//!     dimmer: Dimmer,
//! }
//!
//! impl FleetHandler for Firmware {
//!     fn on_route(&mut self, route: Route, msg: &InboundMessage<'_>) {
//!         if route == Route::NodeCommand {
//!             if let Ok(cmd) = proto::decode_command(msg.payload) {
//!                 self.dimmer.apply(&cmd.command);
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! ## Sizing
//!
//! [`FleetLink`] is generic over the size of its subscription table, its
//! queues, and its registry, so small fixtures and the coordinator can
//! trade RAM for capacity independently. [`DefaultFleetLink`] picks values
//! that fit a hundred-node fleet.

#![no_std]

// Declared first so the logging macros are in scope everywhere else.
mod fmt;

pub mod config;
pub mod error;
pub mod link;
pub mod proto;
pub mod queue;
pub mod registry;
pub mod router;
pub mod topic;
pub mod transport;

// Re-export key types for easier access at the crate root.
pub use config::{Identity, LinkConfig, Vitals};
pub use error::{LinkError, ProtoError};
pub use link::{
    ConnectionState, DefaultFleetLink, FleetHandler, FleetLink, HandlerPair, InboundMessage,
    LinkStats, NoopHandler,
};
pub use proto::{Capabilities, Command, IncomingCommand, NodeId, NodeRole, QoS};
pub use queue::QueuedMessage;
pub use registry::{ObserveOutcome, PeerNode};
pub use router::Route;
pub use topic::TopicBuf;
pub use transport::{ConnectRequest, Credentials, Inbox, LastWill, Transport, TransportError};
