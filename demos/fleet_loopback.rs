//! Example: driving a `FleetLink` over an in-memory transport
//!
//! This example runs the whole protocol loop on a workstation, without
//! a broker or a network stack: a coordinator link connects through a
//! loopback transport, discovers a fixture from an injected announce,
//! loses its session, queues a command while offline, then reconnects
//! and flushes it.
//!
//! # Key Concepts
//!
//! - Implement [`Transport`] over any session-like object
//! - Pass synthetic `Instant`s into `connect()` and `tick()`
//! - Observe traffic and lifecycle events through a [`FleetHandler`]
//!
//! Run with `cargo run --example fleet_loopback`.

use embassy_time::Instant;
use farola_net::proto::{self, DiscoveryAnnounce};
use farola_net::{
    Command, ConnectRequest, DefaultFleetLink, FleetHandler, Identity, InboundMessage, Inbox,
    LinkConfig, NodeRole, PeerNode, QoS, Route, Transport, TransportError, Vitals,
};

/// The only way the loopback session fails: it is not connected.
#[derive(Debug)]
struct Offline;

impl TransportError for Offline {}

/// Broker stand-in. Publishes are printed, subscriptions acknowledged,
/// and anything scripted into `inbound` reaches the link on the next
/// poll.
#[derive(Default)]
struct LoopbackTransport {
    connected: bool,
    inbound: Vec<(String, Vec<u8>)>,
}

impl LoopbackTransport {
    fn inject(&mut self, topic: &str, payload: &[u8]) {
        self.inbound.push((topic.to_owned(), payload.to_vec()));
    }
}

impl Transport for LoopbackTransport {
    type Error = Offline;

    fn connect(&mut self, request: &ConnectRequest<'_>) -> Result<(), Offline> {
        let will = request.last_will.map(|w| w.topic).unwrap_or("-");
        println!("[broker] session for {} (will on {})", request.client_id, will);
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        _qos: QoS,
        retain: bool,
    ) -> Result<(), Offline> {
        if !self.connected {
            return Err(Offline);
        }
        let flag = if retain { " (retained)" } else { "" };
        println!("[broker] {}{} <- {}", topic, flag, String::from_utf8_lossy(payload));
        Ok(())
    }

    fn subscribe(&mut self, filter: &str, _qos: QoS) -> Result<(), Offline> {
        println!("[broker] subscribed {}", filter);
        Ok(())
    }

    fn unsubscribe(&mut self, _filter: &str) -> Result<(), Offline> {
        Ok(())
    }

    fn poll(&mut self, inbox: &mut dyn Inbox) -> Result<(), Offline> {
        for (topic, payload) in self.inbound.drain(..) {
            inbox.accept(&topic, &payload, false);
        }
        Ok(())
    }
}

/// Prints every event the link hands back.
struct Console;

impl FleetHandler for Console {
    fn on_route(&mut self, route: Route, msg: &InboundMessage<'_>) {
        println!("[link]   {:?} on {}", route, msg.topic);
    }

    fn on_node_discovered(&mut self, node: &PeerNode) {
        println!("[link]   discovered {} ({:?})", node.node_id.as_str(), node.role);
    }

    fn on_connection_change(&mut self, connected: bool) {
        println!("[link]   session {}", if connected { "up" } else { "down" });
    }

    fn vitals(&mut self) -> Vitals {
        Vitals { rssi: -61, heap: 150_000 }
    }
}

fn announce(id: &str) -> Vec<u8> {
    let mut node_id = proto::NodeId::new();
    node_id.push_str(id).unwrap();
    let record = DiscoveryAnnounce {
        node_id,
        role: NodeRole::Fixture,
        ip: Default::default(),
        mac: Default::default(),
        version: Default::default(),
        capabilities: Default::default(),
    };
    let mut buf = [0u8; 256];
    let len = proto::encode(&record, &mut buf).unwrap();
    buf[..len].to_vec()
}

fn main() {
    let mut identity = Identity::new("CENTRAL", NodeRole::Coordinator).unwrap();
    identity.set_version("0.7.0");
    identity.set_network("192.168.1.10", "AA:BB:CC:DD:EE:01");

    let mut link = DefaultFleetLink::new(LoopbackTransport::default(), LinkConfig::new(identity));
    let mut console = Console;

    println!("--- connect: will, retained status, subscriptions, announce");
    link.connect(Instant::from_secs(0), &mut console).unwrap();

    println!("--- a fixture announces itself");
    link.transport_mut().inject("luces/discovery", &announce("LUM_7"));
    link.tick(Instant::from_secs(1), &mut console);
    println!("[demo]   online nodes: {}", link.online_nodes());

    println!("--- the session drops; a command queues instead of failing");
    link.transport_mut().connected = false;
    link.tick(Instant::from_secs(2), &mut console);
    let sent = link.send_command_to_node("LUM_7", &Command::On { brightness: 80 }).unwrap();
    println!("[demo]   sent now: {}, queued: {}", sent, link.pending_outgoing());

    println!("--- past the backoff the link reconnects and flushes");
    link.tick(Instant::from_secs(7), &mut console);
    println!("[demo]   queued after reconnect: {}", link.pending_outgoing());
    println!("[demo]   {:?}", link.stats());
}
