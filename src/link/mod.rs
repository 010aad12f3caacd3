//! # Fleet Link
//!
//! The connection supervisor and message pump at the heart of the crate.
//! [`FleetLink`] owns the transport session, the routing table, both
//! store-and-forward queues and the node registry, and drives all of
//! them from a single synchronous [`tick`](FleetLink::tick).
//!
//! The link never reads the clock itself. The caller passes `now` into
//! `connect` and `tick`, which keeps the core deterministic and lets
//! tests run on synthetic time.
//!
//! # Tick Phases
//!
//! Each tick runs, in order: reconcile the announced state with the
//! transport, attempt a reconnect if one is due, pull inbound traffic,
//! flush the outgoing queue, dispatch the incoming queue, emit the
//! heartbeat and discovery beacons that are due, and sweep the registry
//! for stale peers.

pub mod traits;


use embassy_time::{Duration, Instant};
use heapless::Vec;

use crate::config::{
    DISCOVERY_PERIOD, HEARTBEAT_PERIOD, INCOMING_DRAIN_MAX, LinkConfig, OUTGOING_FLUSH_MAX,
    RECONNECT_BACKOFF, STALE_AFTER, Vitals,
};
use crate::error::LinkError;
use crate::proto::{
    self, Command, DiscoveryAnnounce, Heartbeat, MAX_STATUS_LEN, MAX_URL_LEN, MAX_VERSION_LEN,
    OtaNotice, QoS, StatusUpdate, WillMessage,
};
use crate::queue::{MAX_PAYLOAD_LEN, MessageQueue, QueuedMessage};
use crate::registry::{NodeRegistry, ObserveOutcome, PeerNode};
use crate::router::{Route, Router};
use crate::topic::{self, TopicBuf};
use crate::transport::{ConnectRequest, Inbox, LastWill, Transport};

pub use traits::{FleetHandler, HandlerPair, InboundMessage, NoopHandler};

/// QoS used for every subscription the link installs.
const SUBSCRIBE_QOS: QoS = QoS::AtLeastOnce;

/// Session lifecycle as seen at the end of the last tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    /// No live session: the initial state, the post-`disconnect` state,
    /// and where a lost session lands while a reconnect is pending.
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// The session is up.
    Connected,
    /// The last connect attempt failed; `tick` retries once the
    /// backoff elapses.
    Error,
}

/// Running totals kept by the link. All counters saturate at `u32::MAX`
/// in the sense that nobody resets them; they exist for diagnostics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStats {
    /// Messages handed to the transport, directly or via flush.
    pub sent: u32,
    /// Inbound messages dispatched out of the incoming queue.
    pub received: u32,
    /// Queue entries discarded to make room for newer ones.
    pub evicted: u32,
    /// Inbound payloads dropped as undecodable or oversized.
    pub malformed: u32,
    /// Outbound messages dropped because they never fit the wire limits.
    pub dropped: u32,
    /// Successful session establishments, the first one included.
    pub reconnects: u32,
}

/// [`FleetLink`] with fleet-sized capacities: 16 subscriptions, 100
/// messages per queue, 100 registry slots.
///
/// Queue storage is inline at roughly 0.6 KiB per entry, so this
/// profile spends about 120 KiB on its two queues and fits the Wi-Fi
/// class parts the fleet runs on. Tighter targets should instantiate
/// [`FleetLink`] with a smaller `QUEUE_DEPTH`.
pub type DefaultFleetLink<T> = FleetLink<T, 16, 100, 100>;

/// Messaging and discovery core for one node of the fleet.
///
/// Generic over the transport and three capacities: the subscription
/// table, the depth of each store-and-forward queue, and the registry.
/// [`DefaultFleetLink`] picks sane values for all three.
///
/// # Example
///
/// ```ignore
/// let identity = Identity::new("CENTRAL", NodeRole::Coordinator).unwrap();
/// let mut link = DefaultFleetLink::new(transport, LinkConfig::new(identity));
/// let mut handler = Coordinator::new();
///
/// let _ = link.connect(Instant::now(), &mut handler);
/// loop {
///     link.tick(Instant::now(), &mut handler);
///     Timer::after_millis(50).await;
/// }
/// ```
pub struct FleetLink<T, const MAX_SUBS: usize, const QUEUE_DEPTH: usize, const MAX_NODES: usize>
where
    T: Transport,
{
    transport: T,
    config: LinkConfig,
    state: ConnectionState,
    reconnect_enabled: bool,
    router: Router<MAX_SUBS>,
    outgoing: MessageQueue<QUEUE_DEPTH>,
    incoming: MessageQueue<QUEUE_DEPTH>,
    registry: NodeRegistry<MAX_NODES>,
    stats: LinkStats,
    /// Timestamp source for outbound envelopes, refreshed on every
    /// `connect` and `tick`.
    clock: Instant,
    last_connect_attempt: Option<Instant>,
    last_heartbeat: Option<Instant>,
    last_discovery: Option<Instant>,
}

impl<T, const MAX_SUBS: usize, const QUEUE_DEPTH: usize, const MAX_NODES: usize>
    FleetLink<T, MAX_SUBS, QUEUE_DEPTH, MAX_NODES>
where
    T: Transport,
{
    /// Creates a link with the fleet's baseline routing table installed:
    /// this node's command channel, the broadcast channel, discovery,
    /// heartbeats, and the firmware notice topic when the node is OTA
    /// capable. Nothing touches the network until `connect`.
    pub fn new(transport: T, config: LinkConfig) -> Self {
        let mut link = Self {
            transport,
            config,
            state: ConnectionState::Disconnected,
            reconnect_enabled: false,
            router: Router::new(),
            outgoing: MessageQueue::new(),
            incoming: MessageQueue::new(),
            registry: NodeRegistry::new(),
            stats: LinkStats::default(),
            clock: Instant::from_ticks(0),
            last_connect_attempt: None,
            last_heartbeat: None,
            last_discovery: None,
        };
        link.install_baseline_routes();
        link
    }

    fn install_baseline_routes(&mut self) {
        let base = self.config.base_topic();
        let node_id = self.config.identity.node_id.as_str();
        let own_commands = topic::node_command_filter(base, node_id);
        let broadcasts = topic::fleet_command_filter(base);
        let discovery = topic::discovery(base);
        let heartbeats = topic::heartbeat_filter(base);
        let firmware = self.config.capabilities.ota.then(|| topic::ota_available(base));

        for (pattern, route) in [
            (own_commands, Route::NodeCommand),
            (broadcasts, Route::FleetCommand),
            (discovery, Route::Discovery),
            (heartbeats, Route::Heartbeat),
            (firmware.flatten(), Route::OtaEvent),
        ] {
            if let Some(pattern) = pattern {
                let _ = self.router.subscribe(pattern.as_str(), route);
            }
        }
    }

    /// Opens the session and enables automatic reconnects.
    ///
    /// On success the link publishes a retained online status, replays
    /// every subscription, notifies the handler, and broadcasts a
    /// discovery announce if discovery is enabled. On failure the link
    /// enters [`ConnectionState::Error`] and the next `tick` retries
    /// once the backoff has elapsed.
    pub fn connect(
        &mut self,
        now: Instant,
        handler: &mut dyn FleetHandler,
    ) -> Result<(), LinkError<T::Error>> {
        self.reconnect_enabled = true;
        if self.state == ConnectionState::Connected {
            return Ok(());
        }
        self.clock = now;
        self.last_connect_attempt = Some(now);
        self.try_connect(now, handler)
    }

    fn try_connect(
        &mut self,
        now: Instant,
        handler: &mut dyn FleetHandler,
    ) -> Result<(), LinkError<T::Error>> {
        self.state = ConnectionState::Connecting;

        let node_id = self.config.identity.node_id.as_str();
        let Some(will_topic) = topic::status(self.config.base_topic(), node_id) else {
            self.state = ConnectionState::Error;
            return Err(LinkError::BufferTooSmall);
        };
        let will = WillMessage { node_id, status: "offline", reason: "connection_lost" };
        let mut will_buf = [0u8; 128];
        let will_len = match proto::encode(&will, &mut will_buf) {
            Ok(len) => len,
            Err(_) => {
                self.state = ConnectionState::Error;
                return Err(LinkError::BufferTooSmall);
            }
        };

        let request = ConnectRequest {
            client_id: node_id,
            keep_alive_secs: self.config.keep_alive_secs,
            credentials: self.config.credentials(),
            last_will: Some(LastWill {
                topic: will_topic.as_str(),
                payload: &will_buf[..will_len],
                qos: QoS::AtLeastOnce,
                retain: true,
            }),
        };

        if let Err(err) = self.transport.connect(&request) {
            warn!("broker connect failed");
            self.state = ConnectionState::Error;
            return Err(LinkError::ConnectFailed(err));
        }

        self.state = ConnectionState::Connected;
        self.stats.reconnects += 1;
        self.last_heartbeat = Some(now);
        info!("connected to broker as {}", self.config.identity.node_id.as_str());

        let vitals = handler.vitals();
        self.publish_status("online", &vitals);
        self.replay_subscriptions();
        handler.on_connection_change(true);
        if self.config.discovery {
            self.broadcast_discovery_at(now);
        }
        Ok(())
    }

    fn replay_subscriptions(&mut self) {
        for sub in self.router.iter() {
            if self.transport.subscribe(sub.pattern.as_str(), SUBSCRIBE_QOS).is_err() {
                warn!("subscribe failed: {}", sub.pattern.as_str());
            }
        }
    }

    /// Publishes a retained offline status, closes the session, and
    /// disables automatic reconnects.
    pub fn disconnect(&mut self, handler: &mut dyn FleetHandler) {
        self.reconnect_enabled = false;
        if self.state == ConnectionState::Connected {
            let vitals = handler.vitals();
            self.publish_status("offline", &vitals);
            self.transport.disconnect();
            handler.on_connection_change(false);
        }
        self.state = ConnectionState::Disconnected;
        info!("disconnected from broker");
    }

    /// Runs one pass of the link's periodic work. Call this from the
    /// main loop at a steady cadence; every deadline below one tick of
    /// resolution is checked against the `now` passed in here.
    pub fn tick(&mut self, now: Instant, handler: &mut dyn FleetHandler) {
        self.clock = now;

        // A session can die between ticks without any call failing.
        if self.state == ConnectionState::Connected && !self.transport.is_connected() {
            warn!("broker session lost");
            self.state = ConnectionState::Disconnected;
            handler.on_connection_change(false);
        }

        if self.state != ConnectionState::Connected
            && self.reconnect_enabled
            && due(self.last_connect_attempt, now, RECONNECT_BACKOFF)
        {
            self.last_connect_attempt = Some(now);
            info!("reconnecting to broker");
            let _ = self.try_connect(now, handler);
        }

        if self.state == ConnectionState::Connected {
            self.poll_transport();
            self.flush_outgoing();
        }

        self.drain_incoming(now, handler);

        if self.state == ConnectionState::Connected {
            if due(self.last_heartbeat, now, HEARTBEAT_PERIOD) {
                let vitals = handler.vitals();
                self.send_heartbeat(now, &vitals);
            }
            if self.config.discovery && due(self.last_discovery, now, DISCOVERY_PERIOD) {
                self.broadcast_discovery_at(now);
            }
        }

        let stale = self.registry.prune_stale(now, STALE_AFTER);
        if stale > 0 {
            info!("{} nodes went stale", stale);
        }
    }

    fn poll_transport(&mut self) {
        let mut inbox =
            QueueInbox { queue: &mut self.incoming, now: self.clock, evicted: 0, oversize: 0 };
        if self.transport.poll(&mut inbox).is_err() {
            warn!("transport poll failed");
        }
        let (evicted, oversize) = (inbox.evicted, inbox.oversize);
        if evicted > 0 {
            self.stats.evicted += evicted;
            warn!("incoming queue overflow, dropped {} oldest", evicted);
        }
        if oversize > 0 {
            self.stats.malformed += oversize;
            warn!("dropped {} oversized inbound messages", oversize);
        }
    }

    fn flush_outgoing(&mut self) {
        let mut sent = 0;
        while sent < OUTGOING_FLUSH_MAX {
            let delivered = match self.outgoing.front() {
                Some(message) => self
                    .transport
                    .publish(
                        message.topic.as_str(),
                        &message.payload,
                        message.qos,
                        message.retain,
                    )
                    .is_ok(),
                None => break,
            };
            if !delivered {
                // Leave the message at the front and retry next tick.
                debug!("flush stalled, {} messages parked", self.outgoing.len());
                break;
            }
            self.outgoing.pop();
            self.stats.sent += 1;
            sent += 1;
        }
    }

    fn drain_incoming(&mut self, now: Instant, handler: &mut dyn FleetHandler) {
        let mut processed = 0;
        while processed < INCOMING_DRAIN_MAX {
            let Some(message) = self.incoming.pop() else {
                break;
            };
            processed += 1;
            self.stats.received += 1;
            self.dispatch(&message, now, handler);
        }
    }

    fn dispatch(&mut self, message: &QueuedMessage, now: Instant, handler: &mut dyn FleetHandler) {
        let topic = message.topic.as_str();
        let mut routes: Vec<Route, MAX_SUBS> = Vec::new();
        for route in self.router.matches(topic) {
            let _ = routes.push(route);
        }
        if routes.is_empty() {
            trace!("no route for {}", topic);
            return;
        }
        for route in routes {
            match route {
                Route::Discovery => self.handle_discovery(&message.payload, now, handler),
                Route::Heartbeat => self.handle_heartbeat(topic, now),
                route => handler.on_route(
                    route,
                    &InboundMessage {
                        topic,
                        payload: &message.payload,
                        retained: message.retain,
                    },
                ),
            }
        }
    }

    fn handle_discovery(&mut self, payload: &[u8], now: Instant, handler: &mut dyn FleetHandler) {
        let announce: DiscoveryAnnounce = match proto::decode(payload) {
            Ok(announce) => announce,
            Err(_) => {
                self.stats.malformed += 1;
                warn!("malformed discovery announce");
                return;
            }
        };
        if announce.node_id == self.config.identity.node_id {
            return;
        }
        match self.registry.observe(&announce, now) {
            Some(ObserveOutcome::Discovered) => {
                info!("discovered node {}", announce.node_id.as_str());
                if let Some(node) = self.registry.get(announce.node_id.as_str()) {
                    handler.on_node_discovered(node);
                }
            }
            Some(ObserveOutcome::Refreshed) => {
                trace!("refreshed node {}", announce.node_id.as_str());
            }
            None => {
                warn!("registry full, ignoring node {}", announce.node_id.as_str());
            }
        }
    }

    fn handle_heartbeat(&mut self, topic: &str, now: Instant) {
        let Some(node_id) = topic::leaf(topic) else {
            return;
        };
        if node_id == self.config.identity.node_id.as_str() {
            return;
        }
        if self.registry.touch(node_id, now) {
            trace!("heartbeat from {}", node_id);
        }
    }

    // ===== Outbound facade =====

    /// Publishes one message, or parks it in the outgoing queue when
    /// there is no session or the transport refuses it.
    ///
    /// Returns `true` only when the message went out right now; `false`
    /// means it was queued (or dropped if it never fit the wire limits).
    pub fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS, retain: bool) -> bool {
        if self.state != ConnectionState::Connected {
            debug!("offline, queueing {}", topic);
            self.enqueue_outgoing(topic, payload, qos, retain);
            return false;
        }
        match self.transport.publish(topic, payload, qos, retain) {
            Ok(()) => {
                self.stats.sent += 1;
                true
            }
            Err(_) => {
                warn!("publish failed, queueing {}", topic);
                self.enqueue_outgoing(topic, payload, qos, retain);
                false
            }
        }
    }

    /// Publishes immediately or not at all: nothing is queued on
    /// failure. Use this for time-sensitive records that must not be
    /// replayed after a reconnect, like update progress.
    pub fn publish_now(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), LinkError<T::Error>> {
        if self.state != ConnectionState::Connected {
            return Err(LinkError::NotConnected);
        }
        self.transport.publish(topic, payload, qos, retain)?;
        self.stats.sent += 1;
        Ok(())
    }

    fn enqueue_outgoing(&mut self, topic: &str, payload: &[u8], qos: QoS, retain: bool) {
        match QueuedMessage::new(topic, payload, qos, retain, self.clock) {
            Some(message) => {
                if self.outgoing.push(message) {
                    self.stats.evicted += 1;
                    warn!("outgoing queue overflow, dropped oldest");
                }
            }
            None => {
                self.stats.dropped += 1;
                warn!("message too large to queue: {}", topic);
            }
        }
    }

    /// Publishes this node's retained status record.
    pub fn publish_status(&mut self, status: &str, vitals: &Vitals) -> bool {
        let node_id = self.config.identity.node_id.as_str();
        let topic = topic::status(self.config.base_topic(), node_id);
        let (Some(topic), Some(status)) = (topic, topic::bounded::<MAX_STATUS_LEN>(status)) else {
            self.stats.dropped += 1;
            return false;
        };
        let record = StatusUpdate {
            node_id: self.config.identity.node_id.clone(),
            status,
            timestamp: self.clock.as_millis(),
            ip: self.config.identity.ip.clone(),
            rssi: vitals.rssi,
            heap: vitals.heap,
        };
        let mut buf = [0u8; MAX_PAYLOAD_LEN];
        match proto::encode(&record, &mut buf) {
            Ok(len) => self.publish(topic.as_str(), &buf[..len], QoS::AtLeastOnce, true),
            Err(_) => {
                self.stats.dropped += 1;
                false
            }
        }
    }

    /// Publishes an opaque telemetry payload on this node's telemetry
    /// topic. The link does not interpret the bytes.
    pub fn publish_telemetry(&mut self, payload: &[u8]) -> bool {
        let node_id = self.config.identity.node_id.as_str();
        let Some(topic) = topic::telemetry(self.config.base_topic(), node_id) else {
            self.stats.dropped += 1;
            return false;
        };
        self.publish(topic.as_str(), payload, QoS::AtMostOnce, false)
    }

    /// Sends a command to one node's channel. Addressing is purely
    /// topical: the target does not have to be in the registry, so a
    /// node can be commanded before its first announce arrives. The
    /// inner `bool` has [`publish`](Self::publish) semantics.
    pub fn send_command_to_node(
        &mut self,
        node_id: &str,
        command: &Command,
    ) -> Result<bool, LinkError<T::Error>> {
        self.send_command_on(topic::command(self.config.base_topic(), node_id), command)
    }

    /// Sends a command to every node listening on the broadcast channel.
    pub fn broadcast_command(&mut self, command: &Command) -> bool {
        self.send_command_on(topic::fleet_command(self.config.base_topic()), command)
            .unwrap_or(false)
    }

    /// Sends a command to every node subscribed to a zone.
    pub fn publish_to_zone(&mut self, zone_id: &str, command: &Command) -> bool {
        self.send_command_on(topic::zone(self.config.base_topic(), zone_id), command)
            .unwrap_or(false)
    }

    fn send_command_on(
        &mut self,
        topic: Option<TopicBuf>,
        command: &Command,
    ) -> Result<bool, LinkError<T::Error>> {
        let Some(topic) = topic else {
            self.stats.dropped += 1;
            return Err(LinkError::BufferTooSmall);
        };
        let mut buf = [0u8; MAX_PAYLOAD_LEN];
        let from = self.config.identity.node_id.as_str();
        let len = match proto::encode_command(from, command, self.clock.as_millis(), &mut buf) {
            Ok(len) => len,
            Err(_) => {
                self.stats.dropped += 1;
                return Err(LinkError::BufferTooSmall);
            }
        };
        Ok(self.publish(topic.as_str(), &buf[..len], QoS::AtMostOnce, false))
    }

    /// Starts routing a zone's command channel to
    /// [`Route::ZoneCommand`]. Takes effect on the broker immediately
    /// when connected, otherwise at the next successful connect.
    pub fn subscribe_to_zone(&mut self, zone_id: &str) -> Result<(), LinkError<T::Error>> {
        let Some(filter) = topic::zone_filter(self.config.base_topic(), zone_id) else {
            return Err(LinkError::BufferTooSmall);
        };
        self.subscribe(filter.as_str(), Route::ZoneCommand)
    }

    /// Binds `pattern` to `route` and mirrors the subscription to the
    /// broker. The binding is always recorded locally first, so it
    /// survives reconnects even when the broker call fails or there is
    /// no session yet.
    pub fn subscribe(&mut self, pattern: &str, route: Route) -> Result<(), LinkError<T::Error>> {
        if !self.router.subscribe(pattern, route) {
            return Err(LinkError::BufferTooSmall);
        }
        if self.state == ConnectionState::Connected {
            self.transport.subscribe(pattern, SUBSCRIBE_QOS)?;
            debug!("subscribed to {}", pattern);
        }
        Ok(())
    }

    /// Removes a binding and, when connected, the broker subscription.
    pub fn unsubscribe(&mut self, pattern: &str) -> Result<(), LinkError<T::Error>> {
        self.router.unsubscribe(pattern);
        if self.state == ConnectionState::Connected {
            self.transport.unsubscribe(pattern)?;
        }
        Ok(())
    }

    /// Publishes a retained firmware notice for the whole fleet.
    pub fn publish_ota_notification(&mut self, version: &str, url: &str) -> bool {
        let topic = topic::ota_available(self.config.base_topic());
        let (Some(topic), Some(version), Some(url)) = (
            topic,
            topic::bounded::<MAX_VERSION_LEN>(version),
            topic::bounded::<MAX_URL_LEN>(url),
        ) else {
            self.stats.dropped += 1;
            return false;
        };
        let notice = OtaNotice { version, url, timestamp: self.clock.as_millis() };
        let mut buf = [0u8; MAX_PAYLOAD_LEN];
        match proto::encode(&notice, &mut buf) {
            Ok(len) => self.publish(topic.as_str(), &buf[..len], QoS::AtLeastOnce, true),
            Err(_) => {
                self.stats.dropped += 1;
                false
            }
        }
    }

    /// Asks one node to update itself to `version`.
    pub fn request_ota_update(
        &mut self,
        node_id: &str,
        version: &str,
    ) -> Result<bool, LinkError<T::Error>> {
        let Some(version) = topic::bounded::<MAX_VERSION_LEN>(version) else {
            return Err(LinkError::BufferTooSmall);
        };
        self.send_command_to_node(node_id, &Command::OtaUpdate { version })
    }

    /// Broadcasts a discovery announce right now, independent of the
    /// periodic schedule.
    pub fn broadcast_discovery(&mut self) -> bool {
        self.broadcast_discovery_at(self.clock)
    }

    fn broadcast_discovery_at(&mut self, now: Instant) -> bool {
        let Some(topic) = topic::discovery(self.config.base_topic()) else {
            self.stats.dropped += 1;
            return false;
        };
        let identity = &self.config.identity;
        let announce = DiscoveryAnnounce {
            node_id: identity.node_id.clone(),
            role: identity.role,
            ip: identity.ip.clone(),
            mac: identity.mac.clone(),
            version: identity.version.clone(),
            capabilities: self.config.capabilities,
        };
        // The schedule advances even when the publish fails; the next
        // announce comes one period later either way.
        self.last_discovery = Some(now);
        let mut buf = [0u8; MAX_PAYLOAD_LEN];
        match proto::encode(&announce, &mut buf) {
            Ok(len) => {
                debug!("broadcasting discovery announce");
                self.publish(topic.as_str(), &buf[..len], QoS::AtMostOnce, false)
            }
            Err(_) => {
                self.stats.dropped += 1;
                false
            }
        }
    }

    /// Enables or disables periodic discovery announces. Enabling while
    /// connected broadcasts one immediately.
    pub fn set_discovery(&mut self, enabled: bool) {
        self.config.discovery = enabled;
        info!("auto discovery: {}", enabled);
        if enabled && self.state == ConnectionState::Connected {
            self.broadcast_discovery();
        }
    }

    fn send_heartbeat(&mut self, now: Instant, vitals: &Vitals) {
        // The schedule advances even when the send fails.
        self.last_heartbeat = Some(now);
        let node_id = self.config.identity.node_id.as_str();
        let Some(topic) = topic::heartbeat(self.config.base_topic(), node_id) else {
            self.stats.dropped += 1;
            return;
        };
        let beacon = Heartbeat {
            node_id: self.config.identity.node_id.clone(),
            timestamp: self.clock.as_millis(),
            heap: vitals.heap,
        };
        let mut buf = [0u8; MAX_PAYLOAD_LEN];
        match proto::encode(&beacon, &mut buf) {
            Ok(len) => {
                self.publish(topic.as_str(), &buf[..len], QoS::AtMostOnce, false);
            }
            Err(_) => self.stats.dropped += 1,
        }
    }

    // ===== Introspection =====

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// Every peer the registry knows, discovery order.
    pub fn nodes(&self) -> &[PeerNode] {
        self.registry.nodes()
    }

    pub fn node(&self, node_id: &str) -> Option<&PeerNode> {
        self.registry.get(node_id)
    }

    /// Peers currently considered alive.
    pub fn online_nodes(&self) -> usize {
        self.registry.online_count()
    }

    pub fn pending_outgoing(&self) -> usize {
        self.outgoing.len()
    }

    pub fn pending_incoming(&self) -> usize {
        self.incoming.len()
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Escape hatch for platform-specific transport access.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable escape hatch, mostly useful in tests and bring-up.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

// Copies inbound transport traffic into the incoming queue, counting
// what could not be kept.
struct QueueInbox<'a, const DEPTH: usize> {
    queue: &'a mut MessageQueue<DEPTH>,
    now: Instant,
    evicted: u32,
    oversize: u32,
}

impl<const DEPTH: usize> Inbox for QueueInbox<'_, DEPTH> {
    fn accept(&mut self, topic: &str, payload: &[u8], retained: bool) {
        match QueuedMessage::new(topic, payload, QoS::AtMostOnce, retained, self.now) {
            Some(message) => {
                if self.queue.push(message) {
                    self.evicted += 1;
                }
            }
            None => self.oversize += 1,
        }
    }
}

fn due(last: Option<Instant>, now: Instant, period: Duration) -> bool {
    match last {
        Some(then) => now
            .as_ticks()
            .checked_sub(then.as_ticks())
            .is_some_and(|age| age >= period.as_ticks()),
        None => true,
    }
}
