//! # Node Registry
//!
//! Tracks every peer that has announced itself on the discovery topic.
//! Entries are never removed at runtime; a node that stops reporting is
//! flipped to offline by the stale sweep and comes back the moment it
//! announces or heartbeats again.

use embassy_time::{Duration, Instant};
use heapless::{String, Vec};

use crate::proto::{
    Capabilities, DiscoveryAnnounce, MAX_ADDR_LEN, MAX_HWADDR_LEN, MAX_VERSION_LEN, NodeId,
    NodeRole,
};

/// Everything the registry knows about one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerNode {
    pub node_id: NodeId,
    pub role: NodeRole,
    pub ip: String<MAX_ADDR_LEN>,
    pub mac: String<MAX_HWADDR_LEN>,
    pub version: String<MAX_VERSION_LEN>,
    pub capabilities: Capabilities,
    pub online: bool,
    pub last_seen: Instant,
}

/// What [`NodeRegistry::observe`] did with an announce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ObserveOutcome {
    /// First announce from this node id.
    Discovered,
    /// Known node, entry updated in place.
    Refreshed,
}

/// Fixed-capacity table of discovered peers.
#[derive(Debug, Default)]
pub struct NodeRegistry<const MAX_NODES: usize> {
    nodes: Vec<PeerNode, MAX_NODES>,
}

impl<const MAX_NODES: usize> NodeRegistry<MAX_NODES> {
    pub const fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Folds a discovery announce into the table.
    ///
    /// Returns `Discovered` only for node ids never seen before; any
    /// repeat announce, including one from a node currently marked
    /// offline, updates the entry and returns `Refreshed`. Returns
    /// `None` when the table is full and the node is new.
    pub fn observe(&mut self, announce: &DiscoveryAnnounce, now: Instant) -> Option<ObserveOutcome> {
        if let Some(node) = self.nodes.iter_mut().find(|n| n.node_id == announce.node_id) {
            node.role = announce.role;
            node.ip = announce.ip.clone();
            node.mac = announce.mac.clone();
            node.version = announce.version.clone();
            node.capabilities = announce.capabilities;
            node.online = true;
            node.last_seen = now;
            return Some(ObserveOutcome::Refreshed);
        }
        let node = PeerNode {
            node_id: announce.node_id.clone(),
            role: announce.role,
            ip: announce.ip.clone(),
            mac: announce.mac.clone(),
            version: announce.version.clone(),
            capabilities: announce.capabilities,
            online: true,
            last_seen: now,
        };
        self.nodes.push(node).ok()?;
        Some(ObserveOutcome::Discovered)
    }

    /// Refreshes liveness for a known node, reviving it if the stale
    /// sweep had flipped it offline. Returns `false` for unknown ids.
    pub fn touch(&mut self, node_id: &str, now: Instant) -> bool {
        match self.nodes.iter_mut().find(|n| n.node_id.as_str() == node_id) {
            Some(node) => {
                node.online = true;
                node.last_seen = now;
                true
            }
            None => false,
        }
    }

    /// Flips nodes that have been silent for longer than `max_age` to
    /// offline. Entries stay in the table. Returns how many flipped.
    pub fn prune_stale(&mut self, now: Instant, max_age: Duration) -> usize {
        let mut flipped = 0;
        for node in self.nodes.iter_mut() {
            if node.online && age_of(now, node.last_seen).is_some_and(|age| age > max_age) {
                node.online = false;
                flipped += 1;
            }
        }
        flipped
    }

    pub fn get(&self, node_id: &str) -> Option<&PeerNode> {
        self.nodes.iter().find(|n| n.node_id.as_str() == node_id)
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.get(node_id).is_some()
    }

    /// All known peers, discovery order.
    pub fn nodes(&self) -> &[PeerNode] {
        &self.nodes
    }

    pub fn online_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.online).count()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

// Saturating age that tolerates a `last_seen` ahead of `now`.
fn age_of(now: Instant, then: Instant) -> Option<Duration> {
    now.as_ticks().checked_sub(then.as_ticks()).map(Duration::from_ticks)
}
