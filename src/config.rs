//! # Link Configuration
//!
//! Who this node is, where the fleet lives in the topic tree, and the
//! timing constants that drive the tick loop. Everything ambient the
//! original firmware read from globals is an explicit field here.

use embassy_time::Duration;
use heapless::String;

use crate::proto::{Capabilities, MAX_ADDR_LEN, MAX_HWADDR_LEN, MAX_VERSION_LEN, NodeId, NodeRole};
use crate::transport::Credentials;

/// Longest base topic prefix.
pub const MAX_BASE_TOPIC_LEN: usize = 24;
/// Longest broker username or password.
pub const MAX_CRED_LEN: usize = 32;

/// Base topic used when none is configured.
pub const DEFAULT_BASE_TOPIC: &str = "luces";
/// Keep-alive requested from the broker.
pub const DEFAULT_KEEP_ALIVE_SECS: u16 = 60;

/// Minimum spacing between reconnect attempts.
pub const RECONNECT_BACKOFF: Duration = Duration::from_millis(5000);
/// Spacing between liveness beacons.
pub const HEARTBEAT_PERIOD: Duration = Duration::from_secs(30);
/// Spacing between periodic discovery announces.
pub const DISCOVERY_PERIOD: Duration = Duration::from_secs(300);
/// Silence after which a peer is considered offline.
pub const STALE_AFTER: Duration = Duration::from_secs(600);
/// Most queued messages flushed to the broker in one tick.
pub const OUTGOING_FLUSH_MAX: usize = 5;
/// Most inbound messages dispatched in one tick.
pub const INCOMING_DRAIN_MAX: usize = 10;

/// This node's identity as the rest of the fleet sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub node_id: NodeId,
    pub role: NodeRole,
    pub version: String<MAX_VERSION_LEN>,
    pub ip: String<MAX_ADDR_LEN>,
    pub mac: String<MAX_HWADDR_LEN>,
}

impl Identity {
    /// Creates an identity with empty network details. Returns `None`
    /// when `node_id` is empty or does not fit the wire limit.
    pub fn new(node_id: &str, role: NodeRole) -> Option<Self> {
        if node_id.is_empty() {
            return None;
        }
        let node_id = crate::topic::bounded(node_id)?;
        Some(Self {
            node_id,
            role,
            version: String::new(),
            ip: String::new(),
            mac: String::new(),
        })
    }

    /// Sets the firmware version advertised in announces. Returns
    /// `false` when the text does not fit, leaving the old value.
    pub fn set_version(&mut self, version: &str) -> bool {
        match crate::topic::bounded(version) {
            Some(version) => {
                self.version = version;
                true
            }
            None => false,
        }
    }

    /// Sets the network addresses advertised in announces and status
    /// records. Returns `false` when either does not fit.
    pub fn set_network(&mut self, ip: &str, mac: &str) -> bool {
        match (crate::topic::bounded(ip), crate::topic::bounded(mac)) {
            (Some(ip), Some(mac)) => {
                self.ip = ip;
                self.mac = mac;
                true
            }
            _ => false,
        }
    }
}

/// Live readings folded into status records and heartbeats, supplied by
/// the firmware through
/// [`FleetHandler::vitals`](crate::link::FleetHandler::vitals).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Vitals {
    /// Link quality in dBm, zero when unknown.
    pub rssi: i16,
    /// Free heap in bytes, zero when unknown.
    pub heap: u32,
}

/// Everything the link needs to run a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    pub identity: Identity,
    pub capabilities: Capabilities,
    pub keep_alive_secs: u16,
    /// Whether periodic discovery announces are enabled at start.
    pub discovery: bool,
    base_topic: String<MAX_BASE_TOPIC_LEN>,
    username: Option<String<MAX_CRED_LEN>>,
    password: Option<String<MAX_CRED_LEN>>,
}

impl LinkConfig {
    pub fn new(identity: Identity) -> Self {
        let mut base_topic = String::new();
        // DEFAULT_BASE_TOPIC fits MAX_BASE_TOPIC_LEN.
        let _ = base_topic.push_str(DEFAULT_BASE_TOPIC);
        Self {
            identity,
            capabilities: Capabilities {
                ota: true,
                telemetry: true,
                commands: true,
                ..Capabilities::default()
            },
            keep_alive_secs: DEFAULT_KEEP_ALIVE_SECS,
            discovery: true,
            base_topic,
            username: None,
            password: None,
        }
    }

    /// Moves the fleet to a different topic prefix. Returns `false`
    /// when the prefix is empty or does not fit.
    pub fn set_base_topic(&mut self, base: &str) -> bool {
        if base.is_empty() {
            return false;
        }
        match crate::topic::bounded(base) {
            Some(base) => {
                self.base_topic = base;
                true
            }
            None => false,
        }
    }

    pub fn base_topic(&self) -> &str {
        self.base_topic.as_str()
    }

    /// Stores broker credentials. Returns `false` when either does not
    /// fit, leaving the previous pair untouched.
    pub fn set_credentials(&mut self, username: &str, password: &str) -> bool {
        match (crate::topic::bounded(username), crate::topic::bounded(password)) {
            (Some(username), Some(password)) => {
                self.username = Some(username);
                self.password = Some(password);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn credentials(&self) -> Option<Credentials<'_>> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.as_str(),
                password: password.as_str(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_rejects_empty_and_oversized_ids() {
        assert!(Identity::new("", NodeRole::Fixture).is_none());
        let long = core::str::from_utf8(&[b'x'; 64]).unwrap();
        assert!(Identity::new(long, NodeRole::Fixture).is_none());
        assert!(Identity::new("LUM_7", NodeRole::Fixture).is_some());
    }

    #[test]
    fn config_starts_with_fleet_defaults() {
        let identity = Identity::new("LUM_7", NodeRole::Fixture).unwrap();
        let config = LinkConfig::new(identity);

        assert_eq!(config.base_topic(), "luces");
        assert_eq!(config.keep_alive_secs, 60);
        assert!(config.discovery);
        assert!(config.capabilities.ota);
        assert!(config.capabilities.commands);
        assert!(!config.capabilities.dimming);
        assert!(config.credentials().is_none());
    }

    #[test]
    fn credentials_are_stored_as_a_pair() {
        let identity = Identity::new("LUM_7", NodeRole::Fixture).unwrap();
        let mut config = LinkConfig::new(identity);

        assert!(config.set_credentials("fleet", "s3cret"));
        let creds = config.credentials().unwrap();
        assert_eq!(creds.username, "fleet");
        assert_eq!(creds.password, "s3cret");
    }

    #[test]
    fn base_topic_must_be_non_empty() {
        let identity = Identity::new("LUM_7", NodeRole::Fixture).unwrap();
        let mut config = LinkConfig::new(identity);

        assert!(!config.set_base_topic(""));
        assert!(config.set_base_topic("plant9"));
        assert_eq!(config.base_topic(), "plant9");
    }
}
