//! # Transport Abstraction
//!
//! This module defines the [`Transport`] trait, which abstracts the pub/sub
//! client underneath the fleet link (a TCP MQTT stack, a cellular modem with
//! an embedded broker session, a radio bridge), allowing the link to be
//! hardware and network-stack agnostic.
//!
//! The trait is synchronous and non-blocking: every call is expected to
//! return promptly, and inbound traffic is pulled once per tick through
//! [`Transport::poll`].

use crate::proto::QoS;

/// A marker trait for transport-related errors.
pub trait TransportError: core::fmt::Debug {}

/// Username and password for the broker session.
#[derive(Debug, Clone, Copy)]
pub struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// A will message the broker publishes on our behalf if the session
/// dies without a clean disconnect.
#[derive(Debug, Clone, Copy)]
pub struct LastWill<'a> {
    pub topic: &'a str,
    pub payload: &'a [u8],
    pub qos: QoS,
    pub retain: bool,
}

/// Everything a transport needs to open a broker session.
#[derive(Debug, Clone, Copy)]
pub struct ConnectRequest<'a> {
    pub client_id: &'a str,
    pub keep_alive_secs: u16,
    pub credentials: Option<Credentials<'a>>,
    pub last_will: Option<LastWill<'a>>,
}

/// Receiver for inbound messages pulled out of the transport during
/// [`Transport::poll`].
pub trait Inbox {
    /// Hands one inbound message to the link. The borrows are only valid
    /// for the duration of the call, so implementations must copy what
    /// they keep.
    fn accept(&mut self, topic: &str, payload: &[u8], retained: bool);
}

/// A trait representing a pub/sub transport session.
pub trait Transport {
    /// The error type returned by the transport.
    type Error: TransportError;

    /// Opens a session with the broker. Blocks only for the duration of
    /// the handshake.
    fn connect(&mut self, request: &ConnectRequest<'_>) -> Result<(), Self::Error>;

    /// Closes the session. Must be safe to call when already closed.
    fn disconnect(&mut self);

    /// Reports whether the session is currently usable. The link checks
    /// this every tick to detect sessions that died underneath it.
    fn is_connected(&self) -> bool;

    /// Publishes one message.
    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), Self::Error>;

    /// Registers a subscription with the broker.
    fn subscribe(&mut self, filter: &str, qos: QoS) -> Result<(), Self::Error>;

    /// Removes a subscription from the broker.
    fn unsubscribe(&mut self, filter: &str) -> Result<(), Self::Error>;

    /// Drives the session forward: services keep-alive, reads whatever
    /// the broker has sent and feeds it to `inbox`.
    fn poll(&mut self, inbox: &mut dyn Inbox) -> Result<(), Self::Error>;
}
