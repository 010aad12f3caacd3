//! Bounded FIFO for store-and-forward messaging.

use embassy_time::Instant;
use heapless::{Deque, String, Vec};

use crate::proto::QoS;
use crate::topic::{self, MAX_TOPIC_LEN, TopicBuf};

/// Largest payload a queued message can carry.
pub const MAX_PAYLOAD_LEN: usize = 512;

/// One parked message, either awaiting flush to the broker or awaiting
/// dispatch to the firmware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    pub topic: TopicBuf,
    pub payload: Vec<u8, MAX_PAYLOAD_LEN>,
    pub qos: QoS,
    pub retain: bool,
    /// When the message entered the queue, for age diagnostics.
    pub enqueued_at: Instant,
}

impl QueuedMessage {
    /// Copies `topic` and `payload` into a queue entry stamped with
    /// `now`. Returns `None` when either exceeds the compiled-in limits.
    pub fn new(topic: &str, payload: &[u8], qos: QoS, retain: bool, now: Instant) -> Option<Self> {
        let topic: String<MAX_TOPIC_LEN> = topic::bounded(topic)?;
        let mut body = Vec::new();
        body.extend_from_slice(payload).ok()?;
        Some(Self { topic, payload: body, qos, retain, enqueued_at: now })
    }
}

/// FIFO of [`QueuedMessage`] with drop-oldest overflow behavior.
#[derive(Debug, Default)]
pub struct MessageQueue<const DEPTH: usize> {
    entries: Deque<QueuedMessage, DEPTH>,
}

impl<const DEPTH: usize> MessageQueue<DEPTH> {
    pub const fn new() -> Self {
        Self { entries: Deque::new() }
    }

    /// Appends a message. When the queue is full the oldest entry is
    /// discarded to make room; returns `true` if that happened.
    pub fn push(&mut self, message: QueuedMessage) -> bool {
        let mut evicted = false;
        if self.entries.is_full() {
            self.entries.pop_front();
            evicted = true;
        }
        let _ = self.entries.push_back(message);
        evicted
    }

    /// The oldest entry, without removing it.
    pub fn front(&self) -> Option<&QueuedMessage> {
        self.entries.front()
    }

    /// Removes and returns the oldest entry.
    pub fn pop(&mut self) -> Option<QueuedMessage> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
