//! Ids of messages this client sent.
//!
//! The gateway echoes every message the account posts, replies included.
//! Replies are recorded here on send and skipped when their echo arrives,
//! so a reply can never be parsed as a new command.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

/// How long a sent id is remembered.
pub const DEFAULT_OUTBOUND_TTL: Duration = Duration::from_secs(300);

pub struct OutboundLog {
    ttl: Duration,
    sent: DashMap<String, Instant>,
}

impl OutboundLog {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sent: DashMap::new(),
        }
    }

    pub fn record(&self, message_id: impl Into<String>) {
        let now = Instant::now();
        self.sent
            .retain(|_, sent_at| now.duration_since(*sent_at) < self.ttl);
        self.sent.insert(message_id.into(), now);
    }

    /// Whether `message_id` is a recent send. A hit is consumed.
    pub fn take(&self, message_id: &str) -> bool {
        self.sent
            .remove(message_id)
            .is_some_and(|(_, sent_at)| sent_at.elapsed() < self.ttl)
    }

    pub fn len(&self) -> usize {
        self.sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }
}

impl Default for OutboundLog {
    fn default() -> Self {
        Self::new(DEFAULT_OUTBOUND_TTL)
    }
}
