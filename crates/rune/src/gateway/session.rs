//! Per-connection session state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tracing::warn;

use super::heartbeat::HeartbeatState;

/// State of one gateway connection. A fresh one is built after every
/// Hello; nothing carries over between connections.
#[derive(Debug, Default)]
pub struct Session {
    id: Option<String>,
    sequence: Arc<AtomicU64>,
    heartbeat: Arc<Mutex<HeartbeatState>>,
    ready: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn mark_ready(&mut self, session_id: String) {
        self.id = Some(session_id);
        self.ready = true;
    }

    /// Forget the session after the peer invalidated it.
    pub fn clear(&mut self) {
        self.id = None;
        self.ready = false;
        self.sequence.store(0, Ordering::SeqCst);
    }

    /// Last sequence seen, `0` before any dispatch.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Record a dispatch sequence number. The stored value never decreases.
    pub fn observe_sequence(&self, seq: u64) {
        if seq == 0 {
            return;
        }
        let previous = self.sequence.fetch_max(seq, Ordering::SeqCst);
        if seq < previous {
            warn!(seq, previous, "Out-of-order dispatch sequence ignored");
        }
    }

    /// Shared counter read by the heartbeat task.
    pub fn sequence_handle(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.sequence)
    }

    pub fn heartbeat(&self) -> Arc<Mutex<HeartbeatState>> {
        Arc::clone(&self.heartbeat)
    }
}
