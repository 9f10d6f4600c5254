//! Heartbeat task.
//!
//! One task per session, ticking at the interval the peer sent in Hello.
//! A tick that finds the previous beat still unacknowledged declares the
//! session lost; so does a failed write. Either way the task reports once
//! and exits; reconnecting is the session loop's job.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::writer::GatewayWriter;

#[derive(Debug, Default)]
pub struct HeartbeatState {
    last_sent: Option<Instant>,
    last_ack: Option<Instant>,
    awaiting_ack: bool,
}

impl HeartbeatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&mut self) {
        self.last_sent = Some(Instant::now());
        self.awaiting_ack = true;
    }

    pub fn ack_received(&mut self) {
        self.last_ack = Some(Instant::now());
        self.awaiting_ack = false;
    }

    /// A beat went out and a full interval passed without its ack.
    pub fn is_zombie(&self) -> bool {
        self.awaiting_ack
    }

    /// Round trip of the last acknowledged beat.
    pub fn latency(&self) -> Option<Duration> {
        match (self.last_sent, self.last_ack) {
            (Some(sent), Some(ack)) if ack >= sent => Some(ack - sent),
            _ => None,
        }
    }
}

/// Why the heartbeat task gave up on the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatLoss {
    MissedAck,
    WriteFailed,
}

pub async fn run_heartbeat(
    interval: Duration,
    sequence: Arc<AtomicU64>,
    state: Arc<Mutex<HeartbeatState>>,
    writer: GatewayWriter,
    lost_tx: oneshot::Sender<HeartbeatLoss>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let loss = loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Heartbeat task stopped");
                return;
            }
            _ = ticker.tick() => {}
        }

        {
            let mut state = state.lock().await;
            if state.is_zombie() {
                warn!("No heartbeat ack within one interval");
                break HeartbeatLoss::MissedAck;
            }
            state.sent();
        }

        let seq = sequence.load(Ordering::SeqCst);
        if let Err(e) = writer.send_heartbeat(seq).await {
            warn!(error = %e, "Failed to send heartbeat");
            break HeartbeatLoss::WriteFailed;
        }
        debug!(seq, "Heartbeat sent");
    };

    let _ = lost_tx.send(loss);
}
