//! Single-writer handle for the gateway socket.
//!
//! Heartbeats, identify, and presence updates all go through one
//! [`GatewayWriter`], whose mutex serializes frames onto the socket. The
//! session swaps the sink on every reconnect; clones held elsewhere (the
//! control API, command handlers) always see the current one.

use std::sync::Arc;

use futures::SinkExt;
use rune_gateway_protocol::{
    ClientProperties, GatewayPayload, Presence, build_heartbeat, build_identify, build_presence,
};
use tokio::sync::Mutex;
use tracing::debug;

use super::connection::FrameSink;
use super::error::GatewayError;

#[derive(Clone, Default)]
pub struct GatewayWriter {
    sink: Arc<Mutex<Option<FrameSink>>>,
}

impl GatewayWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the sink of a new connection, dropping any previous one.
    pub async fn install(&self, sink: FrameSink) {
        *self.sink.lock().await = Some(sink);
    }

    pub async fn is_connected(&self) -> bool {
        self.sink.lock().await.is_some()
    }

    pub async fn send(&self, payload: &GatewayPayload) -> Result<(), GatewayError> {
        let text = serde_json::to_string(payload)?;
        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or(GatewayError::NotConnected)?;
        debug!(op = payload.op, "Writing gateway frame");
        sink.send(text).await
    }

    pub async fn send_heartbeat(&self, sequence: u64) -> Result<(), GatewayError> {
        self.send(&build_heartbeat(sequence)).await
    }

    pub async fn send_identify(&self, token: &str, presence: &Presence) -> Result<(), GatewayError> {
        self.send(&build_identify(token, &ClientProperties::default(), presence))
            .await
    }

    pub async fn send_presence(&self, presence: &Presence) -> Result<(), GatewayError> {
        self.send(&build_presence(presence)).await
    }

    /// Close and drop the current sink. Later sends fail with `NotConnected`.
    pub async fn close(&self) {
        let sink = self.sink.lock().await.take();
        if let Some(mut sink) = sink {
            if let Err(e) = sink.close().await {
                debug!(error = %e, "Error closing gateway socket");
            }
        }
    }
}
