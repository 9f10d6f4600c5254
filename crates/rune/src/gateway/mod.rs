//! Gateway session: handshake, heartbeat, event routing, reconnect.
//!
//! # Lifecycle
//!
//! ```text
//!  connect ──► Hello ──► spawn heartbeat ──► Identify ──► event loop
//!     ▲                                                      │
//!     │          backoff (1s doubling to 5s, reset on READY)  │
//!     └───────────── Reconnect / read error / close ◄─────────┘
//! ```
//!
//! Every reconnect starts a brand new session (Identify, never Resume).
//! The loop ends on cancellation, on close code 4004, or when the very
//! first connection attempt fails before Hello.

pub(crate) mod backoff;
pub(crate) mod connection;
mod error;
mod heartbeat;
mod session;
mod writer;

pub use backoff::Backoff;
pub use connection::{Connector, Frame, FrameSink, FrameStream, Transport, WsConnector};
pub use error::GatewayError;
pub use heartbeat::{HeartbeatLoss, HeartbeatState};
pub use session::Session;
pub use writer::GatewayWriter;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use rand::Rng;
use rune_gateway_protocol::{
    GatewayPayload, Hello, Message, Ready, close_code, event, opcode,
};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::runtime::Runtime;

/// How long to wait for Hello after the socket opens.
pub const HELLO_TIMEOUT: Duration = Duration::from_secs(30);

/// Receives dispatches from a ready session.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn on_ready(&self, _ready: &Ready) {}

    async fn on_message(&self, message: Message);
}

/// Read the first frame and require it to be a usable Hello.
pub async fn wait_for_hello(
    reader: &mut FrameStream,
    timeout: Duration,
) -> Result<Hello, GatewayError> {
    let frame = tokio::time::timeout(timeout, reader.next())
        .await
        .map_err(|_| GatewayError::Timeout("hello"))?;

    let text = match frame {
        None => return Err(GatewayError::Closed),
        Some(Err(e)) => return Err(e),
        Some(Ok(Frame::Close(Some(close_code::AUTHENTICATION_FAILED)))) => {
            return Err(GatewayError::AuthFailed);
        }
        Some(Ok(Frame::Close(_))) => return Err(GatewayError::Closed),
        Some(Ok(Frame::Text(text))) => text,
    };

    let payload: GatewayPayload = serde_json::from_str(&text)?;
    if payload.op != opcode::HELLO {
        return Err(GatewayError::Protocol(format!(
            "expected Hello, got op {}",
            payload.op
        )));
    }
    let hello: Hello = payload.data()?;
    if hello.heartbeat_interval == 0 {
        return Err(GatewayError::Protocol(
            "Hello carried a zero heartbeat interval".to_string(),
        ));
    }
    Ok(hello)
}

/// How one connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Shutdown,
    Reconnect,
    InvalidSession,
}

/// Random 1-5 s pause before identifying again after op 9.
fn invalid_session_delay() -> Duration {
    Duration::from_millis(rand::rng().random_range(1_000..=5_000))
}

// ============================================================================
// GatewayClient
// ============================================================================

pub struct GatewayClient {
    runtime: Arc<Runtime>,
    connector: Arc<dyn Connector>,
    handler: Arc<dyn MessageHandler>,
    cancel: CancellationToken,
    backoff: Backoff,
    hello_timeout: Duration,
}

impl GatewayClient {
    pub fn new(
        runtime: Arc<Runtime>,
        connector: Arc<dyn Connector>,
        handler: Arc<dyn MessageHandler>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            runtime,
            connector,
            handler,
            cancel,
            backoff: Backoff::default(),
            hello_timeout: HELLO_TIMEOUT,
        }
    }

    /// Run sessions until shutdown. Returns an error only when the client
    /// should stop for good: a rejected token, or a first connection that
    /// never reached Hello.
    pub async fn run(mut self) -> Result<(), GatewayError> {
        let mut connected_once = false;

        loop {
            let delay = match self.connect_and_run(&mut connected_once).await {
                Ok(SessionEnd::Shutdown) => {
                    info!("Gateway client stopped");
                    return Ok(());
                }
                Ok(SessionEnd::Reconnect) => self.backoff.next_delay(),
                Ok(SessionEnd::InvalidSession) => invalid_session_delay(),
                Err(e) if e.is_fatal() => {
                    error!(error = %e, "Gateway rejected credentials");
                    return Err(e);
                }
                Err(e) if !connected_once => {
                    error!(error = %e, "Initial gateway connection failed");
                    return Err(e);
                }
                Err(e) => {
                    warn!(error = %e, "Gateway session failed");
                    self.backoff.next_delay()
                }
            };

            info!(delay_ms = delay.as_millis() as u64, "Reconnecting to gateway");
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Gateway client stopped");
                    return Ok(());
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn connect_and_run(
        &mut self,
        connected_once: &mut bool,
    ) -> Result<SessionEnd, GatewayError> {
        let cancel = self.cancel.clone();

        let Transport { mut reader, writer } = tokio::select! {
            _ = cancel.cancelled() => return Ok(SessionEnd::Shutdown),
            result = self.connector.connect() => result?,
        };

        let hello = tokio::select! {
            _ = cancel.cancelled() => return Ok(SessionEnd::Shutdown),
            result = wait_for_hello(&mut reader, self.hello_timeout) => result?,
        };
        *connected_once = true;
        let interval = Duration::from_millis(hello.heartbeat_interval);
        debug!(interval_ms = hello.heartbeat_interval, "Received Hello");

        let mut session = Session::new();
        let gateway = self.runtime.gateway().clone();
        gateway.install(writer).await;

        let heartbeat_cancel = cancel.child_token();
        let (lost_tx, lost_rx) = oneshot::channel();
        let heartbeat_task = tokio::spawn(heartbeat::run_heartbeat(
            interval,
            session.sequence_handle(),
            session.heartbeat(),
            gateway.clone(),
            lost_tx,
            heartbeat_cancel.clone(),
        ));

        let end = self.run_session(&mut session, &mut reader, lost_rx).await;

        heartbeat_cancel.cancel();
        heartbeat_task.abort();
        gateway.close().await;
        debug!(session_id = ?session.id(), "Gateway session torn down");

        end
    }

    async fn run_session(
        &mut self,
        session: &mut Session,
        reader: &mut FrameStream,
        mut lost_rx: oneshot::Receiver<HeartbeatLoss>,
    ) -> Result<SessionEnd, GatewayError> {
        let token = self.runtime.config().read().await.token.clone();
        let presence = self.runtime.presence().await.to_presence();
        self.runtime
            .gateway()
            .send_identify(&token, &presence)
            .await?;
        debug!("Identify sent");

        loop {
            let frame = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(SessionEnd::Shutdown),
                loss = &mut lost_rx => {
                    warn!(loss = ?loss, "Heartbeat lost, reconnecting");
                    return Ok(SessionEnd::Reconnect);
                }
                frame = reader.next() => frame,
            };

            match frame {
                None => {
                    info!("Gateway stream ended");
                    return Ok(SessionEnd::Reconnect);
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Gateway read failed");
                    return Ok(SessionEnd::Reconnect);
                }
                Some(Ok(Frame::Close(code))) => {
                    if code == Some(close_code::AUTHENTICATION_FAILED) {
                        return Err(GatewayError::AuthFailed);
                    }
                    info!(code = ?code, "Gateway closed by peer");
                    return Ok(SessionEnd::Reconnect);
                }
                Some(Ok(Frame::Text(text))) => {
                    let payload: GatewayPayload = match serde_json::from_str(&text) {
                        Ok(payload) => payload,
                        Err(e) => {
                            warn!(error = %e, "Skipping undecodable gateway frame");
                            continue;
                        }
                    };
                    if let Some(end) = self.handle_payload(session, payload).await {
                        return Ok(end);
                    }
                }
            }
        }
    }

    async fn handle_payload(
        &mut self,
        session: &mut Session,
        payload: GatewayPayload,
    ) -> Option<SessionEnd> {
        match payload.op {
            opcode::DISPATCH => {
                self.handle_dispatch(session, &payload).await;
                None
            }
            opcode::HEARTBEAT => {
                if let Err(e) = self
                    .runtime
                    .gateway()
                    .send_heartbeat(session.sequence())
                    .await
                {
                    warn!(error = %e, "Failed to answer heartbeat request");
                    return Some(SessionEnd::Reconnect);
                }
                None
            }
            opcode::HEARTBEAT_ACK => {
                let heartbeat = session.heartbeat();
                let mut state = heartbeat.lock().await;
                state.ack_received();
                debug!(latency = ?state.latency(), "Heartbeat acknowledged");
                None
            }
            opcode::RECONNECT => {
                info!("Gateway requested reconnect");
                Some(SessionEnd::Reconnect)
            }
            opcode::INVALID_SESSION => {
                warn!("Gateway invalidated the session");
                session.clear();
                Some(SessionEnd::InvalidSession)
            }
            op => {
                debug!(op, "Ignoring gateway opcode");
                None
            }
        }
    }

    async fn handle_dispatch(&mut self, session: &mut Session, payload: &GatewayPayload) {
        let seq = payload.sequence();
        match payload.event_name() {
            event::READY => match payload.data::<Ready>() {
                Ok(ready) => {
                    session.observe_sequence(seq);
                    session.mark_ready(ready.session_id.clone());
                    self.backoff.reset();
                    info!(
                        user = %ready.user.username,
                        user_id = %ready.user.id,
                        "Gateway session ready"
                    );
                    self.handler.on_ready(&ready).await;
                }
                Err(e) => warn!(error = %e, "Skipping malformed READY"),
            },
            event::MESSAGE_CREATE => match payload.data::<Message>() {
                Ok(message) => {
                    session.observe_sequence(seq);
                    if session.is_ready() {
                        self.handler.on_message(message).await;
                    } else {
                        debug!(message_id = %message.id, "Dropping message received before READY");
                    }
                }
                Err(e) => warn!(error = %e, "Skipping malformed MESSAGE_CREATE"),
            },
            event::RESUMED => {
                session.observe_sequence(seq);
                debug!("Session resumed");
            }
            other => {
                session.observe_sequence(seq);
                debug!(event = other, seq, "Ignoring dispatch");
            }
        }
    }
}
