//! Gateway error types.

use thiserror::Error;

use crate::rest::RestError;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Websocket connect, read, or write failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The transport went away without an error.
    #[error("gateway transport closed")]
    Closed,

    /// A frame could not be encoded or decoded.
    #[error("failed to encode or decode gateway frame: {0}")]
    Codec(#[from] serde_json::Error),

    /// The peer broke the protocol (e.g. first frame was not Hello).
    #[error("gateway protocol violation: {0}")]
    Protocol(String),

    /// The token was rejected during discovery or handshake.
    #[error("authentication failed")]
    AuthFailed,

    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    /// No live session to write to.
    #[error("gateway not connected")]
    NotConnected,

    /// Gateway discovery failed.
    #[error("gateway discovery failed: {0}")]
    Rest(RestError),
}

impl GatewayError {
    /// Errors that retrying cannot fix.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GatewayError::AuthFailed)
    }
}

impl From<RestError> for GatewayError {
    fn from(err: RestError) -> Self {
        match err {
            RestError::Unauthorized { .. } => GatewayError::AuthFailed,
            other => GatewayError::Rest(other),
        }
    }
}
