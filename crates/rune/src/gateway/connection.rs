//! Gateway transport: discovery, websocket connect, and frame plumbing.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{Sink, SinkExt, Stream, StreamExt};
use rune_gateway_protocol::GATEWAY_VERSION;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::info;

use super::error::GatewayError;
use crate::rest::DiscordApi;

/// Inbound frame, with transport details stripped.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    /// Peer closed the socket, with its close code if it sent one.
    Close(Option<u16>),
}

pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, GatewayError>> + Send>>;
pub type FrameSink = Pin<Box<dyn Sink<String, Error = GatewayError> + Send>>;

/// Both halves of one connection.
pub struct Transport {
    pub reader: FrameStream,
    pub writer: FrameSink,
}

/// Opens a fresh gateway transport.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Transport, GatewayError>;
}

/// Connects over a real websocket after REST discovery.
pub struct WsConnector {
    api: Arc<dyn DiscordApi>,
}

impl WsConnector {
    pub fn new(api: Arc<dyn DiscordApi>) -> Self {
        Self { api }
    }
}

/// Append version and encoding to a discovered gateway URL.
pub fn gateway_ws_url(base: &str) -> String {
    format!(
        "{}/?v={}&encoding=json",
        base.trim_end_matches('/'),
        GATEWAY_VERSION
    )
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<Transport, GatewayError> {
        let base = self.api.gateway_url().await?;
        let url = gateway_ws_url(&base);
        info!(url = %url, "Connecting to gateway");

        let (stream, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;
        let (sink, stream) = stream.split();

        let reader = stream.filter_map(|msg| async move {
            match msg {
                Ok(WsMessage::Text(text)) => Some(Ok(Frame::Text(text.as_str().to_owned()))),
                Ok(WsMessage::Close(frame)) => Some(Ok(Frame::Close(frame.map(|f| f.code.into())))),
                // Ping/pong are answered by tungstenite; binary is unused
                // because compression is off.
                Ok(_) => None,
                Err(e) => Some(Err(GatewayError::WebSocket(e))),
            }
        });

        let writer = sink
            .sink_map_err(GatewayError::WebSocket)
            .with(|text: String| async move { Ok::<_, GatewayError>(WsMessage::Text(text.into())) });

        Ok(Transport {
            reader: Box::pin(reader),
            writer: Box::pin(writer),
        })
    }
}
