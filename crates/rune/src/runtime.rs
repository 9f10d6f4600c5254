//! Shared runtime context.
//!
//! Everything the gateway session, the command handlers, and the control
//! API share lives in one [`Runtime`] behind an `Arc`. Each aggregate has
//! its own lock:
//!
//! - config: reader-writer lock inside [`ConfigStore`]
//! - stats: mutex inside [`Stats`]
//! - auto-responder flag: dedicated mutex
//! - presence: dedicated mutex
//! - gateway socket: the [`GatewayWriter`] write mutex
//! - sent message ids: the [`OutboundLog`] map
//!
//! Lock order: the auto-responder flag is always taken before the config
//! lock, never the other way round.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rune_gateway_protocol::{Message, Presence, Status};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::{Config, ConfigError, ConfigStore};
use crate::dispatch::OutboundLog;
use crate::gateway::{GatewayError, GatewayWriter};
use crate::rest::{DiscordApi, RestError};
use crate::stats::Stats;

/// Status plus optional custom text, re-sent on every identify.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresenceState {
    pub status: Status,
    pub custom_text: Option<String>,
}

impl PresenceState {
    pub fn to_presence(&self) -> Presence {
        Presence::new(self.status).with_custom_text(self.custom_text.as_deref())
    }
}

/// Partial config change; absent fields are left alone.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ConfigUpdate {
    pub prefix: Option<String>,
    pub auto_response_enabled: Option<bool>,
    pub auto_response_phrase: Option<String>,
    pub auto_emoji_enabled: Option<bool>,
    pub auto_emoji: Option<String>,
}

pub struct Runtime {
    config: ConfigStore,
    stats: Stats,
    auto_responder: Mutex<bool>,
    presence: Mutex<PresenceState>,
    gateway: GatewayWriter,
    api: Arc<dyn DiscordApi>,
    outbound: OutboundLog,
}

impl Runtime {
    pub fn new(
        config_path: impl Into<PathBuf>,
        config: Config,
        api: Arc<dyn DiscordApi>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let auto_response_enabled = config.auto_response_enabled;
        Self {
            config: ConfigStore::new(config_path, config),
            stats: Stats::new(started_at),
            auto_responder: Mutex::new(auto_response_enabled),
            presence: Mutex::new(PresenceState::default()),
            gateway: GatewayWriter::new(),
            api,
            outbound: OutboundLog::default(),
        }
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn api(&self) -> &Arc<dyn DiscordApi> {
        &self.api
    }

    pub fn gateway(&self) -> &GatewayWriter {
        &self.gateway
    }

    pub fn outbound(&self) -> &OutboundLog {
        &self.outbound
    }

    /// Send a message and remember its id, so the gateway echo of it is
    /// never dispatched.
    pub async fn send_tracked(&self, channel_id: &str, content: &str) -> Result<String, RestError> {
        let id = self.api.send_message(channel_id, content).await?;
        self.outbound.record(id.clone());
        Ok(id)
    }

    /// Whether a message was created after this process started. Older
    /// messages (replayed on resume, or unparseable) are never acted on.
    pub fn is_fresh(&self, message: &Message) -> bool {
        message
            .created_at()
            .is_some_and(|t| t.with_timezone(&Utc) > self.stats.started_at())
    }

    // ------------------------------------------------------------------------
    // Auto-responder / auto-emoji
    // ------------------------------------------------------------------------

    pub async fn auto_response_enabled(&self) -> bool {
        *self.auto_responder.lock().await
    }

    pub async fn set_auto_response(&self, enabled: bool) -> Result<bool, ConfigError> {
        let mut flag = self.auto_responder.lock().await;
        self.config
            .update(|c| c.auto_response_enabled = enabled)
            .await?;
        *flag = enabled;
        info!(enabled, "Auto responder updated");
        Ok(enabled)
    }

    pub async fn toggle_auto_response(&self) -> Result<bool, ConfigError> {
        let mut flag = self.auto_responder.lock().await;
        let enabled = !*flag;
        self.config
            .update(|c| c.auto_response_enabled = enabled)
            .await?;
        *flag = enabled;
        info!(enabled, "Auto responder toggled");
        Ok(enabled)
    }

    pub async fn toggle_auto_emoji(&self) -> Result<bool, ConfigError> {
        let enabled = self
            .config
            .update(|c| {
                c.auto_emoji_enabled = !c.auto_emoji_enabled;
                if !c.auto_emoji_enabled {
                    c.auto_emoji.clear();
                }
                c.auto_emoji_enabled
            })
            .await?;
        info!(enabled, "Auto emoji toggled");
        Ok(enabled)
    }

    /// Merge-apply a partial update and persist it.
    pub async fn apply_update(&self, update: ConfigUpdate) -> Result<(), ConfigError> {
        let mut flag = self.auto_responder.lock().await;
        let auto_response = update.auto_response_enabled;
        self.config
            .update(|c| {
                if let Some(prefix) = update.prefix {
                    c.prefix = prefix;
                }
                if let Some(enabled) = update.auto_response_enabled {
                    c.auto_response_enabled = enabled;
                }
                if let Some(phrase) = update.auto_response_phrase {
                    c.auto_response_phrase = phrase;
                }
                if let Some(enabled) = update.auto_emoji_enabled {
                    c.auto_emoji_enabled = enabled;
                }
                if let Some(emoji) = update.auto_emoji {
                    c.auto_emoji = emoji;
                }
            })
            .await?;
        if let Some(enabled) = auto_response {
            *flag = enabled;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Presence
    // ------------------------------------------------------------------------

    pub async fn presence(&self) -> PresenceState {
        self.presence.lock().await.clone()
    }

    /// Push a presence update over the gateway and remember it for the next
    /// identify. Nothing is remembered if the write fails.
    pub async fn set_presence(
        &self,
        status: Status,
        custom_text: Option<String>,
    ) -> Result<(), GatewayError> {
        let mut current = self.presence.lock().await;
        let next = PresenceState {
            status,
            custom_text,
        };
        self.gateway.send_presence(&next.to_presence()).await?;
        *current = next;
        info!(status = %status, "Presence updated");
        Ok(())
    }
}
