//! Message dispatch.
//!
//! Every `MESSAGE_CREATE` from a ready session lands in
//! [`Dispatcher::handle_message`], on its own task:
//!
//! ```text
//!  message
//!     │ created at or before process start? ──► drop
//!     │ echo of a message this client sent? ──► drop
//!     │ author is a bot? ──► drop
//!     │ count it
//!     ├─ owner + prefix ──► command: run, send reply, delete original
//!     ├─ owner          ──► auto-emoji reaction (if enabled)
//!     └─ anyone else    ──► auto-responder
//! ```

mod autorespond;
mod outbound;

pub use autorespond::{AutoResponder, DEFAULT_COOLDOWN, USER_MARKER, expand_phrase};
pub use outbound::{DEFAULT_OUTBOUND_TTL, OutboundLog};

use std::sync::Arc;

use async_trait::async_trait;
use rune_gateway_protocol::{Message, Ready};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::commands::{
    CommandContext, CommandRegistry, Invocation, Reply, parse_invocation, unknown_command,
};
use crate::format;
use crate::gateway::MessageHandler;
use crate::runtime::Runtime;

#[derive(Clone)]
pub struct Dispatcher {
    runtime: Arc<Runtime>,
    registry: Arc<CommandRegistry>,
    auto_responder: Arc<AutoResponder>,
}

impl Dispatcher {
    pub fn new(runtime: Arc<Runtime>) -> Self {
        Self::with_registry(runtime, CommandRegistry::builtin())
    }

    pub fn with_registry(runtime: Arc<Runtime>, registry: CommandRegistry) -> Self {
        Self {
            runtime,
            registry: Arc::new(registry),
            auto_responder: Arc::new(AutoResponder::default()),
        }
    }

    pub async fn handle_message(&self, message: Message) {
        if !self.runtime.is_fresh(&message) {
            debug!(message_id = %message.id, "Ignoring message created before startup");
            return;
        }
        if self.runtime.outbound().take(&message.id) {
            debug!(message_id = %message.id, "Ignoring echo of own reply");
            return;
        }
        if message.author.bot {
            return;
        }
        self.runtime.stats().record_message().await;

        let (owner_id, prefix, auto_emoji) = {
            let config = self.runtime.config().read().await;
            let emoji = (config.auto_emoji_enabled && !config.auto_emoji.is_empty())
                .then(|| config.auto_emoji.clone());
            (config.owner_id.clone(), config.prefix.clone(), emoji)
        };

        if !owner_id.is_empty() && message.author.id == owner_id {
            if let Some(invocation) = parse_invocation(&message.content, &prefix) {
                self.run_command(&message, invocation, &prefix).await;
            } else if let Some(emoji) = auto_emoji {
                self.react(&message, &emoji).await;
            }
            return;
        }

        self.auto_responder
            .maybe_respond(&self.runtime, &message, &owner_id)
            .await;
    }

    async fn run_command(&self, message: &Message, invocation: Invocation, prefix: &str) {
        let channel_id = message.channel_id.as_str();
        self.runtime.stats().record_command().await;

        let reply = match self.registry.get(&invocation.verb) {
            Some(handler) => {
                info!(verb = %invocation.verb, channel_id, "Running command");
                let ctx = CommandContext {
                    message,
                    args: &invocation.args,
                    runtime: &self.runtime,
                    registry: &self.registry,
                    prefix,
                };
                match handler.run(&ctx).await {
                    Ok(reply) => reply,
                    Err(e) => {
                        warn!(error = %e, verb = %invocation.verb, "Command failed");
                        Reply::Text(format::panel(&format!("Command failed: {e}")))
                    }
                }
            }
            None => {
                debug!(verb = %invocation.verb, "Unknown command");
                Reply::Text(unknown_command(&invocation.verb, prefix))
            }
        };

        if let Reply::Text(content) = reply
            && let Err(e) = self.runtime.send_tracked(channel_id, &content).await
        {
            debug!(error = %e, verb = %invocation.verb, "Command reply not sent");
        }

        if let Err(e) = self.runtime.api().delete_message(channel_id, &message.id).await {
            debug!(error = %e, message_id = %message.id, "Command message not deleted");
        }
    }

    async fn react(&self, message: &Message, emoji: &str) {
        if let Err(e) = self
            .runtime
            .api()
            .add_reaction(&message.channel_id, &message.id, emoji)
            .await
        {
            debug!(error = %e, message_id = %message.id, "Auto emoji not added");
        }
    }
}

#[async_trait]
impl MessageHandler for Dispatcher {
    async fn on_ready(&self, ready: &Ready) {
        let owner_id = self.runtime.config().read().await.owner_id.clone();
        if owner_id.is_empty() {
            warn!("owner_id is not set; commands are disabled");
        } else if owner_id != ready.user.id {
            info!(
                owner_id = %owner_id,
                user_id = %ready.user.id,
                "Logged-in account differs from owner_id"
            );
        }
    }

    async fn on_message(&self, message: Message) {
        let dispatcher = self.clone();
        let span = info_span!("message", message_id = %message.id, channel_id = %message.channel_id);
        tokio::spawn(
            async move {
                dispatcher.handle_message(message).await;
            }
            .instrument(span),
        );
    }
}
