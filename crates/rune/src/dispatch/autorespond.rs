//! Auto-reply to mentions of the owner.

use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rune_gateway_protocol::Message;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::runtime::Runtime;

/// Minimum gap between two replies to the same sender.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

/// Marker replaced with the author's display name.
pub const USER_MARKER: &str = "<user>";

pub fn expand_phrase(template: &str, display_name: &str) -> String {
    template.replace(USER_MARKER, display_name)
}

pub struct AutoResponder {
    cooldown: Duration,
    last_reply: DashMap<String, Instant>,
}

impl AutoResponder {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_reply: DashMap::new(),
        }
    }

    /// Reply to `message` if it mentions the owner, comes from someone else,
    /// the flag is on, and the sender is not cooling down. Returns whether a
    /// reply was sent.
    pub async fn maybe_respond(&self, runtime: &Runtime, message: &Message, owner_id: &str) -> bool {
        if owner_id.is_empty() || message.author.id == owner_id {
            return false;
        }
        if !message.mentions_user(owner_id) {
            return false;
        }
        if !runtime.auto_response_enabled().await {
            return false;
        }
        if !self.try_claim(&message.author.id) {
            debug!(author_id = %message.author.id, "Auto response on cooldown");
            return false;
        }

        let template = runtime.config().read().await.auto_response_phrase.clone();
        let content = expand_phrase(&template, message.author.display_name());
        match runtime.send_tracked(&message.channel_id, &content).await {
            Ok(_) => {
                info!(
                    author_id = %message.author.id,
                    channel_id = %message.channel_id,
                    "Auto response sent"
                );
                true
            }
            Err(_) => false,
        }
    }

    /// Record a reply to `sender` unless one went out within the cooldown.
    fn try_claim(&self, sender: &str) -> bool {
        let now = Instant::now();
        match self.last_reply.entry(sender.to_string()) {
            Entry::Occupied(mut entry) => {
                if now.duration_since(*entry.get()) < self.cooldown {
                    return false;
                }
                entry.insert(now);
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }
}

impl Default for AutoResponder {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::rest::mock::MockApi;
    use crate::runtime::testing::{OWNER, message, runtime_with, test_config};
    use rune_gateway_protocol::Mention;

    fn enabled_config() -> Config {
        Config {
            auto_response_enabled: true,
            auto_response_phrase: "hi <user>".to_string(),
            ..test_config()
        }
    }

    fn mention(author: &str) -> Message {
        let mut message = message(author, &format!("hello <@{OWNER}>"));
        message.mentions = vec![Mention {
            id: OWNER.to_string(),
            username: "owner".to_string(),
        }];
        message
    }

    #[test]
    fn expands_every_marker() {
        assert_eq!(expand_phrase("hi <user>, bye <user>", "sam"), "hi sam, bye sam");
        assert_eq!(expand_phrase("no marker", "sam"), "no marker");
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_is_per_sender() {
        let t = runtime_with(enabled_config(), MockApi::new());
        let responder = AutoResponder::default();

        assert!(responder.maybe_respond(&t.runtime, &mention("7"), OWNER).await);
        assert!(!responder.maybe_respond(&t.runtime, &mention("7"), OWNER).await);
        assert!(responder.maybe_respond(&t.runtime, &mention("8"), OWNER).await);

        tokio::time::advance(DEFAULT_COOLDOWN).await;
        assert!(responder.maybe_respond(&t.runtime, &mention("7"), OWNER).await);
        assert_eq!(t.api.sent(), vec!["hi user7", "hi user8", "hi user7"]);
    }

    #[tokio::test]
    async fn literal_mention_token_counts() {
        let t = runtime_with(enabled_config(), MockApi::new());
        let responder = AutoResponder::default();
        let message = message("7", &format!("yo <@!{OWNER}>"));
        assert!(responder.maybe_respond(&t.runtime, &message, OWNER).await);
    }

    #[tokio::test]
    async fn ignores_owner_unmentioned_and_disabled() {
        let t = runtime_with(enabled_config(), MockApi::new());
        let responder = AutoResponder::default();

        assert!(!responder.maybe_respond(&t.runtime, &mention(OWNER), OWNER).await);
        assert!(!responder.maybe_respond(&t.runtime, &message("7", "no ping"), OWNER).await);

        t.runtime.set_auto_response(false).await.unwrap();
        assert!(!responder.maybe_respond(&t.runtime, &mention("9"), OWNER).await);
        assert!(t.api.sent().is_empty());
    }

    #[tokio::test]
    async fn uses_global_name_when_present() {
        let t = runtime_with(enabled_config(), MockApi::new());
        let responder = AutoResponder::default();
        let mut message = mention("7");
        message.author.global_name = Some("Seven".to_string());

        assert!(responder.maybe_respond(&t.runtime, &message, OWNER).await);
        assert_eq!(t.api.sent(), vec!["hi Seven"]);
    }
}
