//! Platform REST API.
//!
//! [`DiscordApi`] is the seam the rest of the crate talks to;
//! [`RestClient`] is the reqwest implementation. Calls are one-shot with a
//! 10 second timeout and no retries; callers decide what a failure means.

mod client;
mod error;
#[cfg(test)]
pub(crate) mod mock;

pub use client::{DEFAULT_BASE_URL, RestClient, USER_AGENT};
pub use error::RestError;

use async_trait::async_trait;
use rune_gateway_protocol::{Message, User};

#[async_trait]
pub trait DiscordApi: Send + Sync {
    /// Resolve the gateway websocket URL.
    async fn gateway_url(&self) -> Result<String, RestError>;

    /// Fetch the account the token belongs to.
    async fn current_user(&self) -> Result<User, RestError>;

    /// Post a message; returns the new message id.
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<String, RestError>;

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<(), RestError>;

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), RestError>;

    /// Most recent messages in a channel, newest first.
    async fn list_messages(&self, channel_id: &str, limit: u8) -> Result<Vec<Message>, RestError>;

    async fn trigger_typing(&self, channel_id: &str) -> Result<(), RestError>;

    async fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<(), RestError>;
}
