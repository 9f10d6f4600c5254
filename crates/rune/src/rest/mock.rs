//! Recording [`DiscordApi`] for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use rune_gateway_protocol::{Message, User};

use super::{DiscordApi, RestError};

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    GatewayUrl,
    CurrentUser,
    Send { channel_id: String, content: String },
    Edit { channel_id: String, message_id: String, content: String },
    Delete { channel_id: String, message_id: String },
    List { channel_id: String, limit: u8 },
    Typing { channel_id: String },
    Reaction { channel_id: String, message_id: String, emoji: String },
}

#[derive(Default)]
pub struct MockApi {
    calls: Mutex<Vec<ApiCall>>,
    history: Mutex<Vec<Message>>,
    next_id: AtomicU64,
    fail_sends: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(history: Vec<Message>) -> Self {
        Self {
            history: Mutex::new(history),
            ..Self::default()
        }
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Contents of every send, in order.
    pub fn sent(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::Send { content, .. } => Some(content),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl DiscordApi for MockApi {
    async fn gateway_url(&self) -> Result<String, RestError> {
        self.record(ApiCall::GatewayUrl);
        Ok("wss://gateway.test".to_string())
    }

    async fn current_user(&self) -> Result<User, RestError> {
        self.record(ApiCall::CurrentUser);
        Ok(User {
            id: "42".to_string(),
            username: "owner".to_string(),
            global_name: None,
            bot: false,
            avatar: None,
        })
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<String, RestError> {
        self.record(ApiCall::Send {
            channel_id: channel_id.to_string(),
            content: content.to_string(),
        });
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(RestError::RateLimited { retry_after: None });
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1000;
        Ok(id.to_string())
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<(), RestError> {
        self.record(ApiCall::Edit {
            channel_id: channel_id.to_string(),
            message_id: message_id.to_string(),
            content: content.to_string(),
        });
        Ok(())
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), RestError> {
        self.record(ApiCall::Delete {
            channel_id: channel_id.to_string(),
            message_id: message_id.to_string(),
        });
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(RestError::Api {
                status: 403,
                message: "Missing Permissions".to_string(),
            });
        }
        Ok(())
    }

    async fn list_messages(&self, channel_id: &str, limit: u8) -> Result<Vec<Message>, RestError> {
        self.record(ApiCall::List {
            channel_id: channel_id.to_string(),
            limit,
        });
        let history = self.history.lock().unwrap();
        Ok(history.iter().take(limit as usize).cloned().collect())
    }

    async fn trigger_typing(&self, channel_id: &str) -> Result<(), RestError> {
        self.record(ApiCall::Typing {
            channel_id: channel_id.to_string(),
        });
        Ok(())
    }

    async fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<(), RestError> {
        self.record(ApiCall::Reaction {
            channel_id: channel_id.to_string(),
            message_id: message_id.to_string(),
            emoji: emoji.to_string(),
        });
        Ok(())
    }
}
