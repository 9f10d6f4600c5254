use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use rune_gateway_protocol::{Message, User};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::DiscordApi;
use super::error::{RestError, check_response_error};

pub const DEFAULT_BASE_URL: &str = "https://discord.com/api/v10";

/// Browser-like user agent sent with every request.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                              (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// reqwest-backed [`DiscordApi`].
pub struct RestClient {
    client: Client,
    base_url: String,
    token: String,
}

impl RestClient {
    pub fn new(token: impl Into<String>) -> Result<Self, RestError> {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, RestError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header(AUTHORIZATION, &self.token)
    }

    /// Send and fail on anything but a 2xx.
    async fn execute(&self, request: RequestBuilder) -> Result<Response, RestError> {
        let response = request.send().await?;
        if let Some(err) = check_response_error(&response) {
            return Err(err);
        }
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response)
    }

    /// Send and require exactly `expected`.
    async fn execute_expecting(
        &self,
        request: RequestBuilder,
        expected: StatusCode,
    ) -> Result<(), RestError> {
        let response = self.execute(request).await?;
        if response.status() != expected {
            return Err(api_error(response).await);
        }
        Ok(())
    }
}

async fn api_error(response: Response) -> RestError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    RestError::Api { status, message }
}

#[derive(Serialize)]
struct ContentBody<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
struct IdBody {
    id: String,
}

#[derive(Deserialize)]
struct GatewayBody {
    url: String,
}

#[async_trait]
impl DiscordApi for RestClient {
    async fn gateway_url(&self) -> Result<String, RestError> {
        let response = self.execute(self.request(Method::GET, "/gateway")).await?;
        let body: GatewayBody = response.json().await?;
        Ok(body.url)
    }

    async fn current_user(&self) -> Result<User, RestError> {
        let response = self.execute(self.request(Method::GET, "/users/@me")).await?;
        Ok(response.json().await?)
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<String, RestError> {
        let request = self
            .request(Method::POST, &format!("/channels/{channel_id}/messages"))
            .json(&ContentBody { content });
        let result: Result<String, RestError> = async {
            let response = self.execute(request).await?;
            let body: IdBody = response.json().await?;
            Ok(body.id)
        }
        .await;

        match &result {
            Ok(id) => debug!(channel_id, message_id = %id, "Message sent"),
            Err(e) => warn!(channel_id, error = %e, "Failed to send message"),
        }
        result
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<(), RestError> {
        let request = self
            .request(
                Method::PATCH,
                &format!("/channels/{channel_id}/messages/{message_id}"),
            )
            .json(&ContentBody { content });
        self.execute_expecting(request, StatusCode::OK).await
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), RestError> {
        let request = self.request(
            Method::DELETE,
            &format!("/channels/{channel_id}/messages/{message_id}"),
        );
        self.execute_expecting(request, StatusCode::NO_CONTENT)
            .await
    }

    async fn list_messages(&self, channel_id: &str, limit: u8) -> Result<Vec<Message>, RestError> {
        let limit = limit.clamp(1, 100);
        let request = self.request(
            Method::GET,
            &format!("/channels/{channel_id}/messages?limit={limit}"),
        );
        let response = self.execute(request).await?;
        Ok(response.json().await?)
    }

    async fn trigger_typing(&self, channel_id: &str) -> Result<(), RestError> {
        let request = self.request(Method::POST, &format!("/channels/{channel_id}/typing"));
        self.execute_expecting(request, StatusCode::NO_CONTENT)
            .await
    }

    async fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<(), RestError> {
        let emoji: String = url::form_urlencoded::byte_serialize(emoji.as_bytes()).collect();
        let request = self.request(
            Method::PUT,
            &format!("/channels/{channel_id}/messages/{message_id}/reactions/{emoji}/@me"),
        );
        self.execute_expecting(request, StatusCode::NO_CONTENT)
            .await
    }
}
