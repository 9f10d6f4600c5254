//! Control API handlers.
//!
//! Config responses are built from [`SafeConfig`], which has no token
//! field; nothing here can serialize the token by accident.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use rune_gateway_protocol::Status;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::gateway::GatewayError;
use crate::response;
use crate::runtime::{ConfigUpdate, Runtime};
use crate::server::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Config as exposed over HTTP.
#[derive(Debug, Serialize)]
pub struct SafeConfig {
    prefix: String,
    auto_response_enabled: bool,
    auto_response_phrase: String,
    auto_emoji_enabled: bool,
    auto_emoji: String,
    current_status: Status,
    custom_status: Option<String>,
}

impl SafeConfig {
    async fn from_runtime(runtime: &Runtime) -> Self {
        // Flag before config, per the runtime lock order.
        let auto_response_enabled = runtime.auto_response_enabled().await;
        let presence = runtime.presence().await;
        let config = runtime.config().read().await;
        Self {
            prefix: config.prefix.clone(),
            auto_response_enabled,
            auto_response_phrase: config.auto_response_phrase.clone(),
            auto_emoji_enabled: config.auto_emoji_enabled,
            auto_emoji: config.auto_emoji.clone(),
            current_status: presence.status,
            custom_status: presence.custom_text,
        }
    }
}

#[derive(Serialize)]
pub struct StatsResponse {
    uptime_days: u64,
    uptime_hours: u64,
    uptime_minutes: u64,
    uptime_seconds: u64,
    commands_handled: u64,
    messages_seen: u64,
    memory_usage_mb: f64,
}

#[derive(Serialize)]
pub struct ToggleResponse {
    enabled: bool,
    message: String,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    status: String,
    #[serde(default)]
    custom_text: Option<String>,
}

#[derive(Serialize)]
pub struct StatusResponse {
    status: Status,
    custom_text: Option<String>,
    message: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/config
pub async fn get_config(State(state): State<AppState>) -> Json<SafeConfig> {
    Json(SafeConfig::from_runtime(&state.runtime).await)
}

/// PUT /api/config
pub async fn update_config(
    State(state): State<AppState>,
    body: Result<Json<ConfigUpdate>, JsonRejection>,
) -> Response {
    let Json(update) = match body {
        Ok(body) => body,
        Err(rejection) => return response::bad_request(rejection.body_text()),
    };
    if let Err(e) = state.runtime.apply_update(update).await {
        warn!(error = %e, "Config update failed");
        return response::internal_error(format!("Failed to save config: {e}"));
    }
    info!("Config updated via API");
    Json(SafeConfig::from_runtime(&state.runtime).await).into_response()
}

/// GET /api/stats
pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let snapshot = state.runtime.stats().snapshot().await;
    let uptime = snapshot.uptime_parts();
    Json(StatsResponse {
        uptime_days: uptime.days,
        uptime_hours: uptime.hours,
        uptime_minutes: uptime.minutes,
        uptime_seconds: uptime.seconds,
        commands_handled: snapshot.commands_handled,
        messages_seen: snapshot.messages_seen,
        memory_usage_mb: snapshot.memory_mb(),
    })
}

fn toggle_response(feature: &str, enabled: bool) -> Response {
    let state = if enabled { "enabled" } else { "disabled" };
    Json(ToggleResponse {
        enabled,
        message: format!("{feature} {state}"),
    })
    .into_response()
}

/// POST /api/toggle/autoresponder
pub async fn toggle_autoresponder(State(state): State<AppState>) -> Response {
    match state.runtime.toggle_auto_response().await {
        Ok(enabled) => toggle_response("Auto responder", enabled),
        Err(e) => response::internal_error(format!("Failed to save config: {e}")),
    }
}

/// POST /api/toggle/autoemoji
pub async fn toggle_autoemoji(State(state): State<AppState>) -> Response {
    match state.runtime.toggle_auto_emoji().await {
        Ok(enabled) => toggle_response("Auto emoji", enabled),
        Err(e) => response::internal_error(format!("Failed to save config: {e}")),
    }
}

/// POST /api/status
pub async fn update_status(
    State(state): State<AppState>,
    body: Result<Json<StatusRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return response::bad_request(rejection.body_text()),
    };
    let status = match req.status.parse::<Status>() {
        Ok(status) => status,
        Err(e) => return response::bad_request(e.to_string()),
    };
    let custom_text = req.custom_text.filter(|t| !t.is_empty());

    match state.runtime.set_presence(status, custom_text.clone()).await {
        Ok(()) => Json(StatusResponse {
            status,
            custom_text,
            message: format!("Status updated to {status}"),
        })
        .into_response(),
        Err(GatewayError::NotConnected) => {
            response::service_unavailable("Gateway is not connected")
        }
        Err(e) => {
            warn!(error = %e, "Presence update failed");
            response::service_unavailable(format!("Failed to update status: {e}"))
        }
    }
}
