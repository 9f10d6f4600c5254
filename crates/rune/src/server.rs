use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

use crate::handlers;
use crate::runtime::Runtime;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<Runtime>,
}

pub fn build_app(state: AppState, request_timeout_secs: u64) -> Router {
    let api = Router::new()
        .route(
            "/config",
            get(handlers::get_config)
                .put(handlers::update_config)
                .options(handlers::preflight),
        )
        .route(
            "/stats",
            get(handlers::get_stats).options(handlers::preflight),
        )
        .route(
            "/toggle/autoresponder",
            post(handlers::toggle_autoresponder).options(handlers::preflight),
        )
        .route(
            "/toggle/autoemoji",
            post(handlers::toggle_autoemoji).options(handlers::preflight),
        )
        .route(
            "/status",
            post(handlers::update_status).options(handlers::preflight),
        )
        .with_state(state);

    Router::new()
        .route("/livez", get(handlers::livez).options(handlers::preflight))
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(request_timeout_secs),
        ))
}

/// Serve the control API until `cancel` fires.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let addr: Option<SocketAddr> = listener.local_addr().ok();
    info!(addr = ?addr, "Control API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;
    info!("Control API stopped");
    Ok(())
}
