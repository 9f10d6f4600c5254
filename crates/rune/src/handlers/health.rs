use axum::http::StatusCode;

pub async fn livez() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Bare 200 for OPTIONS requests that are not CORS preflights.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}
