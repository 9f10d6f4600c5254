//! REST error types.

use thiserror::Error;

/// Classify a non-success response. Returns `None` for 2xx.
pub fn check_response_error(response: &reqwest::Response) -> Option<RestError> {
    let status = response.status();
    if status.is_success() {
        return None;
    }
    match status.as_u16() {
        401 | 403 => Some(RestError::Unauthorized {
            status: status.as_u16(),
        }),
        429 => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<f64>().ok());
            Some(RestError::RateLimited { retry_after })
        }
        _ => None,
    }
}

/// Errors from platform REST calls.
#[derive(Debug, Error)]
pub enum RestError {
    /// Transport failure, timeout, or undecodable body.
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// API returned an unexpected status.
    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// 429 from the platform.
    #[error("rate limited (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<f64> },

    /// The token was rejected.
    #[error("unauthorized (status {status})")]
    Unauthorized { status: u16 },
}
