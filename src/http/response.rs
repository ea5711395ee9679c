//! Error responses produced by the gateway itself.
//!
//! All gateway-originated errors share one JSON shape:
//! `{"error": "<code>", "message": "<text>"}`. Upstream responses pass
//! through untouched.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Build a JSON error response.
pub fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (status, Json(json!({ "error": code, "message": message }))).into_response()
}

/// Failures on the forwarding path.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("no route matches the request")]
    NoRoute,

    #[error("could not build upstream request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("upstream request failed: {0}")]
    Upstream(String),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::NoRoute => {
                error_response(StatusCode::NOT_FOUND, "not_found", "No matching route found")
            }
            GatewayError::Request(_) | GatewayError::Upstream(_) => error_response(
                StatusCode::BAD_GATEWAY,
                "bad_gateway",
                "Upstream request failed",
            ),
        }
    }
}
