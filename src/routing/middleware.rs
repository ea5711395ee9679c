//! Route lookup middleware.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::request::request_id;
use crate::http::response::GatewayError;
use crate::observability::metrics;
use crate::routing::router::{MatchedRoute, Router};

/// Attach the matched route to the request, or answer 404.
pub async fn route_middleware(
    State(router): State<Arc<Router>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match router.match_request(&request) {
        Some(route) => {
            request.extensions_mut().insert(MatchedRoute(route));
            next.run(request).await
        }
        None => {
            tracing::warn!(
                request_id = %request_id(&request),
                path = %request.uri().path(),
                "No route matched"
            );
            metrics::record_unmatched(request.method().as_str());
            GatewayError::NoRoute.into_response()
        }
    }
}
