//! Per-route rate limiting middleware.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::observability::metrics;
use crate::routing::MatchedRoute;
use crate::security::client_ip::client_identity;
use crate::security::rate_limit::RateLimiter;

/// State for the rate limiting layer.
#[derive(Clone, Debug)]
pub struct RateLimitState {
    pub limiter: Arc<RateLimiter>,
    pub enabled: bool,
    pub trust_forwarded_for: bool,
}

/// Evaluate the matched route's policy for the calling client.
///
/// Requests without a matched route, or on a route with no policy, pass
/// straight through.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.enabled {
        return next.run(request).await;
    }

    let Some(MatchedRoute(route)) = request.extensions().get::<MatchedRoute>().cloned() else {
        return next.run(request).await;
    };

    let start_time = Instant::now();
    let client = client_identity(&request, state.trust_forwarded_for);

    match state.limiter.check(route.rate_limit.as_ref(), &client) {
        Ok(()) => next.run(request).await,
        Err(err) => {
            tracing::warn!(
                client = %client,
                route = %route.name,
                error = %err,
                "Rate limit exceeded"
            );
            metrics::record_rate_limited(&route.name);
            let response = err.into_response();
            metrics::record_request(
                request.method().as_str(),
                response.status().as_u16(),
                &route.name,
                start_time,
            );
            response
        }
    }
}
