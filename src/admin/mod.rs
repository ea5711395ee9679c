//! Admin API for inspecting and sweeping the rate limiter.
//!
//! Served on its own listener, behind a bearer token.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::lifecycle::shutdown;
use crate::routing::Router as RouteTable;
use crate::security::rate_limit::RateLimiter;

/// Shared with the public server: same limiter, same routes.
#[derive(Clone, Debug)]
pub struct AdminState {
    pub limiter: Arc<RateLimiter>,
    pub routes: Arc<RouteTable>,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/rate-limits", get(get_rate_limits))
        .route("/admin/rate-limits/sweep", post(sweep_rate_limits))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state)
}

/// Serve the admin API until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    state: AdminState,
    shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    tracing::info!(address = %listener.local_addr()?, "Admin API listening");

    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(shutdown::wait(shutdown))
        .await
}
