use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::observability::metrics;
use crate::security::rate_limit::RateLimitPolicy;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct RoutePolicy {
    pub route: String,
    pub rate_limit: Option<RateLimitPolicy>,
}

#[derive(Serialize)]
pub struct RateLimitSummary {
    pub tracked_clients: usize,
    pub tracked_timestamps: usize,
    pub routes: Vec<RoutePolicy>,
}

#[derive(Serialize)]
pub struct SweepResult {
    pub evicted_clients: usize,
    pub remaining_clients: usize,
}

pub async fn get_status() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

pub async fn get_rate_limits(State(state): State<AdminState>) -> Json<RateLimitSummary> {
    let tracked_clients = state.limiter.tracked_clients();
    metrics::record_tracked_clients(tracked_clients);

    let routes = state
        .routes
        .routes()
        .iter()
        .map(|r| RoutePolicy {
            route: r.name.clone(),
            rate_limit: r.rate_limit,
        })
        .collect();

    Json(RateLimitSummary {
        tracked_clients,
        tracked_timestamps: state.limiter.tracked_timestamps(),
        routes,
    })
}

pub async fn sweep_rate_limits(State(state): State<AdminState>) -> Json<SweepResult> {
    let evicted_clients = state.limiter.sweep();
    tracing::info!(evicted_clients, "Manual rate limit sweep");

    Json(SweepResult {
        evicted_clients,
        remaining_clients: state.limiter.tracked_clients(),
    })
}
