//! Route table compiled from configuration.
//!
//! # Design Decisions
//! - Immutable after construction, shared via `Arc` without locks
//! - Sorted by priority once; ties keep declaration order
//! - Malformed rate limit policies are dropped here with a warning, so the
//!   route behaves as if it declared none

use std::sync::Arc;

use axum::http::{uri::Authority, Request};

use crate::config::{PolicyDeclaration, RouteConfig};
use crate::routing::matcher::RouteMatcher;
use crate::security::rate_limit::RateLimitPolicy;

/// A compiled route.
#[derive(Debug, Clone)]
pub struct Route {
    pub name: String,
    pub upstream: Authority,
    pub priority: u32,
    pub rate_limit: Option<RateLimitPolicy>,
    matcher: RouteMatcher,
}

impl Route {
    pub fn matches<B>(&self, req: &Request<B>) -> bool {
        self.matcher.matches(req)
    }
}

/// Request extension carrying the route chosen for a request.
#[derive(Debug, Clone)]
pub struct MatchedRoute(pub Arc<Route>);

/// Ordered, immutable set of routes.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Arc<Route>>,
}

impl Router {
    /// Compile route declarations. Routes whose upstream cannot be parsed
    /// are skipped.
    pub fn from_config(configs: Vec<RouteConfig>) -> Self {
        let mut routes: Vec<Arc<Route>> = configs
            .into_iter()
            .filter_map(compile_route)
            .map(Arc::new)
            .collect();

        // Stable sort keeps declaration order among equal priorities.
        routes.sort_by(|a, b| b.priority.cmp(&a.priority));

        Self { routes }
    }

    /// First route, by priority, that matches the request.
    pub fn match_request<B>(&self, req: &Request<B>) -> Option<Arc<Route>> {
        self.routes.iter().find(|r| r.matches(req)).cloned()
    }

    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }
}

fn compile_route(config: RouteConfig) -> Option<Route> {
    let upstream = match parse_upstream(&config.upstream) {
        Some(a) => a,
        None => {
            tracing::error!(
                route = %config.name,
                upstream = %config.upstream,
                "Invalid upstream, route skipped"
            );
            return None;
        }
    };

    let rate_limit = match config.rate_limit {
        Some(PolicyDeclaration::Policy(policy)) if policy.is_valid() => Some(policy),
        Some(PolicyDeclaration::Policy(policy)) => {
            tracing::warn!(
                route = %config.name,
                limit = policy.limit,
                window_seconds = policy.window_seconds,
                "Malformed rate limit policy ignored"
            );
            None
        }
        Some(PolicyDeclaration::Malformed(raw)) => {
            tracing::warn!(
                route = %config.name,
                declaration = %raw,
                "Malformed rate limit policy ignored"
            );
            None
        }
        None => None,
    };

    Some(Route {
        matcher: RouteMatcher::new(config.host.as_deref(), config.path_prefix.as_deref()),
        name: config.name,
        upstream,
        priority: config.priority,
        rate_limit,
    })
}

/// Accepts `host:port` or `http://host:port`.
pub(crate) fn parse_upstream(upstream: &str) -> Option<Authority> {
    let authority = upstream
        .strip_prefix("http://")
        .unwrap_or(upstream)
        .trim_end_matches('/');
    authority.parse().ok()
}
