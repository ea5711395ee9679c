//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, upstreams and value ranges
//! - Detect duplicate route names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Malformed route rate limit policies are not errors; the route table
//!   drops them and the route is served without a limit

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;
use crate::routing::router::parse_upstream;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("route name must not be empty")]
    EmptyRouteName,

    #[error("route '{0}' is declared more than once")]
    DuplicateRoute(String),

    #[error("route '{route}': invalid upstream '{upstream}'")]
    InvalidUpstream { route: String, upstream: String },

    #[error("rate_limit.sweep_probability must be within [0, 1], got {0}")]
    SweepProbability(f64),

    #[error("rate_limit.stale_after_secs must be greater than zero")]
    ZeroStaleAfter,

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,
}

/// Check a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
    }

    let mut seen = HashSet::new();
    for route in &config.routes {
        if route.name.trim().is_empty() {
            errors.push(ValidationError::EmptyRouteName);
        } else if !seen.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.name.clone()));
        }
        if parse_upstream(&route.upstream).is_none() {
            errors.push(ValidationError::InvalidUpstream {
                route: route.name.clone(),
                upstream: route.upstream.clone(),
            });
        }
    }

    let p = config.rate_limit.sweep_probability;
    if !(0.0..=1.0).contains(&p) {
        errors.push(ValidationError::SweepProbability(p));
    }
    if config.rate_limit.stale_after_secs == 0 {
        errors.push(ValidationError::ZeroStaleAfter);
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
