//! Rate-limiting API gateway for the arcade gaming platform.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use security::rate_limit::{Decision, RateLimitPolicy, RateLimiter};
