//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (route already matched):
//!     → client_ip.rs (derive client identity)
//!     → rate_limit.rs (evaluate the route's policy)
//!     → middleware.rs (429 on reject, else continue)
//!     → headers.rs (X-Forwarded-* on the way upstream)
//! ```
//!
//! # Design Decisions
//! - Rate limiting is opt-in per route
//! - A malformed policy is skipped, never turned into an error
//! - Forwarded headers are only trusted when configured

pub mod client_ip;
pub mod headers;
pub mod middleware;
pub mod rate_limit;

pub use client_ip::{client_identity, UNKNOWN_CLIENT};
pub use middleware::{rate_limit_middleware, RateLimitState};
pub use rate_limit::{
    Clock, Decision, FixedSampler, ManualClock, RandomSampler, RateLimitError, RateLimitPolicy,
    RateLimiter, SweepSampler, SystemClock,
};
