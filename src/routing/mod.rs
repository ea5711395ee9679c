//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → validate upstream, drop malformed rate limit policies
//!     → sort by priority
//!     → freeze as immutable Router
//!
//! Incoming Request (host, path):
//!     → middleware.rs (route lookup)
//!     → MatchedRoute extension (read by rate limiting and forwarding)
//!     → or 404 when nothing matches
//! ```
//!
//! # Design Decisions
//! - Routes and their policies are fixed for the process lifetime
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by priority)

pub mod matcher;
pub mod middleware;
pub mod router;

pub use middleware::route_middleware;
pub use router::{MatchedRoute, Route, Router};
