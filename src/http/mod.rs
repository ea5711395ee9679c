//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (assign/propagate request ID)
//!     → routing (match route, 404 otherwise)
//!     → security (rate limit, 429 otherwise)
//!     → server.rs (forward to upstream, 502 on failure)
//!     → response.rs (gateway-originated error bodies)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{request_id, MakeRequestUuid, X_REQUEST_ID};
pub use response::GatewayError;
pub use server::HttpServer;
