//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → handed to HttpServer, which compiles routes and the limiter
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; route policies are fixed for the
//!   process lifetime, so there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, GatewayConfig, ListenerConfig, ObservabilityConfig, PolicyDeclaration, RateLimitConfig,
    RouteConfig, SecurityConfig, TimeoutConfig,
};
