//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → metrics → routes + limiter → admin listener → public listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → servers stop accepting → drain → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)
//! - The limiter registry is dropped with the process; nothing is persisted

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
