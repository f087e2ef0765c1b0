//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Pick mode → Build both application contexts
//!     → Build router → (unless test build) bind listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → HTTP server and live-reload
//!     transports stop accepting → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: a missing production artifact aborts before binding
//! - Contexts are built in order (site A, then site B)
//! - The listener starts last (traffic only when ready)

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{initialize, SsrApp, StartupError};
