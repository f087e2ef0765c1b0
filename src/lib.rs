//! Dual-site server-side rendering dispatcher.
//!
//! Serves two independently built front-end applications from one process,
//! each under its own URL prefix, in either development mode (fresh
//! templates, live module loading, polling live-reload) or production mode
//! (templates, manifest and server entry captured at boot).

pub mod config;
pub mod dev;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod render;
pub mod routing;

pub use config::{Mode, ServerConfig};
pub use http::HttpServer;
pub use lifecycle::{initialize, Shutdown, SsrApp, StartupError};
