//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum, request ID, tracing)
//!     → development: live-reload middleware (site A, then site B)
//!       production: compression → static_files.rs mounts
//!     → dispatch.rs (site match → resolve → render → compose)
//!     → Send to client
//! ```

pub mod dispatch;
pub mod request;
pub mod server;
pub mod static_files;

pub use dispatch::Dispatcher;
pub use request::X_REQUEST_ID;
pub use server::{build_router, HttpServer, TransportMiddleware};
pub use static_files::StaticMount;
