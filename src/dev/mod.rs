//! Development-mode live-reload subsystem.
//!
//! # Data Flow
//! ```text
//! Source edit on disk
//!     → watcher.rs (PollWatcher, 100ms)
//!     → server.rs bumps generation, broadcasts ReloadEvent
//!     → hmr.rs pushes it over WebSocket → browser reloads
//!
//! Render request (development)
//!     → server.rs: fresh index.html → transform.rs (client script, URLs)
//!     → server.rs: load entry module fresh → ScriptRender
//!     → on failure: transform.rs rewrites stack frames
//! ```
//!
//! # Design Decisions
//! - One service per site, each with its own root, watcher and port
//! - The dispatcher only sees the narrow `LiveService` contract

pub mod hmr;
pub mod server;
pub mod transform;
pub mod watcher;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;

use crate::render::{Render, RenderError};

pub use server::{DevServer, DevServerOptions};

/// The capabilities the dispatcher needs from a live-reload service.
#[async_trait]
pub trait LiveService: Send + Sync {
    /// Prepare a raw `index.html` for the browser at `url`.
    async fn transform_index_html(&self, url: &str, html: String) -> Result<String, RenderError>;

    /// Load a module from the site root, bypassing any cache.
    async fn load_module(&self, path: &str) -> Result<Arc<dyn Render>, RenderError>;

    /// Map stack frames back to source locations.
    fn fix_stacktrace(&self, error: RenderError) -> RenderError;

    /// Add this service's request middleware to `router`.
    fn install(&self, router: Router) -> Router;
}
