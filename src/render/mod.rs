//! Rendering subsystem.
//!
//! # Data Flow
//! ```text
//! ApplicationContext
//!     → TemplateSource (template.rs): cached shell or fresh read + transform
//!     → RenderSource (module.rs): precompiled entry or freshly loaded module
//!     → Render::render(url, manifest)
//!       development: script.rs, one runtime process per render
//!       production: worker.rs, one runtime process importing the entry once
//!     → compose(template, preload_links, app_html)
//! ```
//!
//! # Design Decisions
//! - Strategies are chosen once at startup; request code only sees traits
//! - Every request-scoped failure is a `RenderError` value, never a panic
//! - The manifest is shared read-only across all requests

mod bootstrap;
pub mod manifest;
pub mod module;
pub mod script;
pub mod template;
pub mod worker;

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

pub use manifest::Manifest;
pub use module::{DevModule, PrecompiledModule, RenderSource};
pub use script::ScriptRender;
pub use template::{compose, CachedTemplate, DevTemplate, TemplateSource};
pub use worker::ScriptWorker;

/// Output of one render invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderResult {
    /// Markup substituted for `<!--app-html-->`.
    pub app_html: String,
    /// Markup substituted for `<!--preload-links-->`.
    pub preload_links: String,
}

impl RenderResult {
    pub fn new(app_html: impl Into<String>, preload_links: impl Into<String>) -> Self {
        Self {
            app_html: app_html.into(),
            preload_links: preload_links.into(),
        }
    }
}

/// A server entry's `render(url, manifest)` capability.
#[async_trait]
pub trait Render: Send + Sync {
    async fn render(&self, url: &str, manifest: &Manifest) -> Result<RenderResult, RenderError>;
}

/// Failures while resolving, invoking or composing a render.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Template could not be read.
    #[error("failed to read template {}: {source}", path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Entry module does not exist.
    #[error("failed to load module {}: file not found", path.display())]
    ModuleNotFound { path: PathBuf },

    /// The render runtime could not be started or awaited.
    #[error("failed to run render runtime '{program}': {source}")]
    Runtime {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The render function threw; carries the message and stack.
    #[error("{stack}")]
    Thrown { stack: String },

    /// The render function returned something other than two strings.
    #[error("render returned an invalid result: {detail}")]
    InvalidResult { detail: String },
}

impl RenderError {
    pub fn thrown(stack: impl Into<String>) -> Self {
        RenderError::Thrown { stack: stack.into() }
    }

    /// Text sent as the 500 response body.
    pub fn detail(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thrown_detail_is_raw_stack() {
        let err = RenderError::thrown("Error: boom\n    at render (/src/entry-server.js:3:9)");
        assert_eq!(err.detail(), "Error: boom\n    at render (/src/entry-server.js:3:9)");
    }

    #[test]
    fn test_module_not_found_detail() {
        let err = RenderError::ModuleNotFound {
            path: PathBuf::from("/app/src/entry-server.js"),
        };
        assert!(err.detail().contains("/app/src/entry-server.js"));
    }
}
