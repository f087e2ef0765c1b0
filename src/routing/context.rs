//! Application contexts: one per front-end site.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::dev::LiveService;
use crate::render::{Render, RenderError, RenderSource, TemplateSource};
use crate::routing::matcher::PathPrefixMatcher;

/// Template and render function resolved for one request.
pub struct Resolved {
    pub template: Arc<str>,
    pub render: Arc<dyn Render>,
}

/// One site: its prefix, root and the mode-specific strategies wired in at
/// startup. Shared read-only by all requests.
pub struct ApplicationContext {
    name: String,
    matcher: PathPrefixMatcher,
    root: PathBuf,
    template: Arc<dyn TemplateSource>,
    module: Arc<dyn RenderSource>,
    live: Option<Arc<dyn LiveService>>,
}

impl ApplicationContext {
    pub fn new(
        name: impl Into<String>,
        prefix: impl Into<String>,
        root: impl Into<PathBuf>,
        template: Arc<dyn TemplateSource>,
        module: Arc<dyn RenderSource>,
    ) -> Self {
        Self {
            name: name.into(),
            matcher: PathPrefixMatcher::new(prefix),
            root: root.into(),
            template,
            module,
            live: None,
        }
    }

    /// Attach the live-reload service (development only).
    pub fn with_live_service(mut self, live: Arc<dyn LiveService>) -> Self {
        self.live = Some(live);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> &str {
        self.matcher.prefix()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn matcher(&self) -> &PathPrefixMatcher {
        &self.matcher
    }

    pub fn live_service(&self) -> Option<&Arc<dyn LiveService>> {
        self.live.as_ref()
    }

    /// Template first, then the render function.
    pub async fn resolve(&self, url: &str) -> Result<Resolved, RenderError> {
        let template = self.template.load(url).await?;
        let render = self.module.resolve().await?;
        Ok(Resolved { template, render })
    }

    /// Pass a failure through the live service's stack normalization, if any.
    pub fn normalize_error(&self, error: RenderError) -> RenderError {
        match &self.live {
            Some(live) => live.fix_stacktrace(error),
            None => error,
        }
    }
}

impl fmt::Debug for ApplicationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationContext")
            .field("name", &self.name)
            .field("prefix", &self.matcher.prefix())
            .field("root", &self.root)
            .field("live", &self.live.is_some())
            .finish()
    }
}
