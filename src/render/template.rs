//! HTML shell templates and response composition.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::dev::LiveService;
use crate::render::RenderError;

pub const PRELOAD_LINKS_PLACEHOLDER: &str = "<!--preload-links-->";
pub const APP_HTML_PLACEHOLDER: &str = "<!--app-html-->";

/// Substitute both placeholders once each.
///
/// A missing placeholder is left alone; this never fails.
pub fn compose(template: &str, preload_links: &str, app_html: &str) -> String {
    template
        .replacen(PRELOAD_LINKS_PLACEHOLDER, preload_links, 1)
        .replacen(APP_HTML_PLACEHOLDER, app_html, 1)
}

/// Supplies the shell template for one application context.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    /// `url` is the request URL with the site prefix already stripped.
    async fn load(&self, url: &str) -> Result<Arc<str>, RenderError>;
}

/// Template captured at boot and reused verbatim.
#[derive(Debug, Clone)]
pub struct CachedTemplate {
    content: Arc<str>,
}

impl CachedTemplate {
    pub fn new(content: impl Into<Arc<str>>) -> Self {
        Self { content: content.into() }
    }

    /// Read once; the caller decides how a missing file is reported.
    pub async fn read(path: &std::path::Path) -> std::io::Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(Self::new(content))
    }
}

#[async_trait]
impl TemplateSource for CachedTemplate {
    async fn load(&self, _url: &str) -> Result<Arc<str>, RenderError> {
        Ok(Arc::clone(&self.content))
    }
}

/// Template re-read from disk on every request and passed through the
/// live-reload transform.
pub struct DevTemplate {
    path: PathBuf,
    live: Arc<dyn LiveService>,
}

impl DevTemplate {
    pub fn new(path: impl Into<PathBuf>, live: Arc<dyn LiveService>) -> Self {
        Self {
            path: path.into(),
            live,
        }
    }
}

#[async_trait]
impl TemplateSource for DevTemplate {
    async fn load(&self, url: &str) -> Result<Arc<str>, RenderError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| RenderError::Template {
                path: self.path.clone(),
                source,
            })?;
        let html = self.live.transform_index_html(url, raw).await?;
        Ok(html.into())
    }
}
