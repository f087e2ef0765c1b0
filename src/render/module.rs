//! Render function resolution.

use std::sync::Arc;

use async_trait::async_trait;

use crate::dev::LiveService;
use crate::render::{Render, RenderError};

/// Supplies the `render` capability for one application context.
#[async_trait]
pub trait RenderSource: Send + Sync {
    async fn resolve(&self) -> Result<Arc<dyn Render>, RenderError>;
}

/// Server entry imported once at boot; every request gets the same handle.
#[derive(Clone)]
pub struct PrecompiledModule {
    render: Arc<dyn Render>,
}

impl PrecompiledModule {
    pub fn new(render: Arc<dyn Render>) -> Self {
        Self { render }
    }
}

#[async_trait]
impl RenderSource for PrecompiledModule {
    async fn resolve(&self) -> Result<Arc<dyn Render>, RenderError> {
        Ok(Arc::clone(&self.render))
    }
}

/// Entry module loaded fresh through the live-reload service per request.
pub struct DevModule {
    entry: String,
    live: Arc<dyn LiveService>,
}

impl DevModule {
    pub fn new(entry: impl Into<String>, live: Arc<dyn LiveService>) -> Self {
        Self {
            entry: entry.into(),
            live,
        }
    }
}

#[async_trait]
impl RenderSource for DevModule {
    async fn resolve(&self) -> Result<Arc<dyn Render>, RenderError> {
        self.live.load_module(&self.entry).await
    }
}
