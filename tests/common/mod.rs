//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use ssr_dispatcher::http::{build_router, Dispatcher, TransportMiddleware};
use ssr_dispatcher::render::{
    CachedTemplate, Manifest, PrecompiledModule, Render, RenderError, RenderResult, RenderSource,
    TemplateSource,
};
use ssr_dispatcher::routing::{ApplicationContext, SiteRouter};

pub const TEMPLATE: &str =
    "<html><head><!--preload-links--></head><body><!--app-html--></body></html>";

/// In-process render function built from a closure.
pub struct FnRender<F> {
    f: F,
    calls: AtomicUsize,
}

impl<F> FnRender<F>
where
    F: Fn(&str, &Manifest) -> Result<RenderResult, RenderError> + Send + Sync,
{
    pub fn new(f: F) -> Arc<Self> {
        Arc::new(Self {
            f,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<F> Render for FnRender<F>
where
    F: Fn(&str, &Manifest) -> Result<RenderResult, RenderError> + Send + Sync,
{
    async fn render(&self, url: &str, manifest: &Manifest) -> Result<RenderResult, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        (self.f)(url, manifest)
    }
}

/// Render that echoes `site:url` as the app markup.
pub fn echo(site: &'static str) -> Arc<dyn Render> {
    FnRender::new(move |url, _| Ok(RenderResult::new(format!("{}:{}", site, url), "")))
}

/// A context with a fixed template and render function.
pub fn cached_site(
    name: &str,
    prefix: &str,
    template: &str,
    render: Arc<dyn Render>,
) -> ApplicationContext {
    let template: Arc<dyn TemplateSource> = Arc::new(CachedTemplate::new(template));
    let module: Arc<dyn RenderSource> = Arc::new(PrecompiledModule::new(render));
    ApplicationContext::new(name, prefix, name, template, module)
}

/// Router over two cached sites at `/test/` and `/test2/`, no static mounts.
pub fn router(a: ApplicationContext, b: ApplicationContext, manifest: Manifest) -> Router {
    let dispatcher = Dispatcher::new(SiteRouter::new(a, b), manifest);
    build_router(dispatcher, &TransportMiddleware::Production { mounts: Vec::new() })
}

/// Drive one request through `router` in-process.
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, String) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, String::from_utf8_lossy(&body).into_owned())
}

pub async fn get(router: &Router, uri: &str) -> (StatusCode, HeaderMap, String) {
    send(router, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

pub fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}
