//! The catch-all render handler.
//!
//! # Request States
//! ```text
//! Unmatched → transport default (404, empty body)
//! Matched → Resolving → Rendering → Composing → 200 text/html
//!                    ↘ Failed → normalize → log → 500 text/plain
//! ```
//!
//! No retries and no timeout: a failure is terminal for its request only,
//! and a render that never completes holds only its own request.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::http::request::request_id;
use crate::observability::metrics;
use crate::render::{compose, Manifest, RenderError, RenderResult};
use crate::routing::{ApplicationContext, Resolved, SiteMatch, SiteRouter};

/// Sites plus the manifest, shared by every request.
#[derive(Clone)]
pub struct Dispatcher {
    sites: Arc<SiteRouter>,
    manifest: Arc<Manifest>,
}

impl Dispatcher {
    pub fn new(sites: SiteRouter, manifest: Manifest) -> Self {
        Self {
            sites: Arc::new(sites),
            manifest: Arc::new(manifest),
        }
    }

    pub fn sites(&self) -> &SiteRouter {
        &self.sites
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Resolve, render and compose one page for `site`.
    pub async fn render_page(
        &self,
        site: &ApplicationContext,
        url: &str,
    ) -> Result<String, RenderError> {
        let Resolved { template, render } = site.resolve(url).await?;
        let RenderResult {
            app_html,
            preload_links,
        } = render.render(url, &self.manifest).await?;
        Ok(compose(&template, &preload_links, &app_html))
    }
}

/// Router fallback: every request not answered by middleware lands here.
pub async fn dispatch(State(dispatcher): State<Dispatcher>, request: Request) -> Response {
    let start = Instant::now();
    let request_id = request_id(&request);
    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let Some(SiteMatch { site, url }) = dispatcher.sites().match_target(&target) else {
        tracing::debug!(request_id = %request_id, target = %target, "No site matched");
        return transport_default();
    };

    tracing::debug!(
        request_id = %request_id,
        site = %site.name(),
        url = %url,
        "Rendering"
    );

    match dispatcher.render_page(site, &url).await {
        Ok(html) => {
            metrics::record_render(site.name(), 200, start);
            (StatusCode::OK, [(header::CONTENT_TYPE, "text/html")], html).into_response()
        }
        Err(error) => {
            let detail = site.normalize_error(error).detail();
            tracing::error!(
                request_id = %request_id,
                site = %site.name(),
                url = %url,
                "Render failed:\n{}",
                detail
            );
            metrics::record_render(site.name(), 500, start);
            (StatusCode::INTERNAL_SERVER_ERROR, detail).into_response()
        }
    }
}

/// What the transport answers when nothing handled the request.
pub fn transport_default() -> Response {
    StatusCode::NOT_FOUND.into_response()
}
