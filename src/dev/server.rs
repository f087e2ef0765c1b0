//! Per-site live-reload service.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{Request, State},
    http::header,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use notify::PollWatcher;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::Mode;
use crate::dev::hmr::{self, ReloadEvent};
use crate::dev::transform::{absolutize_relative_urls, inject_client_script, rewrite_stack};
use crate::dev::watcher::watch_tree;
use crate::dev::LiveService;
use crate::http::static_files::StaticMount;
use crate::lifecycle::startup::StartupError;
use crate::lifecycle::Shutdown;
use crate::render::{Render, RenderError, ScriptRender};

/// Settings for one site's live-reload service.
#[derive(Debug, Clone)]
pub struct DevServerOptions {
    /// Site name; namespaces the client script URL.
    pub name: String,
    /// Absolute application root.
    pub root: PathBuf,
    pub poll_interval: Duration,
    /// Notification port, 0 for ephemeral.
    pub hmr_port: u16,
    /// JavaScript runtime for entry modules.
    pub runtime: String,
    /// Log source changes at debug instead of info.
    pub quiet: bool,
}

/// Live-reload service scoped to one application root.
///
/// Created once per site at boot and shared by every request to that site.
/// Only the watcher thread mutates it (generation counter, broadcasts).
pub struct DevServer {
    name: String,
    root: PathBuf,
    runtime: String,
    hmr_addr: SocketAddr,
    generation: Arc<AtomicU64>,
    events: broadcast::Sender<ReloadEvent>,
    assets: Arc<DevAssets>,
    _watcher: Mutex<PollWatcher>,
}

/// What the request middleware serves: the client script and raw sources.
struct DevAssets {
    client_path: String,
    client_script: String,
    files: StaticMount,
}

impl DevServer {
    pub async fn start(
        options: DevServerOptions,
        shutdown: &Shutdown,
    ) -> Result<Arc<Self>, StartupError> {
        let bind_addr = SocketAddr::from(([0, 0, 0, 0], options.hmr_port));
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|source| StartupError::Bind {
                addr: bind_addr.to_string(),
                source,
            })?;
        let hmr_addr = listener.local_addr().map_err(|source| StartupError::Bind {
            addr: bind_addr.to_string(),
            source,
        })?;

        let (events, _) = broadcast::channel(16);
        let generation = Arc::new(AtomicU64::new(0));

        let watcher = {
            let events = events.clone();
            let generation = Arc::clone(&generation);
            let name = options.name.clone();
            let root = options.root.clone();
            let quiet = options.quiet;
            watch_tree(&options.root, options.poll_interval, move |paths| {
                let generation = generation.fetch_add(1, Ordering::SeqCst) + 1;
                let path = paths
                    .first()
                    .map(|p| relative_url(&root, p))
                    .unwrap_or_else(|| "/".to_string());
                if quiet {
                    tracing::debug!(
                        site = %name,
                        path = %path,
                        generation,
                        "Source change detected"
                    );
                } else {
                    tracing::info!(
                        site = %name,
                        path = %path,
                        generation,
                        "Source change detected, reloading clients"
                    );
                }
                let _ = events.send(ReloadEvent::FullReload { path, generation });
            })
            .map_err(|source| StartupError::Watch {
                path: options.root.clone(),
                source,
            })?
        };

        hmr::spawn(listener, events.clone(), shutdown.subscribe());

        let assets = Arc::new(DevAssets {
            client_path: format!("/@live-reload/{}/client.js", options.name),
            client_script: hmr::client_script(hmr_addr.port()),
            files: StaticMount::new("/", &options.root),
        });

        tracing::info!(
            site = %options.name,
            root = %options.root.display(),
            hmr_port = hmr_addr.port(),
            poll_interval_ms = options.poll_interval.as_millis() as u64,
            "Live-reload service started"
        );

        Ok(Arc::new(Self {
            name: options.name,
            root: options.root,
            runtime: options.runtime,
            hmr_addr,
            generation,
            events,
            assets,
            _watcher: Mutex::new(watcher),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Bound notification address.
    pub fn hmr_addr(&self) -> SocketAddr {
        self.hmr_addr
    }

    /// Number of source changes seen so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn client_path(&self) -> &str {
        &self.assets.client_path
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.events.subscribe()
    }
}

#[async_trait]
impl LiveService for DevServer {
    async fn transform_index_html(&self, url: &str, html: String) -> Result<String, RenderError> {
        tracing::trace!(site = %self.name, url = %url, "Transforming index.html");
        let html = absolutize_relative_urls(&html);
        Ok(inject_client_script(&html, &self.assets.client_path))
    }

    async fn load_module(&self, path: &str) -> Result<Arc<dyn Render>, RenderError> {
        let module = self.root.join(path.trim_start_matches('/'));
        match tokio::fs::metadata(&module).await {
            Ok(meta) if meta.is_file() => {}
            _ => return Err(RenderError::ModuleNotFound { path: module }),
        }
        let render = ScriptRender::new(self.runtime.clone(), module, Mode::Development)
            .with_version(self.generation());
        Ok(Arc::new(render))
    }

    fn fix_stacktrace(&self, error: RenderError) -> RenderError {
        match error {
            RenderError::Thrown { stack } => RenderError::Thrown {
                stack: rewrite_stack(&stack, &self.root),
            },
            other => other,
        }
    }

    fn install(&self, router: Router) -> Router {
        router.layer(middleware::from_fn_with_state(Arc::clone(&self.assets), serve_dev_assets))
    }
}

async fn serve_dev_assets(
    State(assets): State<Arc<DevAssets>>,
    request: Request,
    next: Next,
) -> Response {
    if request.uri().path() == assets.client_path {
        return (
            [(header::CONTENT_TYPE, "text/javascript")],
            Body::from(assets.client_script.clone()),
        )
            .into_response();
    }
    let serving = assets.files.try_serve(&request);
    match serving.await {
        Some(response) => response,
        None => next.run(request).await,
    }
}

/// `/src/App.vue` style location of `path` under `root`.
fn relative_url(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let joined = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{}", joined.trim_start_matches('/'))
}
