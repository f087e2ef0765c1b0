//! Startup orchestration: the mode controller.
//!
//! Picks the template/render strategies for the configured mode, builds both
//! application contexts and the router. Nothing here runs per request.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use thiserror::Error;

use crate::config::loader::ConfigError;
use crate::config::validation::validate_config;
use crate::config::{Mode, ServerConfig, SiteConfig};
use crate::dev::{DevServer, DevServerOptions, LiveService};
use crate::http::{build_router, Dispatcher, StaticMount, TransportMiddleware};
use crate::lifecycle::Shutdown;
use crate::render::manifest::ManifestError;
use crate::render::{
    CachedTemplate, DevModule, DevTemplate, Manifest, PrecompiledModule, Render, RenderError,
    RenderSource, ScriptWorker, TemplateSource,
};
use crate::routing::{ApplicationContext, SiteRouter};

/// Fatal boot-time failures. The listener is never bound after one.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot resolve project root {}: {source}", path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("missing build artifact {}: {source}", path.display())]
    MissingArtifact {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid manifest {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to load server entry {}: {source}", path.display())]
    Entry {
        path: PathBuf,
        #[source]
        source: RenderError,
    },

    #[error("failed to watch {}: {source}", path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
}

/// The serving application, ready to be bound or driven in-process.
pub struct SsrApp {
    mode: Mode,
    dispatcher: Dispatcher,
    dev_servers: Vec<Arc<DevServer>>,
    router: Router,
}

impl SsrApp {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Live-reload services, site order. Empty in production.
    pub fn dev_servers(&self) -> &[Arc<DevServer>] {
        &self.dev_servers
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

/// Build both application contexts and the router for `config.mode`.
pub async fn initialize(
    config: &ServerConfig,
    shutdown: &Shutdown,
) -> Result<SsrApp, StartupError> {
    validate_config(config)
        .map_err(|errors| StartupError::Config(ConfigError::Validation(errors)))?;
    let root = absolute_root(&config.root)?;
    let [a, b] = [&config.sites[0], &config.sites[1]];

    tracing::info!(mode = %config.mode, root = %root.display(), "Initializing sites");

    let app = match config.mode {
        Mode::Development => initialize_development(config, &root, [a, b], shutdown).await?,
        Mode::Production => initialize_production(config, &root, [a, b]).await?,
    };

    for site in app.dispatcher.sites().sites() {
        tracing::info!(
            site = %site.name(),
            prefix = %site.prefix(),
            root = %site.root().display(),
            "Site ready"
        );
    }
    Ok(app)
}

async fn initialize_development(
    config: &ServerConfig,
    root: &Path,
    [a, b]: [&SiteConfig; 2],
    shutdown: &Shutdown,
) -> Result<SsrApp, StartupError> {
    let (server_a, context_a) = start_dev_site(config, root, a, 0, shutdown).await?;
    let (server_b, context_b) = start_dev_site(config, root, b, 1, shutdown).await?;

    let services = vec![
        Arc::clone(&server_a) as Arc<dyn LiveService>,
        Arc::clone(&server_b) as Arc<dyn LiveService>,
    ];
    let dispatcher = Dispatcher::new(SiteRouter::new(context_a, context_b), Manifest::empty());
    let router = build_router(dispatcher.clone(), &TransportMiddleware::Development { services });

    Ok(SsrApp {
        mode: Mode::Development,
        dispatcher,
        dev_servers: vec![server_a, server_b],
        router,
    })
}

/// Start one site's live-reload service and wire its context to it.
async fn start_dev_site(
    config: &ServerConfig,
    root: &Path,
    site: &SiteConfig,
    index: u16,
    shutdown: &Shutdown,
) -> Result<(Arc<DevServer>, ApplicationContext), StartupError> {
    let site_root = root.join(&site.dir);
    let hmr_port = match config.dev.hmr_port {
        0 => 0,
        base => base.saturating_add(index),
    };

    let server = DevServer::start(
        DevServerOptions {
            name: site.name.clone(),
            root: site_root.clone(),
            poll_interval: Duration::from_millis(config.dev.poll_interval_ms),
            hmr_port,
            runtime: config.runtime.program.clone(),
            quiet: config.test_build,
        },
        shutdown,
    )
    .await?;

    let live: Arc<dyn LiveService> = server.clone();
    let template: Arc<dyn TemplateSource> =
        Arc::new(DevTemplate::new(site_root.join(&config.dev.template), Arc::clone(&live)));
    let module: Arc<dyn RenderSource> =
        Arc::new(DevModule::new(config.dev.entry.clone(), Arc::clone(&live)));
    let context = ApplicationContext::new(
        site.name.clone(),
        site.prefix.clone(),
        site_root,
        template,
        module,
    )
    .with_live_service(live);

    Ok((server, context))
}

async fn initialize_production(
    config: &ServerConfig,
    root: &Path,
    sites: [&SiteConfig; 2],
) -> Result<SsrApp, StartupError> {
    let prod = &config.production;
    let client_dir = root.join(&prod.client_dir);

    let template_path = client_dir.join(&prod.template);
    let template = CachedTemplate::read(&template_path)
        .await
        .map_err(|source| StartupError::MissingArtifact {
            path: template_path.clone(),
            source,
        })?;

    let manifest_path = client_dir.join(&prod.manifest);
    let manifest = Manifest::load(&manifest_path).await.map_err(|e| match e {
        ManifestError::Io(source) => StartupError::MissingArtifact {
            path: manifest_path.clone(),
            source,
        },
        ManifestError::Parse(source) => StartupError::Manifest {
            path: manifest_path.clone(),
            source,
        },
    })?;

    let entry = root.join(&prod.server_entry);
    require_file(&entry).await?;
    let worker = ScriptWorker::spawn(config.runtime.program.clone(), &entry, Mode::Production)
        .await
        .map_err(|source| StartupError::Entry {
            path: entry.clone(),
            source,
        })?;

    tracing::info!(
        template = %template_path.display(),
        manifest_entries = manifest.len(),
        server_entry = %entry.display(),
        "Production artifacts loaded"
    );

    // Both sites share one shell and one imported server entry.
    let template: Arc<dyn TemplateSource> = Arc::new(template);
    let render: Arc<dyn Render> = Arc::new(worker);
    let module: Arc<dyn RenderSource> = Arc::new(PrecompiledModule::new(render));

    let mounts = sites
        .iter()
        .map(|site| StaticMount::new(site.prefix.clone(), &client_dir))
        .collect();
    let [a, b] = sites.map(|site| {
        ApplicationContext::new(
            site.name.clone(),
            site.prefix.clone(),
            root.join(&site.dir),
            Arc::clone(&template),
            Arc::clone(&module),
        )
    });

    let dispatcher = Dispatcher::new(SiteRouter::new(a, b), manifest);
    let router = build_router(dispatcher.clone(), &TransportMiddleware::Production { mounts });

    Ok(SsrApp {
        mode: Mode::Production,
        dispatcher,
        dev_servers: Vec::new(),
        router,
    })
}

async fn require_file(path: &Path) -> Result<(), StartupError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|source| StartupError::MissingArtifact {
            path: path.to_path_buf(),
            source,
        })?;
    if meta.is_file() {
        Ok(())
    } else {
        Err(StartupError::MissingArtifact {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "not a file"),
        })
    }
}

fn absolute_root(root: &Path) -> Result<PathBuf, StartupError> {
    if root.is_absolute() {
        return Ok(root.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(root))
        .map_err(|source| StartupError::Root {
            path: root.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_root() {
        assert_eq!(absolute_root(Path::new("/srv/app")).unwrap(), PathBuf::from("/srv/app"));
        assert!(absolute_root(Path::new("app")).unwrap().is_absolute());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_io() {
        let mut config = ServerConfig::default();
        config.sites.pop();
        let err = initialize(&config, &Shutdown::new()).await.err().unwrap();
        assert!(matches!(err, StartupError::Config(ConfigError::Validation(_))));
    }
}
