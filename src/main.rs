//! SSR dispatcher binary.
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────┐
//!   GET /test/...    │  request id → trace → [dev: live-reload A, B]    │
//!   GET /test2/...   │                       [prod: gzip, static mounts] │
//!  ─────────────────▶│                  │                                │
//!                    │                  ▼                                │
//!                    │             dispatcher ── miss ──▶ 404 (empty)    │
//!                    │                  │                                │
//!                    │      site A ◀────┴────▶ site B                    │
//!                    │  template + render(url, manifest) → compose       │
//!                    └──────────────────────────────────────────────────┘
//! ```
//!
//! Starts with no arguments. `NODE_ENV=production` selects production mode;
//! `NODE_ENV=test` or `SSR_TEST_BUILD` builds the app without binding.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use ssr_dispatcher::config::loader::load_layered;
use ssr_dispatcher::lifecycle::signals::shutdown_signal;
use ssr_dispatcher::observability::{logging, metrics};
use ssr_dispatcher::{initialize, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "ssr-dispatcher")]
#[command(about = "Server-side rendering dispatcher for two front-end sites", long_about = None)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long, env = "SSR_CONFIG")]
    config: Option<PathBuf>,

    /// Project root containing the site directories and `dist/`.
    #[arg(short, long)]
    root: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = load_layered(cli.config.as_deref())?;
    if let Some(root) = cli.root {
        config.root = root;
    }

    logging::init(&config)?;

    tracing::info!(
        mode = %config.mode,
        test_build = config.test_build,
        "ssr-dispatcher v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let app = initialize(&config, &shutdown).await?;

    if config.test_build {
        tracing::info!("Test build: app constructed, listener not bound");
        shutdown.trigger();
        return Ok(());
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let port = listener.local_addr()?.port();
    tracing::info!("http://localhost:{}", port);

    let signals = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signals.trigger();
    });

    HttpServer::new(app.into_router())
        .run(listener, shutdown.subscribe())
        .await?;

    shutdown.trigger();
    tracing::info!("Shutdown complete");
    Ok(())
}
