//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the dispatcher as the catch-all
//! - Wire up mode-specific middleware (live-reload or static + compression)
//! - Wire up common middleware (request ID, tracing)
//! - Serve on a listener until shutdown

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::dev::LiveService;
use crate::http::dispatch::{dispatch, Dispatcher};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::static_files::StaticMount;

/// Middleware installed in front of the dispatcher, per mode.
#[derive(Clone)]
pub enum TransportMiddleware {
    /// Live-reload services, in construction order; the first runs first.
    Development { services: Vec<Arc<dyn LiveService>> },
    /// Response compression plus static mounts, in order.
    Production { mounts: Vec<StaticMount> },
}

/// Build the full application router.
pub fn build_router(dispatcher: Dispatcher, middleware: &TransportMiddleware) -> Router {
    let mut router = Router::new().fallback(dispatch).with_state(dispatcher);

    // Later layers wrap earlier ones, so install in reverse.
    match middleware {
        TransportMiddleware::Development { services } => {
            for service in services.iter().rev() {
                router = service.install(router);
            }
        }
        TransportMiddleware::Production { mounts } => {
            for mount in mounts.iter().rev() {
                router = mount.clone().install(router);
            }
            router = router.layer(CompressionLayer::new());
        }
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id_layer())
        .layer(set_request_id_layer())
}

/// HTTP server for the dispatcher.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
