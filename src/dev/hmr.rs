//! Live-reload notification transport.
//!
//! A dedicated WebSocket listener per site. Every source change is pushed to
//! connected browsers as a JSON event; the injected client script reloads
//! the page on `full-reload`.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast::{self, error::RecvError};

/// Event pushed to browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ReloadEvent {
    Connected,
    FullReload { path: String, generation: u64 },
}

/// Browser-side client, bound to the notification port.
pub fn client_script(port: u16) -> String {
    format!(
        r#"const socket = new WebSocket(`ws://${{location.hostname}}:{port}/`);
socket.addEventListener('message', (event) => {{
  const msg = JSON.parse(event.data);
  if (msg.type === 'full-reload') location.reload();
}});
socket.addEventListener('close', () => console.warn('[live-reload] connection lost'));
"#
    )
}

/// Serve the notification endpoint until `shutdown` fires.
pub fn spawn(
    listener: TcpListener,
    events: broadcast::Sender<ReloadEvent>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let app = Router::new().route("/", get(upgrade)).with_state(events);
    tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await;
        if let Err(e) = result {
            tracing::error!(error = %e, "Live-reload transport failed");
        }
    });
}

async fn upgrade(
    ws: WebSocketUpgrade,
    State(events): State<broadcast::Sender<ReloadEvent>>,
) -> Response {
    let rx = events.subscribe();
    ws.on_upgrade(move |socket| forward(socket, rx))
}

async fn forward(mut socket: WebSocket, mut rx: broadcast::Receiver<ReloadEvent>) {
    if send(&mut socket, &ReloadEvent::Connected).await.is_err() {
        return;
    }
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    if send(&mut socket, &event).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Live-reload client lagged");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

async fn send(socket: &mut WebSocket, event: &ReloadEvent) -> Result<(), axum::Error> {
    let json = serde_json::to_string(event).map_err(axum::Error::new)?;
    socket.send(Message::Text(json.into())).await
}
