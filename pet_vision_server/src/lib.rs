pub mod hub;
pub mod protocol;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use pet_vision::dashboard::Dashboard;
use pet_vision::core_modules::history::DEFAULT_HISTORY_CAPACITY;
use pet_vision::{ActivitySnapshot, SourceId};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub use hub::{ActivityHub, HubError, HubHandle};
pub use protocol::{ClientMessage, ServerMessage};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub history_capacity: usize,
    /// Snapshots buffered per dashboard listener before it starts skipping.
    pub listener_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3001".to_string(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            listener_capacity: 32,
        }
    }
}

impl ServerConfig {
    /// Reads `PV_BIND`, `PV_HISTORY_CAPACITY` and `PV_LISTENER_CAPACITY`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parse = |name: &str, default: usize| {
            lookup(name)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default)
        };
        Self {
            bind_addr: lookup("PV_BIND")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.bind_addr),
            history_capacity: parse("PV_HISTORY_CAPACITY", defaults.history_capacity),
            listener_capacity: parse("PV_LISTENER_CAPACITY", defaults.listener_capacity),
        }
    }
}

/// Installs the fmt subscriber, honouring `RUST_LOG` over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

pub fn router(hub: HubHandle) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/healthz", get(|| async { "ok" }))
        .route("/api/activities", get(activities_handler))
        .route("/api/stats", get(stats_handler))
        .with_state(hub)
}

/// Binds `cfg.bind_addr` and serves the router on a background task.
pub async fn start_server(hub: HubHandle, cfg: ServerConfig) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "activity server listening");
    let app = router(hub);
    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "activity server stopped");
        }
    });
    Ok(server)
}

async fn activities_handler(State(hub): State<HubHandle>) -> Result<Json<ActivitySnapshot>, StatusCode> {
    hub.snapshot()
        .await
        .map(Json)
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)
}

async fn stats_handler(State(hub): State<HubHandle>) -> impl IntoResponse {
    let snapshot = match hub.snapshot().await {
        Ok(snapshot) => snapshot,
        Err(_) => return StatusCode::SERVICE_UNAVAILABLE.into_response(),
    };
    let mut dashboard = Dashboard::new();
    dashboard.apply(snapshot);
    Json(dashboard.statistics()).into_response()
}

async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<HubHandle>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_conn(socket, hub))
}

/// Every connection is a dashboard listener and, once it sends `pet-activity`,
/// a detection source.
async fn ws_conn(socket: WebSocket, hub: HubHandle) {
    let source_id = hub.register_source();
    info!(source_id, "client connected");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut updates = hub.subscribe();
    let (unicast_tx, mut unicast_rx) = mpsc::unbounded_channel::<ActivitySnapshot>();

    let mut send_task = tokio::spawn(async move {
        loop {
            let snapshot = tokio::select! {
                update = updates.recv() => match update {
                    Ok(snapshot) => snapshot,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(source_id, skipped, "listener lagged behind");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
                direct = unicast_rx.recv() => match direct {
                    Some(snapshot) => snapshot,
                    None => break,
                },
            };
            let text = match ServerMessage::PetActivitiesUpdate(snapshot).encode() {
                Ok(text) => text,
                Err(e) => {
                    warn!(source_id, error = %e, "failed to encode update");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let recv_hub = hub.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = ws_rx.next().await {
            match message {
                Message::Text(text) => {
                    if handle_client_message(&recv_hub, source_id, &text, &unicast_tx).await.is_err() {
                        break;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    let _ = hub.disconnect(source_id);
    info!(source_id, "client disconnected");
}

async fn handle_client_message(
    hub: &HubHandle,
    source_id: SourceId,
    text: &str,
    unicast_tx: &mpsc::UnboundedSender<ActivitySnapshot>,
) -> Result<(), HubError> {
    match ClientMessage::decode(text) {
        Ok(ClientMessage::PetActivity(report)) => hub.ingest(source_id, report),
        Ok(ClientMessage::RequestPetActivities) => {
            let snapshot = hub.snapshot().await?;
            let _ = unicast_tx.send(snapshot);
            Ok(())
        }
        Err(e) => {
            warn!(source_id, error = %e, "ignoring malformed message");
            Ok(())
        }
    }
}
