//! HTTP server
//!
//! Routes:
//! - `/rec` - consumer WebSocket
//! - `/send` - producer WebSocket
//! - `/api/stats` - relay counters as JSON
//! - `/static/*` - static files, when a directory is configured

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::Level;

use crate::fanout::Relay;
use crate::ws::{run_consumer, run_producer};
use crate::RelayError;

/// Relay statistics DTO
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsDto {
    pub active_consumers: usize,
    pub queue_depth: usize,
    pub min_level: i64,
    pub received: u64,
    pub queued: u64,
    pub control: u64,
    pub filtered: u64,
    pub rejected: u64,
    pub broadcasts: u64,
    pub deliveries: u64,
    pub pruned: u64,
    pub broadcast_rate: f64,
    pub last_broadcast_time: u64,
    pub uptime_seconds: u64,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
    pub outbox_capacity: usize,
}

/// Build the router
pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
    let mut app = Router::new()
        .route("/rec", get(consumer_ws))
        .route("/send", get(producer_ws))
        .route("/api/stats", get(get_stats));

    if let Some(dir) = static_dir {
        app = app.nest_service("/static", ServeDir::new(dir));
    }

    app.layer(CorsLayer::permissive()).with_state(state)
}

/// Bind the listening socket
///
/// Failure here is fatal for the process.
pub async fn bind(address: impl ToSocketAddrs) -> Result<TcpListener, RelayError> {
    let listener = TcpListener::bind(address).await?;
    crate::log_api!(Level::INFO, addr = ?listener.local_addr().ok(), "Relay listening");
    Ok(listener)
}

/// Serve until the listener fails
pub async fn serve(listener: TcpListener, app: Router) -> Result<(), RelayError> {
    axum::serve(listener, app).await?;
    Ok(())
}

/// Handler for /rec
async fn consumer_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_failed_upgrade(|e| {
        crate::log_api!(Level::WARN, error = %e, "Consumer upgrade failed");
    })
    .on_upgrade(move |socket| run_consumer(socket, state.relay, state.outbox_capacity))
}

/// Handler for /send
async fn producer_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_failed_upgrade(|e| {
        crate::log_api!(Level::WARN, error = %e, "Producer upgrade failed");
    })
    .on_upgrade(move |socket| run_producer(socket, state.relay))
}

/// Handler for /api/stats
async fn get_stats(State(state): State<AppState>) -> Json<StatsDto> {
    let relay = &state.relay;
    let snapshot = relay.metrics().snapshot();

    Json(StatsDto {
        active_consumers: relay.registry().len(),
        queue_depth: relay.queue_depth(),
        min_level: relay.filter().threshold().as_raw(),
        received: snapshot.received,
        queued: snapshot.queued,
        control: snapshot.control,
        filtered: snapshot.filtered,
        rejected: snapshot.rejected,
        broadcasts: snapshot.broadcasts,
        deliveries: snapshot.deliveries,
        pruned: snapshot.pruned,
        broadcast_rate: snapshot.broadcast_rate,
        last_broadcast_time: snapshot.last_broadcast_time,
        uptime_seconds: snapshot.uptime_seconds,
    })
}
