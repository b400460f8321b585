//! Bubble Arena - game server with the HTTP identity endpoints.

use axum::{
    Json, Router,
    extract::{
        ConnectInfo, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt, future};
use serde_json::json;
use server::identity::{IdentityProvider, MemoryIdentity};
use server::{ConnectionLimiter, Frame, SharedGame};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod auth_routes;

#[derive(Clone)]
struct AppState {
    game: SharedGame,
    limiter: Arc<RwLock<ConnectionLimiter>>,
    identity: Arc<dyn IdentityProvider>,
    token_ttl_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,server=debug")),
        )
        .init();

    info!("Bubble Arena v{}", env!("CARGO_PKG_VERSION"));

    let config = server::Config::load()?;
    info!("Loaded configuration");
    info!("  Port: {}", config.server.port);
    info!("  Arena: {}x{}", config.arena.width, config.arena.height);
    info!(
        "  Sizes: {} -> {} (+{} per point)",
        config.arena.min_size, config.arena.max_size, config.arena.growth_rate
    );

    let state = AppState {
        game: server::GameState::new(&config).shared(),
        limiter: Arc::new(RwLock::new(ConnectionLimiter::new(
            config.server.max_connections,
            config.server.ip_limit,
        ))),
        identity: Arc::new(MemoryIdentity::new(config.identity.clone())),
        token_ttl_secs: config.identity.token_ttl_secs,
    };

    let app = Router::new()
        .route("/game", get(websocket_handler))
        .route("/health", get(health))
        .merge(auth_routes::routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Game WebSocket endpoint: ws://{}/game", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let game = state.game.lock().await;
    Json(json!({
        "status": "ok",
        "players": game.registry.len(),
        "connections": game.clients.len(),
    }))
}

/// Upgrade to a game session, subject to the connection limits.
async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    if !state.limiter.write().await.try_add(addr.ip()) {
        warn!("Connection rejected (limit reached): {}", addr);
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let limiter = Arc::clone(&state.limiter);
    ws.on_failed_upgrade(move |e| {
        warn!("WebSocket upgrade from {} failed: {}", addr, e);
        tokio::spawn(async move { limiter.write().await.remove(addr.ip()) });
    })
    .on_upgrade(move |socket| handle_websocket(socket, addr, state))
}

async fn handle_websocket(socket: WebSocket, addr: SocketAddr, state: AppState) {
    info!("New game connection from {}", addr);

    let (write, read) = socket.split();
    let inbound = read.map(|msg| match msg {
        Ok(Message::Binary(data)) => Frame::Binary(data),
        Ok(Message::Close(_)) => Frame::Close,
        Ok(_) => Frame::Ignored,
        Err(e) => Frame::Error(e.to_string()),
    });
    let outbound = write.with(|packet: Bytes| future::ready(Ok::<_, axum::Error>(Message::Binary(packet))));

    let result = server::drive_session(inbound, outbound, addr, Arc::clone(&state.game)).await;

    state.limiter.write().await.remove(addr.ip());
    if let Err(e) = result {
        error!("Connection error from {}: {}", addr, e);
    }
}
