//! InkRoom WebSocket Relay Server
//!
//! Broadcasts drawing events between every connected client. The server
//! keeps no history: a client only sees what is drawn after it connects.
//!
//! ## Protocol
//!
//! ```json
//! { "type": "draw", "data": <anything> }
//! ```
//!
//! Draw frames are forwarded verbatim to every other client; `data` is never
//! inspected. Anything else gets `{ "type": "error", "message": "..." }`
//! back.

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use clap::Parser;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::{
    net::SocketAddr,
    sync::Arc,
    time::Instant,
};
use tokio::{net::TcpListener, sync::broadcast};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Relay configuration, from flags or `INKROOM_*` environment variables.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "inkroom-server")]
#[command(version, about = "Drawing relay for InkRoom whiteboards")]
pub struct RelayConfig {
    /// Address to bind
    #[arg(long, env = "INKROOM_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, short = 'p', env = "INKROOM_PORT", default_value_t = 4000)]
    pub port: u16,

    /// Messages buffered per client before a slow client starts skipping
    #[arg(long, env = "INKROOM_CHANNEL_CAPACITY", default_value_t = 256)]
    pub channel_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            channel_capacity: 256,
        }
    }
}

impl RelayConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A frame sent by a client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Draw { data: serde_json::Value },
}

/// A frame the server produces itself
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Error { message: String },
}

/// A connected client
#[derive(Debug, Clone, Copy)]
pub struct Peer {
    pub connected_at: Instant,
}

/// Shared application state
pub struct AppState {
    /// Draw frames as `(sender peer id, raw frame)`.
    tx: broadcast::Sender<(String, String)>,
    peers: DashMap<String, Peer>,
}

impl AppState {
    pub fn new(channel_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            tx,
            peers: DashMap::new(),
        }
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    fn broadcast(&self, from: &str, frame: String) {
        // No receivers just means nobody else is connected.
        let _ = self.tx.send((from.to_string(), frame));
    }
}

/// Build the HTTP router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on an already bound listener.
pub async fn serve_on(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    axum::serve(listener, router(state)).await
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: RelayConfig) -> std::io::Result<()> {
    let listener = TcpListener::bind(config.bind_addr()).await?;
    let addr: SocketAddr = listener.local_addr()?;
    info!("InkRoom relay server listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);
    serve_on(listener, Arc::new(AppState::new(config.channel_capacity))).await
}

/// Index page
async fn index() -> &'static str {
    "InkRoom Relay Server - Connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    // Subscribe before the handshake completes so the client receives
    // everything sent after it sees the upgrade.
    let rx = state.tx.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, state, rx))
}

fn error_frame(message: String) -> Message {
    let json = serde_json::to_string(&ServerMessage::Error { message })
        .unwrap_or_else(|_| r#"{"type":"error","message":"internal error"}"#.to_string());
    Message::Text(json.into())
}

/// Handle a WebSocket connection
async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    mut rx: broadcast::Receiver<(String, String)>,
) {
    let peer_id = Uuid::new_v4().to_string();
    state.peers.insert(
        peer_id.clone(),
        Peer {
            connected_at: Instant::now(),
        },
    );
    info!("Client connected: {} ({} online)", peer_id, state.peer_count());

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(text.as_str()) {
                            Ok(ClientMessage::Draw { .. }) => {
                                debug!("Draw from {} ({} bytes)", peer_id, text.as_str().len());
                                state.broadcast(&peer_id, text.as_str().to_owned());
                            }
                            Err(e) => {
                                warn!("Invalid message from {}: {}", peer_id, e);
                                if sender.send(error_frame(format!("Invalid message: {}", e))).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        warn!("Binary frame from {} rejected", peer_id);
                        if sender.send(error_frame("Binary frames are not supported".to_string())).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // Ping/pong
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", peer_id, e);
                        break;
                    }
                }
            }

            msg = rx.recv() => {
                match msg {
                    Ok((from, frame)) => {
                        // Never echo back to the sender.
                        if from != peer_id && sender.send(Message::Text(frame.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Client {} lagged, skipped {} messages", peer_id, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    if let Some((_, peer)) = state.peers.remove(&peer_id) {
        info!(
            "Client disconnected: {} after {:?} ({} online)",
            peer_id,
            peer.connected_at.elapsed(),
            state.peer_count()
        );
    }
}
