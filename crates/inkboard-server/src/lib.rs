//! Inkboard WebSocket Relay
//!
//! Relays whole-canvas snapshots between clients editing the same canvas.
//! The relay keeps no canvas state of its own; it only tracks which sockets
//! are in which rooms.
//!
//! ## Protocol
//!
//! Messages are JSON text frames:
//! ```json
//! { "type": "joinCanvas", "canvasId": "c1" }
//! { "type": "leaveCanvas", "canvasId": "c1" }
//! { "type": "canvasUpdate", "canvasId": "c1", "elements": [ ... ] }
//! ```
//! Updates are forwarded to every other member of the room. A socket may be
//! in several rooms at once.

pub mod config;
pub mod rooms;

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use inkboard_core::sync::{ClientMessage, ServerMessage};
use rooms::{FrameSender, RoomFrame, RoomTable};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use config::RelayConfig;

/// Shared relay state.
#[derive(Default)]
pub struct AppState {
    pub rooms: RoomTable,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Build the relay's HTTP router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `config.addr` and serve until the process exits.
pub async fn serve(config: RelayConfig) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    let addr = listener.local_addr()?;
    info!("Inkboard relay listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);
    axum::serve(listener, router(Arc::new(AppState::new()))).await
}

/// Index page
async fn index() -> &'static str {
    "Inkboard Relay Server - Connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Per-socket room bookkeeping.
struct Connection {
    peer_id: String,
    state: Arc<AppState>,
    tx: FrameSender,
    /// Joined rooms and the membership generation each was joined under.
    joined: HashMap<String, u64>,
    next_generation: u64,
}

impl Connection {
    fn new(state: Arc<AppState>, tx: FrameSender) -> Self {
        Self {
            peer_id: Uuid::new_v4().to_string(),
            state,
            tx,
            joined: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Apply one client frame. Returns the direct reply, if any.
    fn handle_text(&mut self, text: &str) -> Option<ServerMessage> {
        let msg = match serde_json::from_str::<ClientMessage>(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Invalid message from {}: {}", self.peer_id, e);
                return Some(ServerMessage::Error {
                    message: format!("Invalid message: {}", e),
                });
            }
        };

        match msg {
            ClientMessage::JoinCanvas { canvas_id } => {
                let generation = match self.joined.get(&canvas_id) {
                    Some(generation) => *generation,
                    None => {
                        self.next_generation += 1;
                        self.next_generation
                    }
                };
                let peer_count =
                    self.state
                        .rooms
                        .join(&canvas_id, &self.peer_id, self.tx.clone(), generation);
                self.joined.insert(canvas_id.clone(), generation);
                info!("Peer {} joined canvas {} ({} peers)", self.peer_id, canvas_id, peer_count);
                Some(ServerMessage::Joined {
                    canvas_id,
                    peer_count,
                })
            }
            ClientMessage::LeaveCanvas { canvas_id } => {
                if self.joined.remove(&canvas_id).is_some() {
                    self.state.rooms.leave(&canvas_id, &self.peer_id);
                    info!("Peer {} left canvas {}", self.peer_id, canvas_id);
                }
                Some(ServerMessage::Left { canvas_id })
            }
            ClientMessage::CanvasUpdate {
                canvas_id,
                elements,
            } => {
                if !self.joined.contains_key(&canvas_id) {
                    return Some(ServerMessage::Error {
                        message: format!("Not a member of canvas {}", canvas_id),
                    });
                }
                let update = ServerMessage::CanvasUpdate {
                    canvas_id: canvas_id.clone(),
                    elements,
                };
                match self.state.rooms.broadcast(&canvas_id, &self.peer_id, &update) {
                    Some(peers) => {
                        debug!("Relayed update for {} to {} peers", canvas_id, peers);
                        None
                    }
                    None => Some(ServerMessage::Error {
                        message: format!("Not a member of canvas {}", canvas_id),
                    }),
                }
            }
        }
    }

    /// Whether a queued frame still belongs to a live membership.
    fn accepts(&self, frame: &RoomFrame) -> bool {
        self.joined.get(&frame.canvas_id) == Some(&frame.generation)
    }

    fn close(&mut self) {
        self.state.rooms.leave_all(self.joined.keys(), &self.peer_id);
        self.joined.clear();
    }
}

fn encode(msg: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            warn!("Failed to encode {:?}: {}", msg, e);
            None
        }
    }
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<RoomFrame>();
    let mut conn = Connection::new(state, frame_tx);
    info!("New connection: {}", conn.peer_id);

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            msg = receiver.next() => {
                let reply = match msg {
                    Some(Ok(Message::Text(text))) => conn.handle_text(text.as_str()),
                    Some(Ok(Message::Binary(_))) => Some(ServerMessage::Error {
                        message: "Binary frames are not supported".to_string(),
                    }),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => None,
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", conn.peer_id, e);
                        break;
                    }
                };
                if let Some(out) = reply.as_ref().and_then(encode) {
                    if sender.send(out).await.is_err() {
                        break;
                    }
                }
            }

            Some(frame) = frame_rx.recv() => {
                if !conn.accepts(&frame) {
                    debug!("Dropping stale frame for {} on {}", frame.canvas_id, conn.peer_id);
                    continue;
                }
                if let Some(out) = encode(&frame.message) {
                    if sender.send(out).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    conn.close();
    info!("Connection closed: {}", conn.peer_id);
}
