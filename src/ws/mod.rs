pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::SplitSink, stream::StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use ulid::Ulid;

use crate::protocol::{Ack, ClientMessage, ServerMessage};
use crate::rooms::{ConnectionId, PeerSender};
use crate::state::AppState;

/// Server-side handle for one client link.
///
/// `current_room` is read and written only by the connection's own task, so
/// membership state needs no locking of its own; the registry is the single
/// shared resource.
pub struct Connection {
    pub id: ConnectionId,
    /// Outbound channel the relay engine delivers peer events through.
    pub sender: PeerSender,
    pub current_room: Option<String>,
}

impl Connection {
    pub fn new(sender: PeerSender) -> Self {
        Self {
            id: Ulid::new(),
            sender,
            current_room: None,
        }
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection
///
/// Inbound events are processed strictly in arrival order; a relay from a
/// peer can interleave between events but never during one, so join/leave
/// transitions are not reentrant.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut conn = Connection::new(tx);

    tracing::info!(conn = %conn.id, "websocket connected");

    loop {
        tokio::select! {
            // Events relayed from room peers
            relayed = rx.recv() => {
                match relayed {
                    Some(msg) => {
                        if send_json(&mut sink, &msg).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            // Client frames
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(msg) => {
                                if let Some(reply) =
                                    handlers::handle_message(msg, &mut conn, &state).await
                                {
                                    if send_json(&mut sink, &reply).await.is_err() {
                                        break;
                                    }
                                }
                            }
                            Err(e) => {
                                tracing::debug!(conn = %conn.id, "unparseable frame: {}", e);
                                let reply = ServerMessage::Ack(Ack::error("Invalid message format"));
                                if send_json(&mut sink, &reply).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sink.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(conn = %conn.id, "websocket error: {}", e);
                        break;
                    }
                }
            }
        }
    }

    // Implicit leave: the slot must free up even on abrupt disconnects.
    if let Some(room) = conn.current_room.take() {
        state.rooms.release(conn.id, &room).await;
        tracing::debug!(conn = %conn.id, room = %room, "released on disconnect");
    }

    tracing::info!(conn = %conn.id, "websocket disconnected");
}

async fn send_json(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    match serde_json::to_string(msg) {
        Ok(json) => sink.send(Message::Text(json.into())).await,
        Err(e) => {
            tracing::error!("failed to encode server message: {}", e);
            Ok(())
        }
    }
}
