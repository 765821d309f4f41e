//! WebSocket event dispatch
//!
//! Request-style events (`join-room`, `send-message`, `leave-room`,
//! `set-text`) return an acknowledgement the session loop sends back on the
//! same socket. Lifecycle signals (`start`, `end`, `loading`,
//! `done-loading`, relayed `text-update`) are fire-and-forget: they produce
//! no acknowledgement and are silently dropped for connections that have not
//! joined a room.

use serde_json::Value;
use std::sync::Arc;

use crate::protocol::{Ack, ClientMessage, ServerMessage};
use crate::relay;
use crate::rooms::{RoomError, ROOM_CAPACITY, ROOM_ID_LEN};
use crate::state::AppState;
use crate::ws::Connection;

/// Handle one client event and return the optional acknowledgement
pub async fn handle_message(
    msg: ClientMessage,
    conn: &mut Connection,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::JoinRoom { room } => Some(handle_join(conn, state, room).await),

        ClientMessage::SendMessage { message } => {
            Some(handle_send_message(conn, state, message).await)
        }

        ClientMessage::LeaveRoom => Some(handle_leave(conn, state).await),

        ClientMessage::SetText => Some(handle_set_text(conn, state).await),

        ClientMessage::Start => {
            signal(conn, state, ServerMessage::Start).await;
            None
        }

        ClientMessage::End => {
            signal(conn, state, ServerMessage::End).await;
            None
        }

        ClientMessage::TextUpdate { payload } => {
            signal(conn, state, ServerMessage::TextUpdate { payload }).await;
            None
        }

        ClientMessage::Loading => {
            signal(conn, state, ServerMessage::Loading).await;
            None
        }

        ClientMessage::DoneLoading => {
            signal(conn, state, ServerMessage::DoneLoading).await;
            None
        }
    }
}

async fn handle_join(conn: &mut Connection, state: &Arc<AppState>, room: String) -> ServerMessage {
    if room.len() != ROOM_ID_LEN {
        return ServerMessage::Ack(Ack::error("Name length should be 4"));
    }
    // Pre-check so a full target room leaves the current membership intact.
    if state.rooms.member_count(&room).await >= ROOM_CAPACITY {
        return ServerMessage::Ack(Ack::error("Room is full"));
    }

    if let Some(old) = conn.current_room.take() {
        state.rooms.release(conn.id, &old).await;
        tracing::debug!(conn = %conn.id, room = %old, "left room");
    }

    match state.rooms.admit(conn.id, conn.sender.clone(), &room).await {
        Ok(()) => {
            tracing::debug!(conn = %conn.id, room = %room, "joined room");
            conn.current_room = Some(room);
            ServerMessage::Ack(Ack::success("Successfully joined room"))
        }
        // The slot was taken between the pre-check and the admit.
        Err(RoomError::RoomFull) => ServerMessage::Ack(Ack::error("Room is full")),
        Err(RoomError::InvalidId) => ServerMessage::Ack(Ack::error("Name length should be 4")),
    }
}

async fn handle_send_message(
    conn: &Connection,
    state: &Arc<AppState>,
    message: Value,
) -> ServerMessage {
    let room = match conn.current_room.as_deref() {
        Some(room) if !is_empty_payload(&message) => room,
        _ => return ServerMessage::Ack(Ack::error("Must join a room and provide a message")),
    };

    relay::to_room_except(
        &state.rooms,
        room,
        conn.id,
        ServerMessage::ReceiveMessage { message },
    )
    .await;
    ServerMessage::Ack(Ack::success("Message sent successfully"))
}

async fn handle_leave(conn: &mut Connection, state: &Arc<AppState>) -> ServerMessage {
    if let Some(room) = conn.current_room.take() {
        state.rooms.release(conn.id, &room).await;
        tracing::debug!(conn = %conn.id, room = %room, "left room");
    }
    // Acknowledged even when no room was joined; the client is blocked on
    // the callback either way, and a repeat leave stays harmless.
    ServerMessage::Ack(Ack::success("Successfully left room"))
}

async fn handle_set_text(conn: &Connection, state: &Arc<AppState>) -> ServerMessage {
    let Some(room) = conn.current_room.as_deref() else {
        return ServerMessage::Ack(Ack::error("Must join a room"));
    };

    let Some(gateway) = state.gateway.as_ref() else {
        tracing::warn!(conn = %conn.id, "set-text requested but no text provider is configured");
        return ServerMessage::Ack(Ack::error("Failed to fetch text"));
    };

    match gateway.fetch_passage().await {
        Ok(text) => {
            // The requester receives the passage twice: once in the room-wide
            // text-update and once in its acknowledgement.
            let payload = serde_json::json!({
                "text": &text,
                "success": "Text set successfully",
            });
            relay::to_room(&state.rooms, room, ServerMessage::TextUpdate { payload }).await;
            tracing::debug!(conn = %conn.id, room = %room, "text distributed");
            ServerMessage::Ack(Ack::success("Text set successfully").with_text(text))
        }
        Err(e) => {
            tracing::error!(conn = %conn.id, "text fetch failed: {}", e);
            ServerMessage::Ack(Ack::error("Failed to fetch text"))
        }
    }
}

/// Relay a fire-and-forget event to the other room occupant(s). No-op for
/// unjoined connections.
async fn signal(conn: &Connection, state: &Arc<AppState>, msg: ServerMessage) {
    if let Some(room) = conn.current_room.as_deref() {
        relay::to_room_except(&state.rooms, room, conn.id, msg).await;
    }
}

fn is_empty_payload(message: &Value) -> bool {
    match message {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
