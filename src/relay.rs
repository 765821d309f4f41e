//! Cross-connection message delivery.
//!
//! Delivery is fire-and-forget: a send failure means the receiving task has
//! already exited, and its membership is cleaned up on that task's own
//! disconnect path. Per-sender ordering is inherited from the mpsc channel.

use crate::protocol::ServerMessage;
use crate::rooms::{ConnectionId, RoomRegistry};

/// Forward an event to every room member except the sender.
///
/// Broadcasting into a one-member room delivers to nobody; that is not an
/// error.
pub async fn to_room_except(
    registry: &RoomRegistry,
    room: &str,
    sender: ConnectionId,
    msg: ServerMessage,
) {
    for (id, tx) in registry.peers(room).await {
        if id == sender {
            continue;
        }
        let _ = tx.send(msg.clone());
    }
}

/// Forward an event to every room member, sender included.
pub async fn to_room(registry: &RoomRegistry, room: &str, msg: ServerMessage) {
    for (_, tx) in registry.peers(room).await {
        let _ = tx.send(msg.clone());
    }
}
