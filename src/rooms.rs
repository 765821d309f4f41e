//! Room membership bookkeeping.
//!
//! A room exists exactly as long as it has members: entries are created
//! lazily by the first `admit` and dropped when the last member releases.
//! All membership mutation happens under one write-lock acquisition, which
//! is what makes the capacity check race-free.

use std::collections::HashMap;

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::protocol::ServerMessage;

/// Rooms pair exactly two racers.
pub const ROOM_CAPACITY: usize = 2;

/// Room identifiers are exactly four characters, with no further validation.
pub const ROOM_ID_LEN: usize = 4;

pub type ConnectionId = Ulid;

/// Outbound channel for one connection, used by the relay engine.
pub type PeerSender = UnboundedSender<ServerMessage>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RoomError {
    #[error("room identifier must be exactly {ROOM_ID_LEN} characters")]
    InvalidId,

    #[error("room is already at capacity")]
    RoomFull,
}

#[derive(Default)]
struct Room {
    members: HashMap<ConnectionId, PeerSender>,
}

/// Shared mapping from room identifier to its current members.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Room>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently admitted connections; 0 if the room doesn't exist.
    pub async fn member_count(&self, room: &str) -> usize {
        self.rooms
            .read()
            .await
            .get(room)
            .map_or(0, |r| r.members.len())
    }

    /// Add a connection to a room, creating the room if needed.
    ///
    /// The capacity check and the insert happen under the same write guard,
    /// so two racing admits on a room with one free slot yield exactly one
    /// success.
    pub async fn admit(
        &self,
        id: ConnectionId,
        sender: PeerSender,
        room: &str,
    ) -> Result<(), RoomError> {
        if room.len() != ROOM_ID_LEN {
            return Err(RoomError::InvalidId);
        }

        let mut rooms = self.rooms.write().await;
        let entry = rooms.entry(room.to_string()).or_default();
        if entry.members.len() >= ROOM_CAPACITY {
            return Err(RoomError::RoomFull);
        }
        entry.members.insert(id, sender);
        Ok(())
    }

    /// Remove a connection from a room. Idempotent; dropping the last member
    /// removes the room entry itself.
    pub async fn release(&self, id: ConnectionId, room: &str) {
        let mut rooms = self.rooms.write().await;
        if let Some(entry) = rooms.get_mut(room) {
            entry.members.remove(&id);
            if entry.members.is_empty() {
                rooms.remove(room);
            }
        }
    }

    /// Snapshot of a room's members and their outbound channels.
    pub(crate) async fn peers(&self, room: &str) -> Vec<(ConnectionId, PeerSender)> {
        self.rooms
            .read()
            .await
            .get(room)
            .map(|r| {
                r.members
                    .iter()
                    .map(|(id, tx)| (*id, tx.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}
