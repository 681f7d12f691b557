//! Room Registry
//!
//! Tracks every live room by name. Rooms are created on first join,
//! shared behind `Arc<RwLock>`, and dropped once the last participant
//! disconnects. Lock order is always registry before room.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::game::board::{MAX_DIMENSION, MIN_DIMENSION};
use crate::game::state::RuleConfig;
use crate::network::protocol::BoardSize;
use crate::network::room::Room;

/// Registry errors, answered directly to the offending connection.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    /// Requested board dimensions outside the accepted range.
    #[error("board dimensions must be between 4 and 12 ({0}x{1} requested)")]
    InvalidDimensions(u8, u8),

    /// Requested board dimensions conflict with an existing room.
    #[error("room '{room_id}' already uses a {width}x{height} board")]
    DimensionMismatch {
        /// Room that rejected the request.
        room_id: String,
        /// Width of the existing board.
        width: u8,
        /// Height of the existing board.
        height: u8,
    },
}

/// All live rooms, keyed by room name.
pub struct RoomRegistry {
    rooms: RwLock<BTreeMap<String, Arc<RwLock<Room>>>>,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(BTreeMap::new()),
        }
    }

    /// Look up a room, creating it if absent. A board size request must
    /// match an existing room's dimensions; otherwise it configures the
    /// new room. Omitting the size always accepts the room as-is.
    pub async fn resolve_or_create(
        &self,
        room_id: &str,
        board_size: Option<BoardSize>,
    ) -> Result<Arc<RwLock<Room>>, RegistryError> {
        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.get(room_id) {
            if let Some(size) = board_size {
                let (width, height) = {
                    let guard = room.read().await;
                    (guard.state().board.width(), guard.state().board.height())
                };
                if size.width != width || size.height != height {
                    return Err(RegistryError::DimensionMismatch {
                        room_id: room_id.to_string(),
                        width,
                        height,
                    });
                }
            }
            return Ok(room.clone());
        }

        let mut config = RuleConfig::default();
        if let Some(size) = board_size {
            let valid = (MIN_DIMENSION..=MAX_DIMENSION).contains(&size.width)
                && (MIN_DIMENSION..=MAX_DIMENSION).contains(&size.height);
            if !valid {
                return Err(RegistryError::InvalidDimensions(size.width, size.height));
            }
            config.width = size.width;
            config.height = size.height;
        }

        info!(room = %room_id, width = config.width, height = config.height, "room created");
        let room = Arc::new(RwLock::new(Room::new(room_id.to_string(), config)));
        rooms.insert(room_id.to_string(), room.clone());
        Ok(room)
    }

    /// Get an existing room.
    pub async fn get(&self, room_id: &str) -> Option<Arc<RwLock<Room>>> {
        let rooms = self.rooms.read().await;
        rooms.get(room_id).cloned()
    }

    /// Drop a room if nobody is connected to it. Idempotent.
    pub async fn drop_if_empty(&self, room_id: &str) {
        let mut rooms = self.rooms.write().await;
        let empty = match rooms.get(room_id) {
            Some(room) => room.read().await.is_empty(),
            None => return,
        };
        if empty {
            rooms.remove(room_id);
            info!(room = %room_id, "empty room dropped");
        }
    }

    /// Force-remove a room. Used when a room reports an engine fault;
    /// other rooms are unaffected.
    pub async fn remove(&self, room_id: &str) {
        let mut rooms = self.rooms.write().await;
        rooms.remove(room_id);
    }

    /// Number of live rooms.
    pub async fn room_count(&self) -> usize {
        let rooms = self.rooms.read().await;
        rooms.len()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
