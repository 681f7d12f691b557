//! Network Layer
//!
//! WebSocket server for real-time multiplayer communication.
//! This layer is **non-deterministic** - all game logic runs through `game/`.

pub mod protocol;
pub mod room;
pub mod registry;
pub mod server;

pub use protocol::{
    BoardSize, ClientMessage, GameAction, MessageKind, PlayerInfo, ServerMessage,
};
pub use registry::{RegistryError, RoomRegistry};
pub use room::{ConnId, JoinRole, Room, RoomError};
pub use server::{GameServer, GameServerError, ServerConfig};
