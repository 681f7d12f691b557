//! # Warfront Game Server
//!
//! Authoritative WebSocket server for a two-player, turn-based tactical
//! board game with live spectators.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     WARFRONT SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  game/           - Match rules (pure, synchronous)           │
//! │  ├── board.rs    - Grid, coordinates, deployment zones       │
//! │  ├── piece.rs    - Piece types and stat profiles             │
//! │  ├── nation.rs   - Nation catalog and abilities              │
//! │  ├── state.rs    - Match state and phase machine             │
//! │  └── rules.rs    - Intent validation and transitions         │
//! │                                                              │
//! │  network/        - Networking (non-deterministic)            │
//! │  ├── server.rs   - WebSocket server                          │
//! │  ├── protocol.rs - Message types                             │
//! │  ├── room.rs     - Room membership and broadcast             │
//! │  └── registry.rs - Live room table                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Authority Model
//!
//! The server holds the only copy of match state. Clients send intents;
//! the rule engine validates each one completely before mutating
//! anything, and every accepted mutation broadcasts the full snapshot
//! to the whole room. Clients are stateless renderers and nothing a
//! client sends is trusted.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod game;
pub mod network;

// Re-export commonly used types
pub use game::board::{Board, Coord};
pub use game::rules::RuleError;
pub use game::state::{GameState, Phase, RuleConfig};
pub use network::protocol::{ClientMessage, ServerMessage};
pub use network::server::{GameServer, ServerConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
