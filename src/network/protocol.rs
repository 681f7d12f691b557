//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! All messages are JSON with a camelCase `type` tag. The server never
//! sends deltas: every accepted mutation broadcasts the full match
//! snapshot and clients render it statelessly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::nation::NationId;
use crate::game::piece::PieceType;
use crate::game::state::{GameState, RuleToggle};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Join (or create) a room by name.
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        /// Room identifier. Any non-empty string.
        room_id: String,
        /// Display name for the player list.
        player_name: String,
        /// Requested board dimensions. Only honored when the room is
        /// created by this join; later joiners inherit the room's size.
        #[serde(default)]
        board_size: Option<BoardSize>,
    },

    /// Claim a nation during the nation-selection phase.
    SelectNation {
        /// The nation to claim.
        nation: NationId,
    },

    /// An in-match intent, resolved by the rule engine.
    GameAction {
        /// The intent payload.
        action: GameAction,
    },
}

/// Requested board dimensions at room creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSize {
    /// Columns.
    pub width: u8,
    /// Rows.
    pub height: u8,
}

/// In-match intents. All coordinates are row/column, row 0 at seat 1's
/// home edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GameAction {
    /// Place a piece from the roster during the placement phase.
    #[serde(rename_all = "camelCase")]
    PlacePiece {
        /// Target row.
        row: i8,
        /// Target column.
        col: i8,
        /// Piece type to place.
        piece_type: PieceType,
    },

    /// Click a cell: select, deselect, place, move or attack depending
    /// on phase and cursor.
    SelectCell {
        /// Target row.
        row: i8,
        /// Target column.
        col: i8,
    },

    /// Queue a piece type for subsequent `selectCell` placement.
    #[serde(rename_all = "camelCase")]
    SelectPieceType {
        /// Piece type to queue.
        piece_type: PieceType,
    },

    /// End the active seat's turn.
    EndTurn,

    /// Flip a ruleset toggle (before battle begins).
    ToggleOption {
        /// The toggle to flip.
        option: RuleToggle,
    },
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// The joiner was assigned a player seat.
    #[serde(rename_all = "camelCase")]
    PlayerAssigned {
        /// Seat number (1 or 2).
        player_number: u8,
        /// Display name the seat was registered under.
        player_name: String,
        /// Room joined.
        room_id: String,
    },

    /// The joiner entered a full room as a spectator.
    #[serde(rename_all = "camelCase")]
    JoinedAsSpectator {
        /// Room joined.
        room_id: String,
    },

    /// Full authoritative snapshot of the match.
    #[serde(rename_all = "camelCase")]
    GameStateUpdate {
        /// The complete match state.
        state: GameState,
        /// Display name keyed by seat number ("1" or "2"). String keys:
        /// the tagged envelope buffers content, which loses serde_json's
        /// integer-map-key handling on the way back in.
        player_names: BTreeMap<String, String>,
    },

    /// Room membership changed.
    #[serde(rename_all = "camelCase")]
    PlayerListUpdate {
        /// Seated players.
        players: Vec<PlayerInfo>,
        /// Spectators currently watching.
        spectator_count: usize,
    },

    /// Human-readable event line for the room log.
    GameMessage {
        /// The text to display.
        message: String,
        /// Severity/category for client styling.
        kind: MessageKind,
    },

    /// The request failed; sent only to the offending connection.
    Error {
        /// What went wrong.
        reason: String,
    },
}

/// A seated player, as shown in room listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    /// Seat number (1 or 2).
    pub player_number: u8,
    /// Display name.
    pub player_name: String,
    /// Claimed nation, if any.
    pub nation: Option<NationId>,
}

/// Category of a [`ServerMessage::GameMessage`] line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageKind {
    /// Joins, leaves, phase transitions.
    Info,
    /// A rejected intent, broadcast so both players see the call.
    Advisory,
    /// Attack and damage resolution.
    Combat,
    /// The match was decided.
    Victory,
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
