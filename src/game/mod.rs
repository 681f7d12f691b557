//! Game Logic Module
//!
//! All match rules and state. Pure and synchronous; the network layer
//! drives it with validated intents and broadcasts the results.
//!
//! ## Module Structure
//!
//! - `board`: Grid, coordinates, deployment zones
//! - `piece`: Piece types, stat profiles, instances
//! - `nation`: Nation catalog and ability flags
//! - `state`: Match state and phase machine
//! - `rules`: Intent validation and state transitions

pub mod board;
pub mod piece;
pub mod nation;
pub mod state;
pub mod rules;

// Re-export key types
pub use board::{Board, Coord, DEFAULT_HEIGHT, DEFAULT_WIDTH, MAX_DIMENSION, MIN_DIMENSION};
pub use nation::{Ability, Nation, NationId};
pub use piece::{Piece, PieceType};
pub use rules::{AttackReport, EndTurnReport, MoveReport, RuleError, SelectOutcome};
pub use state::{GameState, Phase, RuleConfig, RuleToggle, TurnOrdering};
