//! Match State Definitions
//!
//! The authoritative `GameState` for one match, plus the phase state
//! machine and ruleset configuration. Mutated only by the rule engine
//! in response to validated intents; uses BTreeMap rosters for
//! deterministic serialization order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::board::{Board, Coord, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::game::nation::{NationId, DEFAULT_ROSTER};
use crate::game::piece::PieceType;

/// Pieces each seat must place on its first placement turn (capped by
/// roster size). The second placement turn places everything left.
pub const FIRST_ROUND_QUOTA: u8 = 4;

/// Total placement turns before battle: both seats, twice.
pub const PLACEMENT_TURNS: u8 = 4;

/// Effective range ceiling when the limited-range toggle is on.
/// Overrides ability bonuses.
pub const RANGE_CAP: u8 = 2;

/// Match phases, in order of progression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    /// Fewer than two seats occupied.
    Waiting,
    /// Both seats present, choosing nations.
    NationSelection,
    /// Alternating placement turns.
    Placement,
    /// Alternating battle turns.
    Battle,
    /// Terminal; `winner` is set.
    Ended,
}

/// Move/attack ordering policy within one battle turn.
///
/// Source rulesets disagree on whether moving after attacking is ever
/// allowed, so the policy is an explicit configuration parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TurnOrdering {
    /// At most one move and one attack, in either order.
    Free,
    /// The move, if any, must come before the attack: once a seat has
    /// attacked it may no longer move that turn.
    MoveBeforeAttack,
}

/// Ruleset toggles exposed to clients before battle begins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleToggle {
    /// Ranged attacks require an unobstructed straight line.
    LineOfSight,
    /// Ranged attacks are capped at [`RANGE_CAP`] cells.
    LimitedRange,
    /// Switch between [`TurnOrdering`] policies.
    MoveBeforeAttack,
}

/// Per-match ruleset configuration. Board dimensions are fixed at room
/// creation; toggles lock once battle begins.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleConfig {
    /// Board width in columns.
    pub width: u8,
    /// Board height in rows.
    pub height: u8,
    /// Require unobstructed lines for ranged attacks.
    pub line_of_sight: bool,
    /// Cap ranged attacks at [`RANGE_CAP`].
    pub limited_range: bool,
    /// Move/attack ordering policy.
    pub ordering: TurnOrdering,
    /// Whether the nation-selection phase is played.
    pub nations_enabled: bool,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            line_of_sight: false,
            limited_range: false,
            ordering: TurnOrdering::MoveBeforeAttack,
            nations_enabled: true,
        }
    }
}

/// Remaining unplaced pieces for one seat.
pub type Roster = BTreeMap<PieceType, u8>;

/// The authoritative state of one match. The full struct is the
/// snapshot broadcast to every room participant after each accepted
/// mutation; clients are stateless renderers of it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// Ruleset configuration.
    pub config: RuleConfig,
    /// Current phase.
    pub phase: Phase,
    /// Seat whose turn it is (1 or 2).
    pub current_player: u8,
    /// Placement turns completed so far (0..=[`PLACEMENT_TURNS`]).
    pub placement_turn: u8,
    /// Pieces the active seat has placed this turn.
    pub pieces_placed_this_turn: u8,
    /// Active seat has spent its move action this turn.
    pub has_moved: bool,
    /// Active seat has spent its attack action this turn.
    pub has_attacked: bool,
    /// Unplaced pieces per seat (index 0 = seat 1).
    pub rosters: [Roster; 2],
    /// Nation chosen per seat, if nations are enabled.
    pub nations: [Option<NationId>; 2],
    /// The board.
    pub board: Board,
    /// Selection cursor for the active seat.
    pub selected: Option<Coord>,
    /// Piece type queued for placement.
    pub selected_piece_type: Option<PieceType>,
    /// Winning seat once the match has ended.
    pub winner: Option<u8>,
}

impl GameState {
    /// Create a fresh match state in the waiting phase.
    pub fn new(config: RuleConfig) -> Self {
        Self {
            config,
            phase: Phase::Waiting,
            current_player: 1,
            placement_turn: 0,
            pieces_placed_this_turn: 0,
            has_moved: false,
            has_attacked: false,
            rosters: [Roster::new(), Roster::new()],
            nations: [None, None],
            board: Board::new(config.width, config.height),
            selected: None,
            selected_piece_type: None,
            winner: None,
        }
    }

    /// Reset to the initial waiting state, keeping the configuration.
    /// Used when a seat vacates mid-match.
    pub fn reset(&mut self) {
        *self = GameState::new(self.config);
    }

    /// Both seats are occupied: leave `waiting` for nation selection,
    /// or straight to placement with the shared default roster.
    pub fn begin(&mut self) {
        if self.phase != Phase::Waiting {
            return;
        }
        if self.config.nations_enabled {
            self.phase = Phase::NationSelection;
        } else {
            self.seed_roster(1, DEFAULT_ROSTER);
            self.seed_roster(2, DEFAULT_ROSTER);
            self.phase = Phase::Placement;
        }
        self.current_player = 1;
    }

    /// Load a seat's roster from a catalog slice.
    pub fn seed_roster(&mut self, seat: u8, roster: &[(PieceType, u8)]) {
        let slot = &mut self.rosters[seat as usize - 1];
        slot.clear();
        for (kind, count) in roster {
            slot.insert(*kind, *count);
        }
    }

    /// Remaining unplaced pieces for a seat.
    pub fn roster(&self, seat: u8) -> &Roster {
        &self.rosters[seat as usize - 1]
    }

    /// Mutable roster access.
    pub fn roster_mut(&mut self, seat: u8) -> &mut Roster {
        &mut self.rosters[seat as usize - 1]
    }

    /// Total pieces left in a seat's roster.
    pub fn roster_total(&self, seat: u8) -> u8 {
        self.roster(seat).values().sum()
    }

    /// Nation chosen by a seat.
    pub fn nation_of(&self, seat: u8) -> Option<NationId> {
        self.nations[seat as usize - 1]
    }

    /// Pieces the active seat must place before it may end this
    /// placement turn. First round: [`FIRST_ROUND_QUOTA`] (or the whole
    /// roster if smaller). Second round: everything that remains.
    pub fn required_quota(&self) -> u8 {
        let available = self.pieces_placed_this_turn + self.roster_total(self.current_player);
        if self.placement_turn < 2 {
            available.min(FIRST_ROUND_QUOTA)
        } else {
            available
        }
    }

    /// The seat opposing `seat`.
    pub fn opponent_of(seat: u8) -> u8 {
        if seat == 1 {
            2
        } else {
            1
        }
    }
}
