//! Combat and Placement Rule Engine
//!
//! Pure state-transition functions over [`GameState`]. Every operation
//! validates completely before mutating anything, so a rejected intent
//! leaves the state untouched and no intent ever partially applies.
//! Error display strings double as the advisory text broadcast to
//! rooms.

use thiserror::Error;

use crate::game::board::{unit_direction, Coord, ORTHOGONAL_DIRS};
use crate::game::nation::{Ability, NationId};
use crate::game::piece::{Piece, PieceType};
use crate::game::state::{
    GameState, Phase, RuleToggle, TurnOrdering, PLACEMENT_TURNS, RANGE_CAP,
};

/// A rejected intent, with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// The match is over; nothing further is accepted.
    #[error("the match has already ended")]
    MatchEnded,

    /// Intent from the seat that is not on turn.
    #[error("it is not your turn")]
    NotYourTurn,

    /// Intent not valid in the current phase.
    #[error("that action is not allowed during {0:?}")]
    WrongPhase(Phase),

    /// Coordinate off the board.
    #[error("that cell is off the board")]
    OutOfBounds,

    /// Placement outside the seat's deployment band.
    #[error("that cell is outside your deployment zone")]
    OutsideDeploymentZone,

    /// Destination or placement cell already holds a piece.
    #[error("that cell is already occupied")]
    CellOccupied,

    /// No pieces of the requested type left to place.
    #[error("no {0} left in your roster")]
    RosterExhausted(&'static str),

    /// Placement attempted past this turn's quota.
    #[error("you have already placed your pieces for this turn")]
    QuotaExceeded,

    /// End-turn during placement before the quota was met.
    #[error("place {required} pieces before ending your turn ({placed} placed)")]
    QuotaNotMet {
        /// Pieces placed so far this turn.
        placed: u8,
        /// Pieces required this turn.
        required: u8,
    },

    /// No piece type queued for placement.
    #[error("select a piece type to place first")]
    NoPieceTypeSelected,

    /// Selected or source cell is empty.
    #[error("there is no piece on that cell")]
    EmptyCell,

    /// Acting on an opposing piece.
    #[error("that piece is not yours")]
    NotYourPiece,

    /// Attacking a friendly piece.
    #[error("you cannot attack your own piece")]
    FriendlyTarget,

    /// Second move in one turn.
    #[error("you have already moved this turn")]
    AlreadyMoved,

    /// Second attack in one turn.
    #[error("you have already attacked this turn")]
    AlreadyAttacked,

    /// Move after attack under [`TurnOrdering::MoveBeforeAttack`].
    #[error("you cannot move after attacking under this ruleset")]
    MoveAfterAttack,

    /// Destination unreachable for that piece.
    #[error("that piece cannot move there")]
    IllegalMove,

    /// Target beyond the piece's effective range.
    #[error("that target is out of range")]
    OutOfRange,

    /// Ranged target not on a straight orthogonal line.
    #[error("ranged attacks must follow a straight line")]
    NotStraightLine,

    /// Ranged attack with an empty quiver.
    #[error("that piece has no ammunition left")]
    NoAmmo,

    /// Line of sight blocked by an intervening piece.
    #[error("the line of sight is blocked")]
    LineBlocked,

    /// Nation already claimed by the opposing seat.
    #[error("that nation is already claimed")]
    NationTaken,

    /// Ruleset toggle after battle started.
    #[error("options are locked once battle begins")]
    OptionsLocked,

    /// Broken engine invariant. Fatal for the affected match only.
    #[error("engine invariant violated: {0}")]
    Internal(String),
}

/// Outcome of a completed move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveReport {
    /// Origin cell.
    pub from: Coord,
    /// Destination cell.
    pub to: Coord,
    /// The piece replenished at its home row.
    pub healed: bool,
}

/// One enemy struck by cleave splash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleaveHit {
    /// Cell of the cleaved enemy.
    pub at: Coord,
    /// Type of the cleaved enemy.
    pub target: PieceType,
    /// Whether the splash damage destroyed it.
    pub killed: bool,
}

/// Outcome of a completed attack, including any cleave splash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackReport {
    /// Attacking piece type.
    pub attacker: PieceType,
    /// Primary target type.
    pub target: PieceType,
    /// Damage dealt to the primary target.
    pub damage: i8,
    /// The charge bonus applied.
    pub charged: bool,
    /// The primary target was destroyed.
    pub killed: bool,
    /// Cleave splash results, in fixed direction order.
    pub cleave_hits: Vec<CleaveHit>,
    /// Set when this attack decided the match.
    pub winner: Option<u8>,
}

/// Outcome of an accepted end-turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndTurnReport {
    /// Phase after the transition.
    pub phase: Phase,
    /// Seat now on turn.
    pub next_player: u8,
}

/// What a `selectCell` intent resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Cursor now on one of the seat's pieces.
    Selected(Coord),
    /// Cursor cleared.
    Deselected,
    /// A piece was placed (placement phase).
    Placed(Coord),
    /// The selected piece moved.
    Moved(MoveReport),
    /// The selected piece attacked.
    Attacked(AttackReport),
}

fn ensure_active(state: &GameState, seat: u8) -> Result<(), RuleError> {
    if state.phase == Phase::Ended {
        return Err(RuleError::MatchEnded);
    }
    if state.current_player != seat {
        return Err(RuleError::NotYourTurn);
    }
    Ok(())
}

/// Claim a nation for a seat during nation selection. Once both seats
/// have chosen, the match advances to placement with seat 1 on turn.
pub fn select_nation(state: &mut GameState, seat: u8, nation: NationId) -> Result<(), RuleError> {
    if state.phase != Phase::NationSelection {
        return Err(RuleError::WrongPhase(state.phase));
    }
    if state.nation_of(GameState::opponent_of(seat)) == Some(nation) {
        return Err(RuleError::NationTaken);
    }

    state.nations[seat as usize - 1] = Some(nation);
    state.seed_roster(seat, nation.catalog().roster);

    if state.nations.iter().all(Option::is_some) {
        state.phase = Phase::Placement;
        state.current_player = 1;
    }
    Ok(())
}

/// Queue a piece type for placement via `selectCell`.
pub fn select_piece_type(state: &mut GameState, seat: u8, kind: PieceType) -> Result<(), RuleError> {
    if state.phase != Phase::Placement {
        return Err(RuleError::WrongPhase(state.phase));
    }
    ensure_active(state, seat)?;
    if state.roster(seat).get(&kind).copied().unwrap_or(0) == 0 {
        return Err(RuleError::RosterExhausted(kind.display_name()));
    }
    state.selected_piece_type = Some(kind);
    Ok(())
}

/// Place a piece from the seat's roster onto its deployment zone.
pub fn place_piece(
    state: &mut GameState,
    seat: u8,
    kind: PieceType,
    at: Coord,
) -> Result<(), RuleError> {
    if state.phase != Phase::Placement {
        return Err(RuleError::WrongPhase(state.phase));
    }
    ensure_active(state, seat)?;
    if state.pieces_placed_this_turn >= state.required_quota() {
        return Err(RuleError::QuotaExceeded);
    }
    if !state.board.in_bounds(at) {
        return Err(RuleError::OutOfBounds);
    }
    if !state.board.in_deployment_zone(seat, at) {
        return Err(RuleError::OutsideDeploymentZone);
    }
    if !state.board.is_empty_cell(at) {
        return Err(RuleError::CellOccupied);
    }
    let remaining = state.roster(seat).get(&kind).copied().unwrap_or(0);
    if remaining == 0 {
        return Err(RuleError::RosterExhausted(kind.display_name()));
    }

    state.roster_mut(seat).insert(kind, remaining - 1);
    let piece = Piece::new(kind, seat, state.nation_of(seat));
    if state.board.put(at, piece).is_some() {
        return Err(RuleError::Internal(format!(
            "placement displaced a piece at {:?}",
            at
        )));
    }
    state.pieces_placed_this_turn += 1;
    Ok(())
}

/// Validate move geometry against a piece's profile. Returns the charge
/// direction to record, if the move is a two-cell straight leap.
fn validate_move_geometry(piece: &Piece, delta: (i8, i8)) -> Result<Option<(i8, i8)>, RuleError> {
    let (dr, dc) = delta;
    match (dr.abs(), dc.abs()) {
        (1, 0) | (0, 1) => Ok(None),
        (1, 1) if piece.can_move_diagonally() => Ok(None),
        (2, 0) | (0, 2) if piece.move_range() >= 2 => Ok(unit_direction(delta)),
        _ => Err(RuleError::IllegalMove),
    }
}

/// Move a piece. Two-cell moves are leaps: the intermediate cell may be
/// occupied. A piece ending its move on its own home row replenishes
/// once per match (Generals excluded).
pub fn move_piece(
    state: &mut GameState,
    seat: u8,
    from: Coord,
    to: Coord,
) -> Result<MoveReport, RuleError> {
    ensure_active(state, seat)?;
    if state.phase != Phase::Battle {
        return Err(RuleError::WrongPhase(state.phase));
    }
    if state.has_moved {
        return Err(RuleError::AlreadyMoved);
    }
    if state.config.ordering == TurnOrdering::MoveBeforeAttack && state.has_attacked {
        return Err(RuleError::MoveAfterAttack);
    }
    if !state.board.in_bounds(to) {
        return Err(RuleError::OutOfBounds);
    }
    if !state.board.is_empty_cell(to) {
        return Err(RuleError::CellOccupied);
    }
    let piece = state.board.piece_at(from).ok_or(RuleError::EmptyCell)?;
    if piece.owner != seat {
        return Err(RuleError::NotYourPiece);
    }
    let charge = validate_move_geometry(piece, from.delta_to(to))?;

    let mut piece = state
        .board
        .take(from)
        .ok_or_else(|| RuleError::Internal(format!("move source emptied at {:?}", from)))?;
    piece.charge_dir = charge;

    let mut healed = false;
    if to.row == state.board.home_row(seat)
        && !piece.has_been_replenished
        && piece.kind != PieceType::General
    {
        piece.replenish();
        healed = true;
    }

    state.board.put(to, piece);
    state.has_moved = true;
    state.selected = Some(to);
    Ok(MoveReport { from, to, healed })
}

/// Apply damage to the piece at `at`, removing it in the same step if
/// health reaches zero. A destroyed General decides the match.
fn apply_damage(state: &mut GameState, at: Coord, damage: i8, attacker_seat: u8) -> bool {
    let Some(piece) = state.board.piece_at_mut(at) else {
        return false;
    };
    piece.health -= damage;
    if piece.health > 0 {
        return false;
    }
    if let Some(dead) = state.board.take(at) {
        if dead.kind == PieceType::General && state.winner.is_none() {
            state.winner = Some(attacker_seat);
            state.phase = Phase::Ended;
        }
    }
    true
}

/// Attack an enemy piece. Adjacent orthogonal attacks are always legal;
/// ranged attacks need ammo, a straight line, and pass the ruleset's
/// range and line-of-sight toggles. Resolves charge bonus, ammo
/// consumption, cleave splash, and the victory condition.
pub fn attack(
    state: &mut GameState,
    seat: u8,
    from: Coord,
    to: Coord,
) -> Result<AttackReport, RuleError> {
    ensure_active(state, seat)?;
    if state.phase != Phase::Battle {
        return Err(RuleError::WrongPhase(state.phase));
    }
    if state.has_attacked {
        return Err(RuleError::AlreadyAttacked);
    }
    let attacker = state
        .board
        .piece_at(from)
        .ok_or(RuleError::EmptyCell)?
        .clone();
    if attacker.owner != seat {
        return Err(RuleError::NotYourPiece);
    }
    let target = state.board.piece_at(to).ok_or(RuleError::EmptyCell)?.clone();
    if target.owner == seat {
        return Err(RuleError::FriendlyTarget);
    }

    let delta = from.delta_to(to);
    let distance = from.manhattan(to);

    if distance > 1 {
        let dir = unit_direction(delta).ok_or(RuleError::NotStraightLine)?;
        if attacker.ammo.unwrap_or(0) == 0 {
            return Err(RuleError::NoAmmo);
        }
        let mut range = attacker.attack_range();
        if state.config.limited_range {
            range = range.min(RANGE_CAP);
        }
        if distance > range {
            return Err(RuleError::OutOfRange);
        }
        if state.config.line_of_sight {
            let mut cell = from.step(dir);
            while cell != to {
                if !state.board.is_empty_cell(cell) {
                    return Err(RuleError::LineBlocked);
                }
                cell = cell.step(dir);
            }
        }
    }

    // Validation complete; mutate.
    let mut damage = 1i8;
    let mut charged = false;
    if distance == 1 && attacker.charge_dir == Some(delta) && !target.kind.rules().heavy {
        damage = 2;
        charged = true;
    }

    let consume_ammo = distance > 1
        && !(attacker.has_ability(Ability::AmmoSavingKillShot) && target.health <= 1);
    if let Some(piece) = state.board.piece_at_mut(from) {
        if consume_ammo {
            if let Some(ammo) = piece.ammo.as_mut() {
                *ammo = ammo.saturating_sub(1);
            }
        }
        piece.charge_dir = None;
    }

    let killed = apply_damage(state, to, damage, seat);

    let mut cleave_hits = Vec::new();
    if distance == 1 && attacker.has_ability(Ability::CleaveOnMelee) {
        for dir in ORTHOGONAL_DIRS {
            let cell = from.step(dir);
            if cell == to {
                continue;
            }
            let Some(victim) = state.board.piece_at(cell) else {
                continue;
            };
            if victim.owner == seat {
                continue;
            }
            let victim_kind = victim.kind;
            let cleave_killed = apply_damage(state, cell, 1, seat);
            cleave_hits.push(CleaveHit {
                at: cell,
                target: victim_kind,
                killed: cleave_killed,
            });
        }
    }

    state.has_attacked = true;
    Ok(AttackReport {
        attacker: attacker.kind,
        target: target.kind,
        damage,
        charged,
        killed,
        cleave_hits,
        winner: state.winner,
    })
}

/// End the active seat's turn. In placement the quota must be met; in
/// battle this is unconditional and clears all per-turn state,
/// including every piece's charge direction.
pub fn end_turn(state: &mut GameState, seat: u8) -> Result<EndTurnReport, RuleError> {
    ensure_active(state, seat)?;
    match state.phase {
        Phase::Placement => {
            let required = state.required_quota();
            if state.pieces_placed_this_turn != required {
                return Err(RuleError::QuotaNotMet {
                    placed: state.pieces_placed_this_turn,
                    required,
                });
            }
            state.placement_turn += 1;
            state.pieces_placed_this_turn = 0;
            state.selected = None;
            state.selected_piece_type = None;
            if state.placement_turn >= PLACEMENT_TURNS {
                state.phase = Phase::Battle;
                state.current_player = 1;
                state.has_moved = false;
                state.has_attacked = false;
            } else {
                state.current_player = if state.placement_turn % 2 == 0 { 1 } else { 2 };
            }
        }
        Phase::Battle => {
            state.selected = None;
            state.has_moved = false;
            state.has_attacked = false;
            state.board.clear_charges();
            state.current_player = GameState::opponent_of(seat);
        }
        phase => return Err(RuleError::WrongPhase(phase)),
    }
    Ok(EndTurnReport {
        phase: state.phase,
        next_player: state.current_player,
    })
}

/// Flip a ruleset toggle. Allowed for either seat until battle begins.
pub fn toggle_option(state: &mut GameState, toggle: RuleToggle) -> Result<(), RuleError> {
    if matches!(state.phase, Phase::Battle | Phase::Ended) {
        return Err(RuleError::OptionsLocked);
    }
    match toggle {
        RuleToggle::LineOfSight => state.config.line_of_sight = !state.config.line_of_sight,
        RuleToggle::LimitedRange => state.config.limited_range = !state.config.limited_range,
        RuleToggle::MoveBeforeAttack => {
            state.config.ordering = match state.config.ordering {
                TurnOrdering::Free => TurnOrdering::MoveBeforeAttack,
                TurnOrdering::MoveBeforeAttack => TurnOrdering::Free,
            };
        }
    }
    Ok(())
}

/// Resolve a `selectCell` intent. During placement this places the
/// queued piece type; during battle it drives the cursor and routes to
/// move or attack.
pub fn select_cell(state: &mut GameState, seat: u8, at: Coord) -> Result<SelectOutcome, RuleError> {
    ensure_active(state, seat)?;
    if !state.board.in_bounds(at) {
        return Err(RuleError::OutOfBounds);
    }
    match state.phase {
        Phase::Placement => {
            let kind = state
                .selected_piece_type
                .ok_or(RuleError::NoPieceTypeSelected)?;
            place_piece(state, seat, kind, at)?;
            Ok(SelectOutcome::Placed(at))
        }
        Phase::Battle => match state.selected {
            None => {
                let piece = state.board.piece_at(at).ok_or(RuleError::EmptyCell)?;
                if piece.owner != seat {
                    return Err(RuleError::NotYourPiece);
                }
                state.selected = Some(at);
                Ok(SelectOutcome::Selected(at))
            }
            Some(cursor) if cursor == at => {
                state.selected = None;
                Ok(SelectOutcome::Deselected)
            }
            Some(cursor) => match state.board.piece_at(at) {
                Some(piece) if piece.owner == seat => {
                    state.selected = Some(at);
                    Ok(SelectOutcome::Selected(at))
                }
                Some(_) => attack(state, seat, cursor, at).map(SelectOutcome::Attacked),
                None => move_piece(state, seat, cursor, at).map(SelectOutcome::Moved),
            },
        },
        phase => Err(RuleError::WrongPhase(phase)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::RuleConfig;
    use proptest::prelude::*;

    fn plain_config() -> RuleConfig {
        RuleConfig {
            nations_enabled: false,
            ..Default::default()
        }
    }

    fn battle_state() -> GameState {
        let mut state = GameState::new(plain_config());
        state.phase = Phase::Battle;
        state.current_player = 1;
        state
    }

    fn put(state: &mut GameState, kind: PieceType, owner: u8, row: i8, col: i8) {
        put_nation(state, kind, owner, row, col, None);
    }

    fn put_nation(
        state: &mut GameState,
        kind: PieceType,
        owner: u8,
        row: i8,
        col: i8,
        nation: Option<NationId>,
    ) {
        state
            .board
            .put(Coord::new(row, col), Piece::new(kind, owner, nation));
    }

    /// Place pieces until the active seat's quota for this turn is met.
    fn fill_quota(state: &mut GameState, seat: u8) {
        while state.pieces_placed_this_turn < state.required_quota() {
            let kind = *state
                .roster(seat)
                .iter()
                .find(|(_, count)| **count > 0)
                .map(|(kind, _)| kind)
                .unwrap();
            let mut placed = false;
            'search: for row in 0..state.board.height() as i8 {
                for col in 0..state.board.width() as i8 {
                    let at = Coord::new(row, col);
                    if state.board.in_deployment_zone(seat, at) && state.board.is_empty_cell(at) {
                        place_piece(state, seat, kind, at).unwrap();
                        placed = true;
                        break 'search;
                    }
                }
            }
            assert!(placed, "deployment zone filled before quota met");
        }
    }

    // ------------------------------------------------------------------
    // Placement
    // ------------------------------------------------------------------

    #[test]
    fn test_end_turn_rejected_below_quota() {
        // 6x7 board: seat 1 places a General and a Cavalry, then tries
        // to end turn short of the 4-piece quota.
        let mut state = GameState::new(RuleConfig {
            width: 6,
            height: 7,
            nations_enabled: false,
            ..Default::default()
        });
        state.begin();

        place_piece(&mut state, 1, PieceType::General, Coord::new(2, 3)).unwrap();
        place_piece(&mut state, 1, PieceType::Cavalry, Coord::new(0, 0)).unwrap();

        let err = end_turn(&mut state, 1).unwrap_err();
        assert_eq!(
            err,
            RuleError::QuotaNotMet {
                placed: 2,
                required: 4
            }
        );
        assert_eq!(state.phase, Phase::Placement);
        assert_eq!(state.current_player, 1);
    }

    #[test]
    fn test_two_placement_rounds_reach_battle() {
        let mut state = GameState::new(plain_config());
        state.begin();

        for turn in 0..PLACEMENT_TURNS {
            let seat = if turn % 2 == 0 { 1 } else { 2 };
            assert_eq!(state.current_player, seat);
            fill_quota(&mut state, seat);
            end_turn(&mut state, seat).unwrap();
        }

        assert_eq!(state.phase, Phase::Battle);
        assert_eq!(state.current_player, 1);
        assert_eq!(state.roster_total(1), 0);
        assert_eq!(state.roster_total(2), 0);
        assert_eq!(state.board.piece_count(1), 10);
        assert_eq!(state.board.piece_count(2), 10);
    }

    #[test]
    fn test_placement_rejections() {
        let mut state = GameState::new(plain_config());
        state.begin();

        // Outside the deployment band (depth 3 on a height-7 board).
        assert_eq!(
            place_piece(&mut state, 1, PieceType::Archer, Coord::new(3, 0)),
            Err(RuleError::OutsideDeploymentZone)
        );
        // Off the board entirely.
        assert_eq!(
            place_piece(&mut state, 1, PieceType::Archer, Coord::new(-1, 0)),
            Err(RuleError::OutOfBounds)
        );
        // Occupied cell.
        place_piece(&mut state, 1, PieceType::Archer, Coord::new(0, 0)).unwrap();
        assert_eq!(
            place_piece(&mut state, 1, PieceType::Archer, Coord::new(0, 0)),
            Err(RuleError::CellOccupied)
        );
        // Roster exhausted: only one General available.
        place_piece(&mut state, 1, PieceType::General, Coord::new(0, 1)).unwrap();
        assert_eq!(
            place_piece(&mut state, 1, PieceType::General, Coord::new(0, 2)),
            Err(RuleError::RosterExhausted("General"))
        );
        // Quota exhausted on the fifth placement of round one.
        place_piece(&mut state, 1, PieceType::Cavalry, Coord::new(0, 3)).unwrap();
        place_piece(&mut state, 1, PieceType::Cavalry, Coord::new(0, 4)).unwrap();
        assert_eq!(
            place_piece(&mut state, 1, PieceType::Archer, Coord::new(0, 5)),
            Err(RuleError::QuotaExceeded)
        );
        // Opponent cannot place out of turn.
        assert_eq!(
            place_piece(&mut state, 2, PieceType::Archer, Coord::new(6, 0)),
            Err(RuleError::NotYourTurn)
        );
    }

    // ------------------------------------------------------------------
    // Movement
    // ------------------------------------------------------------------

    #[test]
    fn test_single_step_and_illegal_moves() {
        let mut state = battle_state();
        put(&mut state, PieceType::LightInfantry, 1, 3, 3);

        // Diagonal without the ability is illegal.
        assert_eq!(
            move_piece(&mut state, 1, Coord::new(3, 3), Coord::new(4, 4)),
            Err(RuleError::IllegalMove)
        );
        // Two cells for a one-step piece is illegal.
        assert_eq!(
            move_piece(&mut state, 1, Coord::new(3, 3), Coord::new(3, 5)),
            Err(RuleError::IllegalMove)
        );
        let report = move_piece(&mut state, 1, Coord::new(3, 3), Coord::new(3, 4)).unwrap();
        assert!(!report.healed);
        assert!(state.has_moved);
        assert_eq!(state.selected, Some(Coord::new(3, 4)));
    }

    #[test]
    fn test_cavalry_leaps_over_occupied_cell() {
        let mut state = battle_state();
        put(&mut state, PieceType::Cavalry, 1, 2, 2);
        put(&mut state, PieceType::LightInfantry, 2, 2, 3);

        move_piece(&mut state, 1, Coord::new(2, 2), Coord::new(2, 4)).unwrap();
        let piece = state.board.piece_at(Coord::new(2, 4)).unwrap();
        assert_eq!(piece.charge_dir, Some((0, 1)));
    }

    #[test]
    fn test_move_to_occupied_cell_rejected() {
        let mut state = battle_state();
        put(&mut state, PieceType::Cavalry, 1, 2, 2);
        put(&mut state, PieceType::LightInfantry, 2, 2, 4);

        assert_eq!(
            move_piece(&mut state, 1, Coord::new(2, 2), Coord::new(2, 4)),
            Err(RuleError::CellOccupied)
        );
    }

    #[test]
    fn test_second_move_rejected() {
        let mut state = battle_state();
        put(&mut state, PieceType::LightInfantry, 1, 3, 3);

        move_piece(&mut state, 1, Coord::new(3, 3), Coord::new(3, 4)).unwrap();
        assert_eq!(
            move_piece(&mut state, 1, Coord::new(3, 4), Coord::new(3, 5)),
            Err(RuleError::AlreadyMoved)
        );
    }

    #[test]
    fn test_diagonal_infantry_ability() {
        let mut state = battle_state();
        put_nation(
            &mut state,
            PieceType::LightInfantry,
            1,
            3,
            3,
            Some(NationId::Kargath),
        );
        move_piece(&mut state, 1, Coord::new(3, 3), Coord::new(4, 4)).unwrap();
        assert!(state.board.piece_at(Coord::new(4, 4)).is_some());
    }

    #[test]
    fn test_fleet_general_rides_two_cells() {
        let mut state = battle_state();
        put_nation(&mut state, PieceType::General, 1, 3, 3, Some(NationId::Vesryn));
        move_piece(&mut state, 1, Coord::new(3, 3), Coord::new(5, 3)).unwrap();
        assert_eq!(
            state.board.piece_at(Coord::new(5, 3)).unwrap().charge_dir,
            Some((1, 0))
        );

        let mut state = battle_state();
        put(&mut state, PieceType::General, 1, 3, 3);
        assert_eq!(
            move_piece(&mut state, 1, Coord::new(3, 3), Coord::new(5, 3)),
            Err(RuleError::IllegalMove)
        );
    }

    // ------------------------------------------------------------------
    // Charge
    // ------------------------------------------------------------------

    #[test]
    fn test_charge_doubles_damage_against_soft_target() {
        let mut state = battle_state();
        put(&mut state, PieceType::Cavalry, 1, 2, 4);
        put(&mut state, PieceType::LightInfantry, 2, 2, 1);

        move_piece(&mut state, 1, Coord::new(2, 4), Coord::new(2, 2)).unwrap();
        let report = attack(&mut state, 1, Coord::new(2, 2), Coord::new(2, 1)).unwrap();
        assert_eq!(report.damage, 2);
        assert!(report.charged);
        assert!(report.killed);
        assert!(state.board.piece_at(Coord::new(2, 1)).is_none());
    }

    #[test]
    fn test_charge_blunted_by_heavy_target() {
        let mut state = battle_state();
        put(&mut state, PieceType::Cavalry, 1, 2, 4);
        put(&mut state, PieceType::HeavyInfantry, 2, 2, 1);

        move_piece(&mut state, 1, Coord::new(2, 4), Coord::new(2, 2)).unwrap();
        let report = attack(&mut state, 1, Coord::new(2, 2), Coord::new(2, 1)).unwrap();
        assert_eq!(report.damage, 1);
        assert!(!report.charged);
        assert_eq!(state.board.piece_at(Coord::new(2, 1)).unwrap().health, 3);
    }

    #[test]
    fn test_charge_requires_identical_direction() {
        let mut state = battle_state();
        put(&mut state, PieceType::Cavalry, 1, 2, 4);
        put(&mut state, PieceType::LightInfantry, 2, 1, 2);

        move_piece(&mut state, 1, Coord::new(2, 4), Coord::new(2, 2)).unwrap();
        // Charge vector is (0,-1); attacking upward gets no bonus.
        let report = attack(&mut state, 1, Coord::new(2, 2), Coord::new(1, 2)).unwrap();
        assert_eq!(report.damage, 1);
        assert!(!report.charged);
    }

    #[test]
    fn test_charge_cleared_at_end_turn() {
        let mut state = battle_state();
        put(&mut state, PieceType::Cavalry, 1, 2, 4);

        move_piece(&mut state, 1, Coord::new(2, 4), Coord::new(2, 2)).unwrap();
        assert!(state
            .board
            .piece_at(Coord::new(2, 2))
            .unwrap()
            .charge_dir
            .is_some());

        end_turn(&mut state, 1).unwrap();
        assert!(state
            .board
            .piece_at(Coord::new(2, 2))
            .unwrap()
            .charge_dir
            .is_none());
    }

    // ------------------------------------------------------------------
    // Ranged attacks
    // ------------------------------------------------------------------

    #[test]
    fn test_adjacent_attack_ignores_ammo() {
        let mut state = battle_state();
        put(&mut state, PieceType::Archer, 1, 2, 2);
        put(&mut state, PieceType::LightInfantry, 2, 2, 3);
        state.board.piece_at_mut(Coord::new(2, 2)).unwrap().ammo = Some(0);

        let report = attack(&mut state, 1, Coord::new(2, 2), Coord::new(2, 3)).unwrap();
        assert_eq!(report.damage, 1);
        assert_eq!(state.board.piece_at(Coord::new(2, 2)).unwrap().ammo, Some(0));
    }

    #[test]
    fn test_ranged_attack_requires_ammo() {
        let mut state = battle_state();
        put(&mut state, PieceType::Archer, 1, 2, 2);
        put(&mut state, PieceType::LightInfantry, 2, 2, 4);
        state.board.piece_at_mut(Coord::new(2, 2)).unwrap().ammo = Some(0);

        assert_eq!(
            attack(&mut state, 1, Coord::new(2, 2), Coord::new(2, 4)),
            Err(RuleError::NoAmmo)
        );
    }

    #[test]
    fn test_ranged_attack_consumes_one_ammo() {
        let mut state = battle_state();
        put(&mut state, PieceType::Archer, 1, 2, 2);
        put(&mut state, PieceType::HeavyInfantry, 2, 2, 4);

        attack(&mut state, 1, Coord::new(2, 2), Coord::new(2, 4)).unwrap();
        assert_eq!(state.board.piece_at(Coord::new(2, 2)).unwrap().ammo, Some(2));
    }

    #[test]
    fn test_ranged_attack_must_be_straight() {
        let mut state = battle_state();
        put(&mut state, PieceType::Archer, 1, 2, 1);
        put(&mut state, PieceType::LightInfantry, 2, 3, 3);

        assert_eq!(
            attack(&mut state, 1, Coord::new(2, 1), Coord::new(3, 3)),
            Err(RuleError::NotStraightLine)
        );
    }

    #[test]
    fn test_ranged_attack_beyond_range_rejected() {
        let mut state = battle_state();
        put(&mut state, PieceType::Archer, 1, 2, 0);
        put(&mut state, PieceType::LightInfantry, 2, 2, 4);

        assert_eq!(
            attack(&mut state, 1, Coord::new(2, 0), Coord::new(2, 4)),
            Err(RuleError::OutOfRange)
        );
    }

    #[test]
    fn test_limited_range_caps_ability_bonus() {
        let mut state = battle_state();
        state.config.limited_range = true;
        put_nation(&mut state, PieceType::Archer, 1, 2, 0, Some(NationId::Aurelia));
        put(&mut state, PieceType::LightInfantry, 2, 2, 3);

        // Effective range would be 4 with the bonus; the cap is 2.
        assert_eq!(
            attack(&mut state, 1, Coord::new(2, 0), Coord::new(2, 3)),
            Err(RuleError::OutOfRange)
        );

        put(&mut state, PieceType::HeavyInfantry, 2, 2, 2);
        attack(&mut state, 1, Coord::new(2, 0), Coord::new(2, 2)).unwrap();
    }

    #[test]
    fn test_line_of_sight_toggle() {
        let mut state = battle_state();
        put(&mut state, PieceType::Archer, 1, 2, 0);
        put(&mut state, PieceType::LightInfantry, 2, 2, 1);
        put(&mut state, PieceType::HeavyInfantry, 2, 2, 3);

        // Without the toggle the blocker is ignored.
        attack(&mut state, 1, Coord::new(2, 0), Coord::new(2, 3)).unwrap();

        let mut state = battle_state();
        state.config.line_of_sight = true;
        put(&mut state, PieceType::Archer, 1, 2, 0);
        put(&mut state, PieceType::LightInfantry, 2, 2, 1);
        put(&mut state, PieceType::HeavyInfantry, 2, 2, 3);

        assert_eq!(
            attack(&mut state, 1, Coord::new(2, 0), Coord::new(2, 3)),
            Err(RuleError::LineBlocked)
        );
    }

    #[test]
    fn test_extended_range_ability() {
        let mut state = battle_state();
        put_nation(&mut state, PieceType::Archer, 1, 2, 0, Some(NationId::Aurelia));
        put(&mut state, PieceType::LightInfantry, 2, 2, 4);

        attack(&mut state, 1, Coord::new(2, 0), Coord::new(2, 4)).unwrap();
    }

    #[test]
    fn test_kill_shot_saves_ammo() {
        let mut state = battle_state();
        put_nation(&mut state, PieceType::Archer, 1, 2, 0, Some(NationId::Aurelia));
        put(&mut state, PieceType::LightInfantry, 2, 2, 2);
        state.board.piece_at_mut(Coord::new(2, 2)).unwrap().health = 1;

        let report = attack(&mut state, 1, Coord::new(2, 0), Coord::new(2, 2)).unwrap();
        assert!(report.killed);
        assert_eq!(state.board.piece_at(Coord::new(2, 0)).unwrap().ammo, Some(3));
    }

    #[test]
    fn test_kill_shot_without_ability_still_costs_ammo() {
        let mut state = battle_state();
        put(&mut state, PieceType::Archer, 1, 2, 0);
        put(&mut state, PieceType::LightInfantry, 2, 2, 2);
        state.board.piece_at_mut(Coord::new(2, 2)).unwrap().health = 1;

        let report = attack(&mut state, 1, Coord::new(2, 0), Coord::new(2, 2)).unwrap();
        assert!(report.killed);
        assert_eq!(state.board.piece_at(Coord::new(2, 0)).unwrap().ammo, Some(2));
    }

    #[test]
    fn test_second_attack_rejected() {
        let mut state = battle_state();
        put(&mut state, PieceType::LightInfantry, 1, 2, 2);
        put(&mut state, PieceType::HeavyInfantry, 2, 2, 3);

        attack(&mut state, 1, Coord::new(2, 2), Coord::new(2, 3)).unwrap();
        assert_eq!(
            attack(&mut state, 1, Coord::new(2, 2), Coord::new(2, 3)),
            Err(RuleError::AlreadyAttacked)
        );
    }

    #[test]
    fn test_friendly_fire_rejected() {
        let mut state = battle_state();
        put(&mut state, PieceType::LightInfantry, 1, 2, 2);
        put(&mut state, PieceType::Archer, 1, 2, 3);

        assert_eq!(
            attack(&mut state, 1, Coord::new(2, 2), Coord::new(2, 3)),
            Err(RuleError::FriendlyTarget)
        );
    }

    // ------------------------------------------------------------------
    // Ordering policy
    // ------------------------------------------------------------------

    #[test]
    fn test_move_after_attack_blocked_by_default() {
        let mut state = battle_state();
        put(&mut state, PieceType::LightInfantry, 1, 2, 2);
        put(&mut state, PieceType::HeavyInfantry, 2, 2, 3);

        // Attacking without moving first is fine.
        attack(&mut state, 1, Coord::new(2, 2), Coord::new(2, 3)).unwrap();
        assert_eq!(
            move_piece(&mut state, 1, Coord::new(2, 2), Coord::new(1, 2)),
            Err(RuleError::MoveAfterAttack)
        );
    }

    #[test]
    fn test_free_ordering_allows_move_after_attack() {
        let mut state = battle_state();
        state.config.ordering = TurnOrdering::Free;
        put(&mut state, PieceType::LightInfantry, 1, 2, 2);
        put(&mut state, PieceType::HeavyInfantry, 2, 2, 3);

        attack(&mut state, 1, Coord::new(2, 2), Coord::new(2, 3)).unwrap();
        move_piece(&mut state, 1, Coord::new(2, 2), Coord::new(1, 2)).unwrap();
    }

    // ------------------------------------------------------------------
    // Healing
    // ------------------------------------------------------------------

    #[test]
    fn test_home_row_heals_once() {
        let mut state = battle_state();
        put(&mut state, PieceType::Archer, 1, 1, 0);
        {
            let piece = state.board.piece_at_mut(Coord::new(1, 0)).unwrap();
            piece.health = 1;
            piece.ammo = Some(0);
        }

        let report = move_piece(&mut state, 1, Coord::new(1, 0), Coord::new(0, 0)).unwrap();
        assert!(report.healed);
        {
            let piece = state.board.piece_at(Coord::new(0, 0)).unwrap();
            assert_eq!(piece.health, 2);
            assert_eq!(piece.ammo, Some(3));
            assert!(piece.has_been_replenished);
        }

        // Walk away and return; the one-way flag blocks a second heal.
        end_turn(&mut state, 1).unwrap();
        end_turn(&mut state, 2).unwrap();
        move_piece(&mut state, 1, Coord::new(0, 0), Coord::new(1, 0)).unwrap();
        end_turn(&mut state, 1).unwrap();
        end_turn(&mut state, 2).unwrap();
        state.board.piece_at_mut(Coord::new(1, 0)).unwrap().health = 1;

        let report = move_piece(&mut state, 1, Coord::new(1, 0), Coord::new(0, 0)).unwrap();
        assert!(!report.healed);
        assert_eq!(state.board.piece_at(Coord::new(0, 0)).unwrap().health, 1);
    }

    #[test]
    fn test_general_never_heals() {
        let mut state = battle_state();
        put(&mut state, PieceType::General, 1, 1, 0);
        state.board.piece_at_mut(Coord::new(1, 0)).unwrap().health = 2;

        let report = move_piece(&mut state, 1, Coord::new(1, 0), Coord::new(0, 0)).unwrap();
        assert!(!report.healed);
        assert_eq!(state.board.piece_at(Coord::new(0, 0)).unwrap().health, 2);
    }

    #[test]
    fn test_seat_two_heals_on_far_row() {
        let mut state = battle_state();
        state.current_player = 2;
        put(&mut state, PieceType::LightInfantry, 2, 5, 3);
        state.board.piece_at_mut(Coord::new(5, 3)).unwrap().health = 1;

        let report = move_piece(&mut state, 2, Coord::new(5, 3), Coord::new(6, 3)).unwrap();
        assert!(report.healed);
        assert_eq!(state.board.piece_at(Coord::new(6, 3)).unwrap().health, 2);
    }

    // ------------------------------------------------------------------
    // Cleave
    // ------------------------------------------------------------------

    #[test]
    fn test_cleave_splashes_in_fixed_order() {
        let mut state = battle_state();
        put_nation(
            &mut state,
            PieceType::HeavyInfantry,
            1,
            3,
            3,
            Some(NationId::Kargath),
        );
        put(&mut state, PieceType::LightInfantry, 2, 3, 4); // primary
        put(&mut state, PieceType::LightInfantry, 2, 2, 3); // up: survives
        put(&mut state, PieceType::Archer, 2, 4, 3); // down: dies at 1 hp
        put(&mut state, PieceType::Archer, 1, 3, 2); // left: friendly, spared
        state.board.piece_at_mut(Coord::new(4, 3)).unwrap().health = 1;

        let report = attack(&mut state, 1, Coord::new(3, 3), Coord::new(3, 4)).unwrap();
        assert_eq!(report.cleave_hits.len(), 2);
        assert_eq!(report.cleave_hits[0].at, Coord::new(2, 3));
        assert!(!report.cleave_hits[0].killed);
        assert_eq!(report.cleave_hits[1].at, Coord::new(4, 3));
        assert!(report.cleave_hits[1].killed);

        assert_eq!(state.board.piece_at(Coord::new(2, 3)).unwrap().health, 1);
        assert!(state.board.piece_at(Coord::new(4, 3)).is_none());
        assert_eq!(state.board.piece_at(Coord::new(3, 2)).unwrap().health, 2);
    }

    #[test]
    fn test_cleave_requires_ability() {
        let mut state = battle_state();
        put(&mut state, PieceType::HeavyInfantry, 1, 3, 3);
        put(&mut state, PieceType::LightInfantry, 2, 3, 4);
        put(&mut state, PieceType::LightInfantry, 2, 2, 3);

        let report = attack(&mut state, 1, Coord::new(3, 3), Coord::new(3, 4)).unwrap();
        assert!(report.cleave_hits.is_empty());
        assert_eq!(state.board.piece_at(Coord::new(2, 3)).unwrap().health, 2);
    }

    #[test]
    fn test_cleave_kill_of_general_ends_match() {
        let mut state = battle_state();
        put_nation(
            &mut state,
            PieceType::HeavyInfantry,
            1,
            3,
            3,
            Some(NationId::Kargath),
        );
        put(&mut state, PieceType::LightInfantry, 2, 3, 4);
        put(&mut state, PieceType::General, 2, 2, 3);
        state.board.piece_at_mut(Coord::new(2, 3)).unwrap().health = 1;

        let report = attack(&mut state, 1, Coord::new(3, 3), Coord::new(3, 4)).unwrap();
        assert_eq!(report.winner, Some(1));
        assert_eq!(state.phase, Phase::Ended);
        assert_eq!(state.winner, Some(1));
    }

    // ------------------------------------------------------------------
    // Victory
    // ------------------------------------------------------------------

    #[test]
    fn test_general_death_ends_match_and_locks_it() {
        let mut state = battle_state();
        put(&mut state, PieceType::LightInfantry, 1, 2, 2);
        put(&mut state, PieceType::General, 2, 2, 3);
        state.board.piece_at_mut(Coord::new(2, 3)).unwrap().health = 1;

        let report = attack(&mut state, 1, Coord::new(2, 2), Coord::new(2, 3)).unwrap();
        assert!(report.killed);
        assert_eq!(report.winner, Some(1));
        assert_eq!(state.phase, Phase::Ended);
        assert_eq!(state.winner, Some(1));

        assert_eq!(end_turn(&mut state, 1), Err(RuleError::MatchEnded));
        assert_eq!(
            select_cell(&mut state, 1, Coord::new(2, 2)),
            Err(RuleError::MatchEnded)
        );
        assert_eq!(
            attack(&mut state, 1, Coord::new(2, 2), Coord::new(2, 3)),
            Err(RuleError::MatchEnded)
        );
    }

    // ------------------------------------------------------------------
    // End turn, selection, toggles, nations
    // ------------------------------------------------------------------

    #[test]
    fn test_battle_end_turn_resets_flags() {
        let mut state = battle_state();
        put(&mut state, PieceType::LightInfantry, 1, 2, 2);
        put(&mut state, PieceType::HeavyInfantry, 2, 2, 3);

        attack(&mut state, 1, Coord::new(2, 2), Coord::new(2, 3)).unwrap();
        let report = end_turn(&mut state, 1).unwrap();
        assert_eq!(report.next_player, 2);
        assert!(!state.has_moved);
        assert!(!state.has_attacked);
        assert!(state.selected.is_none());
    }

    #[test]
    fn test_select_cell_flow() {
        let mut state = battle_state();
        state.config.ordering = TurnOrdering::Free;
        put(&mut state, PieceType::Cavalry, 1, 2, 2);
        put(&mut state, PieceType::LightInfantry, 1, 1, 1);
        put(&mut state, PieceType::LightInfantry, 2, 2, 3);

        // Empty cell with no cursor.
        assert_eq!(
            select_cell(&mut state, 1, Coord::new(4, 4)),
            Err(RuleError::EmptyCell)
        );
        // Enemy piece with no cursor.
        assert_eq!(
            select_cell(&mut state, 1, Coord::new(2, 3)),
            Err(RuleError::NotYourPiece)
        );
        // Select, deselect, reselect.
        assert_eq!(
            select_cell(&mut state, 1, Coord::new(2, 2)).unwrap(),
            SelectOutcome::Selected(Coord::new(2, 2))
        );
        assert_eq!(
            select_cell(&mut state, 1, Coord::new(2, 2)).unwrap(),
            SelectOutcome::Deselected
        );
        select_cell(&mut state, 1, Coord::new(2, 2)).unwrap();
        assert_eq!(
            select_cell(&mut state, 1, Coord::new(1, 1)).unwrap(),
            SelectOutcome::Selected(Coord::new(1, 1))
        );
        // Attack through the cursor.
        select_cell(&mut state, 1, Coord::new(2, 2)).unwrap();
        match select_cell(&mut state, 1, Coord::new(2, 3)).unwrap() {
            SelectOutcome::Attacked(report) => assert_eq!(report.damage, 1),
            other => panic!("expected attack, got {:?}", other),
        }
        // Move through the cursor.
        match select_cell(&mut state, 1, Coord::new(2, 1)).unwrap() {
            SelectOutcome::Moved(report) => assert_eq!(report.to, Coord::new(2, 1)),
            other => panic!("expected move, got {:?}", other),
        }
    }

    #[test]
    fn test_select_cell_places_during_placement() {
        let mut state = GameState::new(plain_config());
        state.begin();

        assert_eq!(
            select_cell(&mut state, 1, Coord::new(0, 0)),
            Err(RuleError::NoPieceTypeSelected)
        );
        select_piece_type(&mut state, 1, PieceType::Archer).unwrap();
        assert_eq!(
            select_cell(&mut state, 1, Coord::new(0, 0)).unwrap(),
            SelectOutcome::Placed(Coord::new(0, 0))
        );
        assert_eq!(state.board.piece_count(1), 1);
    }

    #[test]
    fn test_toggles_lock_once_battle_begins() {
        let mut state = GameState::new(plain_config());
        state.begin();

        toggle_option(&mut state, RuleToggle::LineOfSight).unwrap();
        assert!(state.config.line_of_sight);
        toggle_option(&mut state, RuleToggle::MoveBeforeAttack).unwrap();
        assert_eq!(state.config.ordering, TurnOrdering::Free);

        state.phase = Phase::Battle;
        assert_eq!(
            toggle_option(&mut state, RuleToggle::LimitedRange),
            Err(RuleError::OptionsLocked)
        );
    }

    #[test]
    fn test_nation_selection() {
        let mut state = GameState::new(RuleConfig::default());
        state.begin();
        assert_eq!(state.phase, Phase::NationSelection);

        select_nation(&mut state, 1, NationId::Aurelia).unwrap();
        assert_eq!(state.roster_total(1), 10);
        assert_eq!(state.phase, Phase::NationSelection);

        assert_eq!(
            select_nation(&mut state, 2, NationId::Aurelia),
            Err(RuleError::NationTaken)
        );
        select_nation(&mut state, 2, NationId::Kargath).unwrap();
        assert_eq!(state.phase, Phase::Placement);
        assert_eq!(state.current_player, 1);

        // Locked once selection is over.
        assert_eq!(
            select_nation(&mut state, 1, NationId::Vesryn),
            Err(RuleError::WrongPhase(Phase::Placement))
        );
    }

    #[test]
    fn test_wrong_phase_and_wrong_turn() {
        let mut state = GameState::new(plain_config());
        state.begin();

        assert_eq!(
            move_piece(&mut state, 1, Coord::new(0, 0), Coord::new(1, 0)),
            Err(RuleError::WrongPhase(Phase::Placement))
        );
        assert_eq!(end_turn(&mut state, 2), Err(RuleError::NotYourTurn));
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    proptest! {
        #[test]
        fn prop_placement_preserves_rosters_and_zones(
            ops in proptest::collection::vec(
                (1u8..=2, 0usize..6, 0i8..7, 0i8..7, proptest::bool::weighted(0.15)),
                0..80,
            )
        ) {
            let mut state = GameState::new(RuleConfig {
                nations_enabled: false,
                ..Default::default()
            });
            state.begin();

            for (seat, kind_idx, row, col, end) in ops {
                if end {
                    let _ = end_turn(&mut state, seat);
                } else {
                    let kind = PieceType::ALL[kind_idx];
                    let _ = place_piece(&mut state, seat, kind, Coord::new(row, col));
                }
            }

            for seat in [1u8, 2] {
                // Placed plus unplaced always accounts for the full roster.
                prop_assert_eq!(
                    state.board.piece_count(seat) + state.roster_total(seat) as usize,
                    10
                );
                // Every placed piece sits in its owner's deployment band.
                for (at, piece) in state.board.pieces() {
                    if piece.owner == seat {
                        prop_assert!(state.board.in_deployment_zone(seat, at));
                    }
                }
            }
            prop_assert!(state.pieces_placed_this_turn <= state.required_quota());
        }
    }
}
