//! Piece Types and Instances
//!
//! Piece type is a closed enumeration with an associated rule record;
//! the rule engine dispatches on the record, not on type identity
//! checks scattered through logic.

use serde::{Deserialize, Serialize};

use crate::game::nation::{ability_applies, Ability, NationId};

/// The closed set of piece types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PieceType {
    /// The commander. Losing it loses the match.
    General,
    /// Fast melee piece able to leap two cells and charge.
    Cavalry,
    /// Slow, shielded melee piece. Immune to charge bonus damage.
    HeavyInfantry,
    /// Cheap one-step melee piece.
    LightInfantry,
    /// Ranged piece with limited ammunition.
    Archer,
    /// Mounted ranged piece: shorter reach, longer stride.
    HorseArcher,
}

/// Static movement/combat profile for a piece type.
#[derive(Clone, Copy, Debug)]
pub struct PieceRules {
    /// Maximum cells moved in a straight orthogonal line.
    pub move_range: u8,
    /// Base attack range in cells along a straight line.
    pub attack_range: u8,
    /// Starting and maximum health.
    pub max_health: i8,
    /// Ammunition pool for ranged attacks, if any.
    pub ammo: Option<u8>,
    /// Heavy/shielded pieces take no charge bonus damage.
    pub heavy: bool,
}

impl PieceType {
    /// All piece types, in roster display order.
    pub const ALL: [PieceType; 6] = [
        PieceType::General,
        PieceType::Cavalry,
        PieceType::HeavyInfantry,
        PieceType::LightInfantry,
        PieceType::Archer,
        PieceType::HorseArcher,
    ];

    /// Rule record for this type.
    pub const fn rules(self) -> PieceRules {
        match self {
            PieceType::General => PieceRules {
                move_range: 1,
                attack_range: 1,
                max_health: 5,
                ammo: None,
                heavy: false,
            },
            PieceType::Cavalry => PieceRules {
                move_range: 2,
                attack_range: 1,
                max_health: 3,
                ammo: None,
                heavy: false,
            },
            PieceType::HeavyInfantry => PieceRules {
                move_range: 1,
                attack_range: 1,
                max_health: 4,
                ammo: None,
                heavy: true,
            },
            PieceType::LightInfantry => PieceRules {
                move_range: 1,
                attack_range: 1,
                max_health: 2,
                ammo: None,
                heavy: false,
            },
            PieceType::Archer => PieceRules {
                move_range: 1,
                attack_range: 3,
                max_health: 2,
                ammo: Some(3),
                heavy: false,
            },
            PieceType::HorseArcher => PieceRules {
                move_range: 2,
                attack_range: 2,
                max_health: 2,
                ammo: Some(2),
                heavy: false,
            },
        }
    }

    /// Human-readable name for advisory messages.
    pub fn display_name(self) -> &'static str {
        match self {
            PieceType::General => "General",
            PieceType::Cavalry => "Cavalry",
            PieceType::HeavyInfantry => "Heavy Infantry",
            PieceType::LightInfantry => "Light Infantry",
            PieceType::Archer => "Archer",
            PieceType::HorseArcher => "Horse Archer",
        }
    }
}

/// A piece on the board.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Piece {
    /// Piece type.
    pub kind: PieceType,
    /// Owning seat number (1 or 2).
    pub owner: u8,
    /// Current health. Reaching 0 removes the piece.
    pub health: i8,
    /// Remaining ammunition for ranged attacks.
    pub ammo: Option<u8>,
    /// One-way flag: set once the piece has healed at its home row.
    pub has_been_replenished: bool,
    /// Unit direction of a just-completed two-cell move. Cleared at
    /// every end-turn.
    pub charge_dir: Option<(i8, i8)>,
    /// Nation that fielded this piece; selects the ability variant.
    pub nation: Option<NationId>,
}

impl Piece {
    /// Create a fresh piece at full health and ammo.
    pub fn new(kind: PieceType, owner: u8, nation: Option<NationId>) -> Self {
        let rules = kind.rules();
        Self {
            kind,
            owner,
            health: rules.max_health,
            ammo: rules.ammo,
            has_been_replenished: false,
            charge_dir: None,
            nation,
        }
    }

    /// Whether this piece's nation grants `ability` to its type.
    pub fn has_ability(&self, ability: Ability) -> bool {
        match self.nation {
            Some(nation) => {
                nation.catalog().abilities.contains(&ability) && ability_applies(ability, self.kind)
            }
            None => false,
        }
    }

    /// Movement range with abilities applied.
    pub fn move_range(&self) -> u8 {
        if self.has_ability(Ability::FleetGeneral) {
            2
        } else {
            self.kind.rules().move_range
        }
    }

    /// Attack range with abilities applied (before any ruleset cap).
    pub fn attack_range(&self) -> u8 {
        let base = self.kind.rules().attack_range;
        if self.has_ability(Ability::ExtendedArcherRange) {
            base + 1
        } else {
            base
        }
    }

    /// Whether this piece may step one cell diagonally.
    pub fn can_move_diagonally(&self) -> bool {
        self.has_ability(Ability::DiagonalInfantry)
    }

    /// Restore full health and ammo. Caller enforces the once-per-match
    /// rule via [`Piece::has_been_replenished`].
    pub fn replenish(&mut self) {
        let rules = self.kind.rules();
        self.health = rules.max_health;
        self.ammo = rules.ammo;
        self.has_been_replenished = true;
    }
}
