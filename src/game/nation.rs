//! Nation Catalog
//!
//! Immutable capability profiles for the asymmetric-faction variant.
//! A nation is a starting roster plus a set of named ability flags
//! consulted by the rule engine at movement/combat decision points.

use serde::{Deserialize, Serialize};

use crate::game::piece::PieceType;

/// Nation identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NationId {
    /// Archer doctrine: longer bows, thrifty quivers.
    Aurelia,
    /// Infantry doctrine: cleaving axes, loose formations.
    Kargath,
    /// Cavalry doctrine: a general who rides with the vanguard.
    Vesryn,
}

/// Named rule modifiers granted by a nation to specific piece types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Ability {
    /// +1 attack range for ranged pieces.
    ExtendedArcherRange,
    /// Ranged shots against targets already at 1 health cost no ammo.
    AmmoSavingKillShot,
    /// Melee attacks splash 1 damage to enemies adjacent to the attacker.
    CleaveOnMelee,
    /// Light infantry may step one cell diagonally.
    DiagonalInfantry,
    /// The general moves up to two cells like cavalry.
    FleetGeneral,
}

/// A catalog entry. Immutable; never per-match state.
#[derive(Clone, Copy, Debug)]
pub struct Nation {
    /// Identifier.
    pub id: NationId,
    /// Display name.
    pub name: &'static str,
    /// Starting roster: piece type and count.
    pub roster: &'static [(PieceType, u8)],
    /// Ability flags this nation grants.
    pub abilities: &'static [Ability],
}

const AURELIA: Nation = Nation {
    id: NationId::Aurelia,
    name: "Aurelia",
    roster: &[
        (PieceType::General, 1),
        (PieceType::Cavalry, 1),
        (PieceType::HeavyInfantry, 1),
        (PieceType::LightInfantry, 3),
        (PieceType::Archer, 2),
        (PieceType::HorseArcher, 2),
    ],
    abilities: &[Ability::ExtendedArcherRange, Ability::AmmoSavingKillShot],
};

const KARGATH: Nation = Nation {
    id: NationId::Kargath,
    name: "Kargath",
    roster: &[
        (PieceType::General, 1),
        (PieceType::Cavalry, 1),
        (PieceType::HeavyInfantry, 3),
        (PieceType::LightInfantry, 4),
        (PieceType::Archer, 1),
    ],
    abilities: &[Ability::CleaveOnMelee, Ability::DiagonalInfantry],
};

const VESRYN: Nation = Nation {
    id: NationId::Vesryn,
    name: "Vesryn",
    roster: &[
        (PieceType::General, 1),
        (PieceType::Cavalry, 3),
        (PieceType::HeavyInfantry, 1),
        (PieceType::LightInfantry, 2),
        (PieceType::Archer, 1),
        (PieceType::HorseArcher, 2),
    ],
    abilities: &[Ability::FleetGeneral],
};

/// Roster used when nations are disabled: both seats field the same army.
pub const DEFAULT_ROSTER: &[(PieceType, u8)] = &[
    (PieceType::General, 1),
    (PieceType::Cavalry, 2),
    (PieceType::HeavyInfantry, 2),
    (PieceType::LightInfantry, 3),
    (PieceType::Archer, 2),
];

impl NationId {
    /// Every nation in the catalog.
    pub const ALL: [NationId; 3] = [NationId::Aurelia, NationId::Kargath, NationId::Vesryn];

    /// Catalog entry for this nation.
    pub fn catalog(self) -> &'static Nation {
        match self {
            NationId::Aurelia => &AURELIA,
            NationId::Kargath => &KARGATH,
            NationId::Vesryn => &VESRYN,
        }
    }
}

/// Whether an ability flag is meaningful for a given piece type.
/// Abilities are nation-scoped but only modify specific pieces.
pub fn ability_applies(ability: Ability, kind: PieceType) -> bool {
    match ability {
        Ability::ExtendedArcherRange | Ability::AmmoSavingKillShot => {
            matches!(kind, PieceType::Archer | PieceType::HorseArcher)
        }
        Ability::CleaveOnMelee => matches!(kind, PieceType::HeavyInfantry),
        Ability::DiagonalInfantry => matches!(kind, PieceType::LightInfantry),
        Ability::FleetGeneral => matches!(kind, PieceType::General),
    }
}
