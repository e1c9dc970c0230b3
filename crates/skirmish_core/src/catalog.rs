//! Unit archetypes and tier scaling.
//!
//! Every unit in a battle is an instance of one of four archetypes at
//! a tier between [`MIN_TIER`] and [`MAX_TIER`]. Base stats are fixed
//! per archetype; tiers scale hit points, attack and defense through
//! an integer multiplier table. Speed and range are archetype traits
//! and never scale.

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, Result};

/// Lowest valid unit tier.
pub const MIN_TIER: u8 = 1;

/// Highest valid unit tier.
pub const MAX_TIER: u8 = 6;

/// Per-tier stat multiplier in tenths, indexed by `tier - 1`.
///
/// Tier 1 is the baseline; tier 6 is twelve times it.
const TIER_MULTIPLIER_TENTHS: [u32; 6] = [10, 18, 30, 50, 80, 120];

/// The four unit archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// Balanced melee line unit.
    Infantry,
    /// Slow, hard-hitting, heavily armored melee unit.
    Armor,
    /// Fast, fragile, long-ranged flyer.
    Air,
    /// Mid-ranged support unit.
    Specialist,
}

impl UnitKind {
    /// Human-readable archetype name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Infantry => "Infantry",
            Self::Armor => "Armor",
            Self::Air => "Air",
            Self::Specialist => "Specialist",
        }
    }
}

/// Resolved combat statistics for a unit archetype at some tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStats {
    /// Maximum hit points.
    pub max_hp: u32,
    /// Raw damage per attack, before the target's mitigation.
    pub attack: u32,
    /// Flat mitigation stat. Each 10 points absorb 1 damage.
    pub defense: u32,
    /// Movement speed in pixels per second.
    pub speed: u32,
    /// Attack range in tiles. Range 1 is melee.
    pub range: u32,
}

/// Base (tier 1) statistics for an archetype.
#[must_use]
pub const fn base_stats(kind: UnitKind) -> UnitStats {
    match kind {
        UnitKind::Infantry => UnitStats {
            max_hp: 100,
            attack: 10,
            defense: 14,
            speed: 80,
            range: 1,
        },
        UnitKind::Armor => UnitStats {
            max_hp: 120,
            attack: 18,
            defense: 8,
            speed: 50,
            range: 1,
        },
        UnitKind::Air => UnitStats {
            max_hp: 60,
            attack: 8,
            defense: 6,
            speed: 100,
            range: 5,
        },
        UnitKind::Specialist => UnitStats {
            max_hp: 80,
            attack: 6,
            defense: 10,
            speed: 70,
            range: 3,
        },
    }
}

/// Statistics for an archetype at the given tier.
///
/// Hit points, attack and defense are scaled by the tier multiplier
/// with round-half-up integer arithmetic, so equal inputs resolve to
/// the same stats on every platform. Speed and range pass through
/// unscaled.
///
/// # Errors
///
/// Returns [`BattleError::InvalidTier`] if `tier` is outside
/// [`MIN_TIER`]..=[`MAX_TIER`].
pub fn stats_for(kind: UnitKind, tier: u8) -> Result<UnitStats> {
    if !(MIN_TIER..=MAX_TIER).contains(&tier) {
        return Err(BattleError::InvalidTier {
            tier,
            min: MIN_TIER,
            max: MAX_TIER,
        });
    }

    let tenths = TIER_MULTIPLIER_TENTHS[usize::from(tier - 1)];
    let scale = |value: u32| (value * tenths + 5) / 10;

    let base = base_stats(kind);
    Ok(UnitStats {
        max_hp: scale(base.max_hp),
        attack: scale(base.attack),
        defense: scale(base.defense),
        speed: base.speed,
        range: base.range,
    })
}

/// One slot of a five-unit deck: an archetype at a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckEntry {
    /// Archetype to field.
    pub kind: UnitKind,
    /// Tier within [`MIN_TIER`]..=[`MAX_TIER`].
    pub tier: u8,
}

impl DeckEntry {
    /// Create a deck entry.
    #[must_use]
    pub const fn new(kind: UnitKind, tier: u8) -> Self {
        Self { kind, tier }
    }

    /// Resolve this entry's stats, validating the tier.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidTier`] for an out-of-range tier.
    pub fn stats(&self) -> Result<UnitStats> {
        stats_for(self.kind, self.tier)
    }
}
