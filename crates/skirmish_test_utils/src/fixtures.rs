//! Test fixtures and helpers.
//!
//! Pre-built decks, configurations and battles
//! for consistent testing.

use fixed::types::I32F32;

use skirmish_core::battle::{Battle, BattleConfig};
use skirmish_core::catalog::{DeckEntry, UnitKind};
use skirmish_core::commands::BattleMode;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// A deck with one unit of every archetype plus a second Infantry,
/// all at the given tier. Mirrors the enemy lineup at tier 1.
#[must_use]
pub fn tiered_deck(tier: u8) -> [DeckEntry; 5] {
    [
        DeckEntry::new(UnitKind::Infantry, tier),
        DeckEntry::new(UnitKind::Infantry, tier),
        DeckEntry::new(UnitKind::Armor, tier),
        DeckEntry::new(UnitKind::Air, tier),
        DeckEntry::new(UnitKind::Specialist, tier),
    ]
}

/// The balanced tier-1 deck used by most tests.
#[must_use]
pub fn balanced_deck() -> [DeckEntry; 5] {
    tiered_deck(1)
}

/// An attack-mode configuration with the balanced deck.
#[must_use]
pub fn attack_config(time_limit_secs: u32) -> BattleConfig {
    BattleConfig {
        deck: balanced_deck(),
        mode: BattleMode::Attack,
        time_limit_secs,
    }
}

/// A defense-mode configuration with the balanced deck.
#[must_use]
pub fn defense_config(time_limit_secs: u32) -> BattleConfig {
    BattleConfig {
        deck: balanced_deck(),
        mode: BattleMode::Defense,
        time_limit_secs,
    }
}

/// A battle built from the configuration and started, ready to tick.
///
/// # Panics
///
/// Panics if the configuration is invalid. Test fixtures are always
/// built from valid configurations.
#[must_use]
pub fn started_battle(config: BattleConfig) -> Battle {
    let mut battle = Battle::new(config).expect("fixture config must be valid");
    battle.start().expect("fixture battle must start");
    battle
}
