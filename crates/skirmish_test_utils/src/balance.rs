//! Balance analysis utilities for headless battle runs.
//!
//! This module provides tools for reasoning about unit matchups and
//! for aggregating the outcomes of many simulated battles, so that
//! deck and tier changes can be checked against win-rate targets.

use skirmish_core::catalog::DeckEntry;
use skirmish_core::error::Result;
use skirmish_core::events::{BattleOutcome, BattleResult};
use skirmish_core::math::Fixed;
use skirmish_core::units::{MELEE_INTERVAL_TICKS, RANGED_INTERVAL_TICKS};

/// Aggregated statistics for a set of battles.
#[derive(Debug, Clone, Default)]
pub struct BattleStats {
    /// Total battles recorded.
    pub total_battles: u32,
    /// Battles the player won.
    pub wins: u32,
    /// Battles the player lost.
    pub losses: u32,
    total_survivors: u64,
    total_elapsed_secs: u64,
}

impl BattleStats {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one battle result into the statistics.
    pub fn record(&mut self, result: &BattleResult) {
        self.total_battles += 1;
        match result.outcome {
            BattleOutcome::Victory => self.wins += 1,
            BattleOutcome::Defeat => self.losses += 1,
        }
        self.total_survivors += u64::from(result.survivors);
        self.total_elapsed_secs += u64::from(result.elapsed_secs);
    }

    /// Player win rate (0.0 to 1.0).
    pub fn win_rate(&self) -> f64 {
        if self.total_battles == 0 {
            return 0.5;
        }
        f64::from(self.wins) / f64::from(self.total_battles)
    }

    /// Average surviving player units per battle.
    pub fn average_survivors(&self) -> f64 {
        if self.total_battles == 0 {
            return 0.0;
        }
        self.total_survivors as f64 / f64::from(self.total_battles)
    }

    /// Average battle duration in seconds.
    pub fn average_elapsed_secs(&self) -> f64 {
        if self.total_battles == 0 {
            return 0.0;
        }
        self.total_elapsed_secs as f64 / f64::from(self.total_battles)
    }

    /// Check if the win rate falls inside an acceptable range.
    pub fn is_balanced(&self, min_rate: f64, max_rate: f64) -> bool {
        let rate = self.win_rate();
        rate >= min_rate && rate <= max_rate
    }
}

/// Damage one hit deals, using the engine's mitigation rule: defense
/// shaves off a tenth of itself, floored at 1 damage.
fn damage_per_hit(attack: u32, defense: u32) -> Fixed {
    let mitigation = Fixed::from_num(defense) / Fixed::from_num(10);
    (Fixed::from_num(attack) - mitigation).max(Fixed::ONE)
}

/// Ticks for an uninterrupted attacker to kill a defender, assuming
/// the first hit lands immediately and the rest on cooldown.
///
/// # Errors
///
/// Returns an error if either entry has an out-of-range tier.
pub fn ticks_to_kill(attacker: DeckEntry, defender: DeckEntry) -> Result<u64> {
    let attacker_stats = attacker.stats()?;
    let defender_stats = defender.stats()?;

    let per_hit = damage_per_hit(attacker_stats.attack, defender_stats.defense);
    let hits: u64 = (Fixed::from_num(defender_stats.max_hp) / per_hit)
        .ceil()
        .to_num();

    let interval = if attacker_stats.range > 1 {
        RANGED_INTERVAL_TICKS
    } else {
        MELEE_INTERVAL_TICKS
    };

    Ok(hits.saturating_sub(1) * u64::from(interval))
}

/// Time-to-kill ratio of a matchup: how many of its own lifetimes the
/// attacker has spare while killing the defender. Above 1.0 the
/// attacker wins the straight fight.
///
/// # Errors
///
/// Returns an error if either entry has an out-of-range tier.
pub fn matchup_advantage(attacker: DeckEntry, defender: DeckEntry) -> Result<f64> {
    let my_ttk = ticks_to_kill(attacker, defender)?.max(1);
    let their_ttk = ticks_to_kill(defender, attacker)?.max(1);
    Ok(their_ttk as f64 / my_ttk as f64)
}

/// Generate the full TTK matrix for same-tier matchups.
///
/// # Errors
///
/// Returns an error if the tier is out of range.
pub fn ttk_matrix(tier: u8) -> Result<Vec<(DeckEntry, DeckEntry, u64)>> {
    use skirmish_core::catalog::UnitKind;

    let kinds = [
        UnitKind::Infantry,
        UnitKind::Armor,
        UnitKind::Air,
        UnitKind::Specialist,
    ];
    let mut results = Vec::new();

    for attacker in kinds {
        for defender in kinds {
            let a = DeckEntry::new(attacker, tier);
            let d = DeckEntry::new(defender, tier);
            results.push((a, d, ticks_to_kill(a, d)?));
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::catalog::UnitKind;
    use skirmish_core::commands::BattleMode;

    fn entry(kind: UnitKind) -> DeckEntry {
        DeckEntry::new(kind, 1)
    }

    #[test]
    fn test_infantry_vs_armor_ttk() {
        // 10 attack - 0.8 mitigation = 9.2 per hit;
        // ceil(120 / 9.2) = 14 hits; 13 cooldowns of 24 ticks.
        let ttk = ticks_to_kill(entry(UnitKind::Infantry), entry(UnitKind::Armor)).unwrap();
        assert_eq!(ttk, 13 * 24);
    }

    #[test]
    fn test_armor_vs_infantry_ttk() {
        // 18 attack - 1.4 mitigation = 16.6 per hit;
        // ceil(100 / 16.6) = 7 hits; 6 cooldowns of 24 ticks.
        let ttk = ticks_to_kill(entry(UnitKind::Armor), entry(UnitKind::Infantry)).unwrap();
        assert_eq!(ttk, 6 * 24);
    }

    #[test]
    fn test_ranged_attacker_uses_ranged_interval() {
        // 8 attack - 1.0 mitigation = 7 per hit;
        // ceil(80 / 7) = 12 hits; 11 cooldowns of 36 ticks.
        let ttk = ticks_to_kill(entry(UnitKind::Air), entry(UnitKind::Specialist)).unwrap();
        assert_eq!(ttk, 11 * 36);
    }

    #[test]
    fn test_exact_division_needs_no_extra_hit() {
        // Specialist vs Specialist: 6 - 1.0 = 5 per hit, 80 / 5 is
        // exactly 16 hits.
        let ttk = ticks_to_kill(entry(UnitKind::Specialist), entry(UnitKind::Specialist)).unwrap();
        assert_eq!(ttk, 15 * 36);
    }

    #[test]
    fn test_armor_beats_infantry_in_straight_fight() {
        let advantage =
            matchup_advantage(entry(UnitKind::Armor), entry(UnitKind::Infantry)).unwrap();
        assert!(
            advantage > 2.0,
            "Armor should decisively win the infantry matchup, got {advantage}"
        );
    }

    #[test]
    fn test_higher_tier_defender_takes_longer() {
        let attacker = entry(UnitKind::Infantry);
        let t1 = ticks_to_kill(attacker, DeckEntry::new(UnitKind::Armor, 1)).unwrap();
        let t3 = ticks_to_kill(attacker, DeckEntry::new(UnitKind::Armor, 3)).unwrap();
        assert!(t3 > t1);
    }

    #[test]
    fn test_ttk_matrix_covers_all_matchups() {
        let matrix = ttk_matrix(1).unwrap();
        assert_eq!(matrix.len(), 16);
        assert!(matrix.iter().all(|(_, _, ttk)| *ttk > 0));
    }

    #[test]
    fn test_invalid_tier_is_propagated() {
        assert!(ttk_matrix(0).is_err());
        assert!(ttk_matrix(7).is_err());
    }

    #[test]
    fn test_battle_stats_accumulation() {
        let mut stats = BattleStats::new();
        stats.record(&BattleResult::tally(
            BattleOutcome::Victory,
            BattleMode::Attack,
            3,
            120,
        ));
        stats.record(&BattleResult::tally(
            BattleOutcome::Victory,
            BattleMode::Attack,
            5,
            80,
        ));
        stats.record(&BattleResult::tally(
            BattleOutcome::Defeat,
            BattleMode::Attack,
            0,
            240,
        ));

        assert_eq!(stats.total_battles, 3);
        assert_eq!(stats.wins, 2);
        assert_eq!(stats.losses, 1);
        assert!((stats.win_rate() - 2.0 / 3.0).abs() < 1e-9);
        assert!((stats.average_survivors() - 8.0 / 3.0).abs() < 1e-9);
        assert!((stats.average_elapsed_secs() - (440.0 / 3.0)).abs() < 1e-9);
        assert!(stats.is_balanced(0.5, 0.7));
        assert!(!stats.is_balanced(0.0, 0.5));
    }

    #[test]
    fn test_empty_stats_have_neutral_rate() {
        let stats = BattleStats::new();
        assert!((stats.win_rate() - 0.5).abs() < 1e-9);
        assert!((stats.average_survivors()).abs() < 1e-9);
    }
}
