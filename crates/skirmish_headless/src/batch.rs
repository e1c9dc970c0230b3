//! Batch battle runner for balance testing.
//!
//! Runs many battles in parallel using rayon and aggregates win rates
//! and duration statistics. The simulation takes no random input, so
//! sweep coverage comes from varying deck compositions across the
//! batch rather than from seeds.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use skirmish_core::battle::{Battle, BattleConfig, BattlePhase, TICK_RATE};
use skirmish_core::catalog::{DeckEntry, UnitKind, MAX_TIER, MIN_TIER};
use skirmish_core::commands::BattleMode;
use skirmish_core::events::BattleOutcome;

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of battles to run.
    pub battle_count: u32,
    /// Maximum parallel battles (0 = use rayon default).
    pub parallel: u32,
    /// Objective every battle is fought under.
    pub mode: BattleMode,
    /// Battle clock in seconds.
    pub time_limit_secs: u32,
    /// Lowest deck tier in the sweep.
    pub min_tier: u8,
    /// Highest deck tier in the sweep.
    pub max_tier: u8,
    /// Output directory for results.
    pub output_dir: PathBuf,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            battle_count: 100,
            parallel: 0,
            mode: BattleMode::Attack,
            // Short clock; most battles end by wipe well before it.
            time_limit_secs: 120,
            min_tier: MIN_TIER,
            max_tier: 3,
            output_dir: PathBuf::from("results"),
        }
    }
}

impl BatchConfig {
    /// Create a config for a given objective and battle count.
    #[must_use]
    pub fn new(mode: BattleMode, battle_count: u32) -> Self {
        Self {
            mode,
            battle_count,
            ..Default::default()
        }
    }

    /// Set the output directory.
    #[must_use]
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Set the deck tier sweep range.
    #[must_use]
    pub fn with_tiers(mut self, min: u8, max: u8) -> Self {
        self.min_tier = min.max(MIN_TIER);
        self.max_tier = max.min(MAX_TIER);
        self
    }

    /// Set the battle clock.
    #[must_use]
    pub fn with_time_limit(mut self, secs: u32) -> Self {
        self.time_limit_secs = secs;
        self
    }
}

/// Deck composition for one battle of the sweep.
///
/// Walks the tier range and rotates the archetype lead so neighboring
/// indices field different armies. Deterministic in the index.
#[must_use]
pub fn deck_variant(index: u32, min_tier: u8, max_tier: u8) -> [DeckEntry; 5] {
    const ROTATION: [UnitKind; 4] = [
        UnitKind::Infantry,
        UnitKind::Armor,
        UnitKind::Air,
        UnitKind::Specialist,
    ];

    let span = u32::from(max_tier.saturating_sub(min_tier)) + 1;
    let tier = min_tier + (index % span) as u8;
    let lead = (index / span) as usize;
    std::array::from_fn(|slot| DeckEntry::new(ROTATION[(slot + lead) % ROTATION.len()], tier))
}

/// Outcome of one battle in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleRecord {
    /// Index of the battle within the batch.
    pub index: u32,
    /// Deck the player fielded.
    pub deck: [DeckEntry; 5],
    /// Tier of the fielded deck.
    pub tier: u8,
    /// Outcome from the player's perspective.
    pub outcome: BattleOutcome,
    /// Player units alive at the end.
    pub survivors: u32,
    /// Battle length in whole seconds.
    pub elapsed_secs: u32,
    /// Battle length in ticks.
    pub duration_ticks: u64,
    /// Resource payout.
    pub resource_reward: u32,
    /// Final state hash (for determinism validation).
    pub final_hash: u64,
}

/// Error during a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Index of the failed battle.
    pub index: u32,
    /// Error message.
    pub message: String,
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Individual battle records.
    pub records: Vec<BattleRecord>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Total runtime.
    pub duration_seconds: f64,
    /// Errors encountered.
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from a JSON file.
    pub fn load(path: &std::path::Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Summary statistics across a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Total battles completed.
    pub total_battles: u32,
    /// Player victories.
    pub wins: u32,
    /// Player defeats.
    pub losses: u32,
    /// Overall player win rate.
    pub win_rate: f64,
    /// Average battle length in seconds.
    pub avg_duration_secs: f64,
    /// Shortest battle in seconds.
    pub min_duration_secs: u32,
    /// Longest battle in seconds.
    pub max_duration_secs: u32,
    /// Average surviving player units.
    pub avg_survivors: f64,
    /// Battles fought at each deck tier.
    pub battles_by_tier: BTreeMap<u8, u32>,
    /// Player win rate at each deck tier.
    pub win_rate_by_tier: BTreeMap<u8, f64>,
}

impl BatchSummary {
    /// Calculate a summary from a list of battle records.
    #[must_use]
    pub fn from_records(records: &[BattleRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let mut summary = Self {
            total_battles: records.len() as u32,
            min_duration_secs: u32::MAX,
            ..Default::default()
        };

        let mut duration_sum = 0u64;
        let mut survivor_sum = 0u64;
        let mut wins_by_tier: BTreeMap<u8, u32> = BTreeMap::new();

        for record in records {
            duration_sum += u64::from(record.elapsed_secs);
            survivor_sum += u64::from(record.survivors);
            summary.min_duration_secs = summary.min_duration_secs.min(record.elapsed_secs);
            summary.max_duration_secs = summary.max_duration_secs.max(record.elapsed_secs);

            *summary.battles_by_tier.entry(record.tier).or_default() += 1;
            match record.outcome {
                BattleOutcome::Victory => {
                    summary.wins += 1;
                    *wins_by_tier.entry(record.tier).or_default() += 1;
                }
                BattleOutcome::Defeat => summary.losses += 1,
            }
        }

        summary.win_rate = f64::from(summary.wins) / records.len() as f64;
        summary.avg_duration_secs = duration_sum as f64 / records.len() as f64;
        summary.avg_survivors = survivor_sum as f64 / records.len() as f64;

        for (tier, count) in &summary.battles_by_tier {
            let wins = wins_by_tier.get(tier).copied().unwrap_or(0);
            summary
                .win_rate_by_tier
                .insert(*tier, f64::from(wins) / f64::from(*count));
        }

        summary
    }

    /// Check whether the overall win rate sits within the threshold of
    /// an even match.
    #[must_use]
    pub fn is_balanced(&self, threshold: f64) -> bool {
        (self.win_rate - 0.5).abs() <= threshold
    }
}

/// Run one battle of the sweep to completion.
fn run_single_battle(index: u32, config: &BatchConfig) -> Result<BattleRecord, String> {
    let deck = deck_variant(index, config.min_tier, config.max_tier);
    let battle_config = BattleConfig {
        deck,
        mode: config.mode,
        time_limit_secs: config.time_limit_secs,
    };

    let mut battle = Battle::new(battle_config).map_err(|e| e.to_string())?;
    battle.start().map_err(|e| e.to_string())?;

    let max_ticks = u64::from(config.time_limit_secs) * u64::from(TICK_RATE) + 1;
    let mut outcome = None;
    for _ in 0..max_ticks {
        if battle.phase() == BattlePhase::Ended {
            break;
        }
        let events = battle.tick();
        if let Some(result) = events.result {
            outcome = Some(result);
            break;
        }
    }

    let result = outcome.ok_or_else(|| format!("no result after {} ticks", battle.get_tick()))?;
    Ok(BattleRecord {
        index,
        deck,
        tier: deck[0].tier,
        outcome: result.outcome,
        survivors: result.survivors,
        elapsed_secs: result.elapsed_secs,
        duration_ticks: battle.get_tick(),
        resource_reward: result.resource_reward,
        final_hash: battle.state_hash(),
    })
}

/// Run a batch of battles.
pub fn run_batch(config: BatchConfig) -> BatchResults {
    let start = Instant::now();

    info!(
        "Starting batch run: {} battles in {:?} mode, tiers {}-{}",
        config.battle_count, config.mode, config.min_tier, config.max_tier
    );

    // Configure thread pool if specified
    if config.parallel > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let completed = AtomicU32::new(0);
    let results: Vec<Result<BattleRecord, BatchError>> = (0..config.battle_count)
        .into_par_iter()
        .map(|index| {
            let outcome = run_single_battle(index, &config);

            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            if done % 25 == 0 {
                debug!("Progress: {}/{}", done, config.battle_count);
            }

            match outcome {
                Ok(record) => Ok(record),
                Err(message) => {
                    warn!("Battle {} failed: {}", index, message);
                    Err(BatchError { index, message })
                }
            }
        })
        .collect();

    let (records, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let records: Vec<BattleRecord> = records.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_records(&records);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} battles in {:.1}s ({:.1} battles/sec)",
        records.len(),
        duration_seconds,
        records.len() as f64 / duration_seconds.max(0.001)
    );

    BatchResults {
        config,
        records,
        summary,
        duration_seconds,
        errors,
    }
}

/// Verify determinism by running the same battle index multiple times.
pub fn verify_determinism(config: &BatchConfig, index: u32, runs: u32) -> bool {
    let records: Vec<BattleRecord> = (0..runs)
        .filter_map(|_| run_single_battle(index, config).ok())
        .collect();
    if records.len() != runs as usize {
        return false;
    }

    let first = &records[0];
    records.iter().all(|record| {
        record.final_hash == first.final_hash
            && record.duration_ticks == first.duration_ticks
            && record.outcome == first.outcome
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_config(count: u32) -> BatchConfig {
        BatchConfig::new(BattleMode::Attack, count)
            .with_time_limit(20)
            .with_tiers(1, 2)
    }

    #[test]
    fn test_batch_config_default() {
        let config = BatchConfig::default();
        assert_eq!(config.battle_count, 100);
        assert_eq!(config.mode, BattleMode::Attack);
        assert_eq!(config.min_tier, MIN_TIER);
    }

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new(BattleMode::Defense, 500)
            .with_output(PathBuf::from("/tmp/results"))
            .with_tiers(0, 9)
            .with_time_limit(60);

        assert_eq!(config.mode, BattleMode::Defense);
        assert_eq!(config.battle_count, 500);
        // Tier bounds clamp to the catalog's supported range.
        assert_eq!(config.min_tier, MIN_TIER);
        assert_eq!(config.max_tier, MAX_TIER);
        assert_eq!(config.time_limit_secs, 60);
    }

    #[test]
    fn test_deck_variants_walk_tiers_and_rotate_kinds() {
        let first = deck_variant(0, 1, 3);
        let second = deck_variant(1, 1, 3);
        let third = deck_variant(2, 1, 3);
        let wrapped = deck_variant(3, 1, 3);

        assert_eq!(first[0].tier, 1);
        assert_eq!(second[0].tier, 2);
        assert_eq!(third[0].tier, 3);
        assert_eq!(wrapped[0].tier, 1);

        // After a full tier cycle the archetype lead rotates.
        assert_eq!(first[0].kind, UnitKind::Infantry);
        assert_eq!(wrapped[0].kind, UnitKind::Armor);

        for index in 0..24 {
            for entry in deck_variant(index, 1, 6) {
                assert!(entry.stats().is_ok());
            }
        }
    }

    #[test]
    fn test_run_batch_small() {
        let results = run_batch(quick_config(6));

        assert_eq!(results.records.len(), 6);
        assert!(results.errors.is_empty());
        assert!(results.duration_seconds > 0.0);
        assert_eq!(results.summary.total_battles, 6);
        assert_eq!(
            results.summary.wins + results.summary.losses,
            results.summary.total_battles
        );
    }

    #[test]
    fn test_summary_statistics() {
        let record = |tier: u8, outcome: BattleOutcome, survivors: u32, secs: u32| BattleRecord {
            index: 0,
            deck: deck_variant(0, tier, tier),
            tier,
            outcome,
            survivors,
            elapsed_secs: secs,
            duration_ticks: u64::from(secs) * u64::from(TICK_RATE),
            resource_reward: 0,
            final_hash: 0,
        };

        let records = vec![
            record(1, BattleOutcome::Victory, 4, 30),
            record(1, BattleOutcome::Defeat, 0, 60),
            record(2, BattleOutcome::Victory, 2, 90),
        ];
        let summary = BatchSummary::from_records(&records);

        assert_eq!(summary.total_battles, 3);
        assert_eq!(summary.wins, 2);
        assert_eq!(summary.losses, 1);
        assert!((summary.win_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.min_duration_secs, 30);
        assert_eq!(summary.max_duration_secs, 90);
        assert!((summary.avg_duration_secs - 60.0).abs() < 1e-9);
        assert!((summary.avg_survivors - 2.0).abs() < 1e-9);
        assert_eq!(summary.battles_by_tier[&1], 2);
        assert!((summary.win_rate_by_tier[&1] - 0.5).abs() < 1e-9);
        assert!((summary.win_rate_by_tier[&2] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_summary_is_zeroed() {
        let summary = BatchSummary::from_records(&[]);
        assert_eq!(summary.total_battles, 0);
        assert_eq!(summary.win_rate, 0.0);
        assert_eq!(summary.min_duration_secs, 0);
    }

    #[test]
    fn test_is_balanced_threshold() {
        let summary = BatchSummary {
            win_rate: 0.55,
            ..Default::default()
        };
        assert!(summary.is_balanced(0.1));
        assert!(!summary.is_balanced(0.01));
    }

    #[test]
    fn test_batch_results_save_load() {
        let results = run_batch(quick_config(3));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch_results.json");

        results.save(&path).unwrap();
        assert!(path.exists());

        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.records.len(), 3);
        assert_eq!(loaded.summary.total_battles, 3);
        assert_eq!(loaded.config.time_limit_secs, 20);
    }

    #[test]
    fn test_verify_determinism() {
        let config = quick_config(1);
        assert!(verify_determinism(&config, 0, 3));
    }

    #[test]
    fn test_identical_indices_produce_identical_records() {
        let config = quick_config(1);
        let first = run_single_battle(0, &config).unwrap();
        let second = run_single_battle(0, &config).unwrap();

        assert_eq!(first.final_hash, second.final_hash);
        assert_eq!(first.duration_ticks, second.duration_ticks);
        assert_eq!(first.survivors, second.survivors);
    }
}
