//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the battle simulation
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Replay verification and cross-device battle sharing require the
//! simulation to be 100% deterministic. Sources of non-determinism
//! include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`skirmish_core::math::Fixed`]
//!   throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   All simulation state lives in `Vec`s iterated in spawn order.
//!
//! - **System randomness**: The simulation takes no random input at all;
//!   the configuration and command stream are the only inputs.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual system determinism (movement, combat, etc.)
//! 2. **Property tests**: Random decks and scripts must still produce
//!    deterministic outputs
//! 3. **Integration tests**: Full battles are reproducible
//! 4. **Parallel tests**: Running N battles in parallel all match

use std::thread;

use skirmish_core::battle::{Battle, BattleConfig, BattlePhase};
use skirmish_core::commands::BattleCommand;
use skirmish_core::error::Result;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic battle).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the battle was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Result of parallel battle runs.
#[derive(Debug, Clone)]
pub struct ParallelBattleResult {
    /// Final state hash from each battle.
    pub hashes: Vec<u64>,
    /// Number of ticks each battle ran.
    pub ticks: u64,
    /// Number of battles run.
    pub num_battles: usize,
}

impl ParallelBattleResult {
    /// Check if all battles produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all battles matched.
    ///
    /// # Panics
    ///
    /// Panics if battles produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel battles diverged!\n\
                 Battles: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_battles,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance the state by one tick
/// * `hash` - Function to compute a state hash
///
/// # Example
///
/// ```ignore
/// use skirmish_test_utils::determinism::verify_determinism;
/// use skirmish_test_utils::fixtures::{attack_config, started_battle};
///
/// let result = verify_determinism(
///     5,   // Run 5 times
///     100, // 100 ticks each
///     || started_battle(attack_config(600)),
///     |battle| { battle.tick(); },
///     |battle| battle.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Simplified determinism verification for the [`Battle`] type.
///
/// Runs the battle twice with identical setup and verifies the final
/// state hashes match exactly.
///
/// # Arguments
///
/// * `setup_fn` - Function that creates and starts a battle
/// * `num_ticks` - Number of ticks to run
///
/// # Returns
///
/// `true` if both runs produced identical state hashes.
pub fn verify_battle_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Battle,
{
    let result = verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |battle| {
            battle.tick();
        },
        Battle::state_hash,
    );
    result.is_deterministic
}

/// Run N battles in parallel and collect final hashes.
///
/// This is useful for catching non-determinism that only manifests
/// under thread scheduling variations, memory layout differences, etc.
///
/// # Arguments
///
/// * `setup_fn` - Function that creates and starts a battle (must be thread-safe)
/// * `num_battles` - Number of parallel battles to run
/// * `num_ticks` - Number of ticks to run each battle
pub fn run_parallel_battles<F>(
    setup_fn: F,
    num_battles: usize,
    num_ticks: u64,
) -> ParallelBattleResult
where
    F: Fn() -> Battle + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_battles)
            .map(|_| {
                s.spawn(|| {
                    let mut battle = setup_fn();
                    for _ in 0..num_ticks {
                        battle.tick();
                    }
                    battle.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    ParallelBattleResult {
        hashes,
        ticks: num_ticks,
        num_battles,
    }
}

/// Compare two battle runs tick-by-tick, finding the first divergence.
///
/// Useful for debugging non-determinism by finding exactly when
/// battles start to differ.
///
/// # Returns
///
/// `None` if the battles are deterministic, `Some(tick)` if they
/// diverge at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Battle,
{
    let mut battle1 = setup_fn();
    let mut battle2 = setup_fn();

    // Check initial state
    if battle1.state_hash() != battle2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        battle1.tick();
        battle2.tick();

        if battle1.state_hash() != battle2.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Verify that a serialization round-trip preserves battle state exactly.
///
/// This is critical for snapshots and replay verification.
pub fn verify_serialization_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Battle,
{
    let mut battle = setup_fn();

    for _ in 0..num_ticks {
        battle.tick();
    }

    let hash_before = battle.state_hash();

    let Ok(bytes) = battle.serialize() else {
        return false;
    };
    let Ok(restored) = Battle::deserialize(&bytes) else {
        return false;
    };

    let hash_after = restored.state_hash();

    hash_before == hash_after
}

/// Run a battle from a configuration, feeding tick-stamped commands
/// from the script.
///
/// The battle runs for at most `ticks` ticks, stopping early if it
/// ends. Script entries stamped past the run length never fire.
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
pub fn run_scripted_battle(
    config: BattleConfig,
    script: &[(u64, BattleCommand)],
    ticks: u64,
) -> Result<Battle> {
    let mut battle = Battle::new(config)?;
    battle.start()?;

    for _ in 0..ticks {
        if battle.phase() == BattlePhase::Ended {
            break;
        }
        let now = battle.get_tick();
        for (at, command) in script {
            if *at == now {
                battle.queue_command(command.clone());
            }
        }
        battle.tick();
    }

    Ok(battle)
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of battle determinism.
pub mod strategies {
    use proptest::prelude::*;
    use skirmish_core::catalog::{DeckEntry, UnitKind};
    use skirmish_core::commands::{BattleCommand, BattleMode, SwipeDirection};

    /// Generate a unit archetype.
    pub fn arb_unit_kind() -> impl Strategy<Value = UnitKind> {
        prop_oneof![
            Just(UnitKind::Infantry),
            Just(UnitKind::Armor),
            Just(UnitKind::Air),
            Just(UnitKind::Specialist),
        ]
    }

    /// Generate a valid tier (1 through 6).
    pub fn arb_tier() -> impl Strategy<Value = u8> {
        1u8..=6u8
    }

    /// Generate a single deck entry.
    pub fn arb_deck_entry() -> impl Strategy<Value = DeckEntry> {
        (arb_unit_kind(), arb_tier()).prop_map(|(kind, tier)| DeckEntry::new(kind, tier))
    }

    /// Generate a full five-slot deck.
    pub fn arb_deck() -> impl Strategy<Value = [DeckEntry; 5]> {
        proptest::array::uniform5(arb_deck_entry())
    }

    /// Generate a battle mode.
    pub fn arb_mode() -> impl Strategy<Value = BattleMode> {
        prop_oneof![Just(BattleMode::Attack), Just(BattleMode::Defense)]
    }

    /// Generate a swipe direction.
    pub fn arb_swipe_direction() -> impl Strategy<Value = SwipeDirection> {
        prop_oneof![
            Just(SwipeDirection::Up),
            Just(SwipeDirection::Down),
            Just(SwipeDirection::Left),
            Just(SwipeDirection::Right),
            Just(SwipeDirection::Center),
        ]
    }

    /// Generate an in-battle command (no restarts).
    pub fn arb_battle_command() -> impl Strategy<Value = BattleCommand> {
        prop_oneof![
            (0u8..4).prop_map(|slot| BattleCommand::Skill { slot }),
            arb_swipe_direction().prop_map(|direction| BattleCommand::Swipe { direction }),
            any::<bool>().prop_map(|auto| BattleCommand::AutoToggle { auto }),
        ]
    }

    /// Generate a tick-stamped command script.
    pub fn arb_command_script(max_len: usize) -> impl Strategy<Value = Vec<(u64, BattleCommand)>> {
        proptest::collection::vec((0u64..240, arb_battle_command()), 0..max_len)
    }
}
