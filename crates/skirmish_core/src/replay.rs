//! Replay system for recording and playing back battles.
//!
//! Replays store the battle configuration and the stream of commands
//! issued during the battle. Because battle construction is
//! deterministic, that is enough to recreate any battle tick for
//! tick and check it against the recorded final hash.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::battle::{Battle, BattleConfig, BattlePhase};
use crate::commands::BattleCommand;
use crate::error::{BattleError, Result};

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// A single command record for replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayCommand {
    /// Battle tick when the command was queued.
    pub tick: u64,
    /// The command that was queued.
    pub command: BattleCommand,
}

impl ReplayCommand {
    /// Create a new replay command record.
    #[must_use]
    pub const fn new(tick: u64, command: BattleCommand) -> Self {
        Self { tick, command }
    }
}

/// Complete replay data structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleReplay {
    /// Replay format version.
    pub version: u32,
    /// Scenario label for tooling.
    pub scenario: String,
    /// Configuration the battle was started with.
    pub config: BattleConfig,
    /// Stream of commands in tick order.
    pub commands: Vec<ReplayCommand>,
    /// Final tick when the battle ended.
    pub final_tick: u64,
    /// Final state hash for verification.
    pub final_hash: u64,
}

impl BattleReplay {
    /// Create a new replay for a battle about to start.
    #[must_use]
    pub fn new(scenario: impl Into<String>, config: BattleConfig) -> Self {
        Self {
            version: REPLAY_VERSION,
            scenario: scenario.into(),
            config,
            commands: Vec::new(),
            final_tick: 0,
            final_hash: 0,
        }
    }

    /// Record a command for replay.
    pub fn record(&mut self, tick: u64, command: BattleCommand) {
        self.commands.push(ReplayCommand::new(tick, command));
    }

    /// Finalize the replay with end-of-battle state.
    pub fn finalize(&mut self, final_tick: u64, final_hash: u64) {
        self.final_tick = final_tick;
        self.final_hash = final_hash;
    }

    /// Serialize the replay to bytes.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| BattleError::InvalidState(format!("Failed to serialize replay: {e}")))
    }

    /// Deserialize a replay from bytes, checking the format version.
    ///
    /// # Errors
    /// Returns an error if deserialization fails or the version does
    /// not match [`REPLAY_VERSION`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let replay: Self = bincode::deserialize(bytes)
            .map_err(|e| BattleError::InvalidState(format!("Failed to deserialize replay: {e}")))?;

        if replay.version != REPLAY_VERSION {
            return Err(BattleError::ReplayVersionMismatch {
                expected: REPLAY_VERSION,
                got: replay.version,
            });
        }

        Ok(replay)
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| BattleError::InvalidState(format!("Failed to write replay file: {e}")))?;
        Ok(())
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    /// Returns an error if file reading, deserialization, or the
    /// version check fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| BattleError::InvalidState(format!("Failed to read replay file: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Get commands for a specific tick.
    #[must_use]
    pub fn commands_at_tick(&self, tick: u64) -> Vec<&ReplayCommand> {
        self.commands
            .iter()
            .filter(|record| record.tick == tick)
            .collect()
    }

    /// Get the total duration of the replay in ticks.
    #[must_use]
    pub const fn duration(&self) -> u64 {
        self.final_tick
    }

    /// Get the total number of commands in the replay.
    #[must_use]
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// Play the replay back from the start, returning the battle in
    /// its final state.
    ///
    /// The battle is rebuilt from the recorded configuration and fed
    /// the recorded command stream at the recorded ticks. Playback
    /// stops at the recorded final tick or when the battle ends,
    /// whichever comes first.
    ///
    /// # Errors
    /// Returns an error if the recorded configuration is invalid.
    pub fn play(&self) -> Result<Battle> {
        let mut battle = Battle::new(self.config)?;
        battle.start()?;

        while battle.get_tick() < self.final_tick {
            if battle.phase() == BattlePhase::Ended {
                break;
            }
            for record in self.commands_at_tick(battle.get_tick()) {
                battle.queue_command(record.command.clone());
            }
            battle.tick();
        }

        Ok(battle)
    }

    /// Play the replay back and check the final state hash.
    ///
    /// # Errors
    /// Returns an error if playback fails.
    pub fn verify(&self) -> Result<bool> {
        let battle = self.play()?;
        Ok(battle.state_hash() == self.final_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::SwipeDirection;

    /// Run a short scripted battle, recording it as we go.
    fn record_fixture_battle() -> BattleReplay {
        let config = BattleConfig::default();
        let mut replay = BattleReplay::new("fixture", config);
        let mut battle = Battle::new(config).unwrap();
        battle.start().unwrap();

        for i in 0..200u64 {
            if battle.phase() == BattlePhase::Ended {
                break;
            }
            if i == 40 {
                let command = BattleCommand::Skill { slot: 0 };
                replay.record(battle.get_tick(), command.clone());
                battle.queue_command(command);
            }
            if i == 90 {
                let command = BattleCommand::AutoToggle { auto: false };
                replay.record(battle.get_tick(), command.clone());
                battle.queue_command(command);

                let command = BattleCommand::Swipe {
                    direction: SwipeDirection::Center,
                };
                replay.record(battle.get_tick(), command.clone());
                battle.queue_command(command);
            }
            battle.tick();
        }

        replay.finalize(battle.get_tick(), battle.state_hash());
        replay
    }

    #[test]
    fn test_replay_create() {
        let replay = BattleReplay::new("test_scenario", BattleConfig::default());
        assert_eq!(replay.version, REPLAY_VERSION);
        assert_eq!(replay.scenario, "test_scenario");
        assert!(replay.commands.is_empty());
        assert_eq!(replay.duration(), 0);
    }

    #[test]
    fn test_replay_record_commands() {
        let mut replay = BattleReplay::new("test_scenario", BattleConfig::default());

        replay.record(0, BattleCommand::AutoToggle { auto: false });
        replay.record(
            5,
            BattleCommand::Swipe {
                direction: SwipeDirection::Up,
            },
        );
        replay.record(10, BattleCommand::Skill { slot: 1 });

        assert_eq!(replay.command_count(), 3);
        assert_eq!(replay.commands_at_tick(0).len(), 1);
        assert_eq!(replay.commands_at_tick(5).len(), 1);
        assert_eq!(replay.commands_at_tick(10).len(), 1);
        assert_eq!(replay.commands_at_tick(7).len(), 0);
    }

    #[test]
    fn test_replay_finalize() {
        let mut replay = BattleReplay::new("test_scenario", BattleConfig::default());

        replay.finalize(1000, 0xDEAD_BEEF);

        assert_eq!(replay.duration(), 1000);
        assert_eq!(replay.final_hash, 0xDEAD_BEEF);
    }

    #[test]
    fn test_replay_byte_roundtrip() {
        let replay = record_fixture_battle();

        let bytes = replay.to_bytes().unwrap();
        let loaded = BattleReplay::from_bytes(&bytes).unwrap();

        assert_eq!(loaded.scenario, "fixture");
        assert_eq!(loaded.command_count(), replay.command_count());
        assert_eq!(loaded.final_tick, replay.final_tick);
        assert_eq!(loaded.final_hash, replay.final_hash);
    }

    #[test]
    fn test_replay_save_load() {
        let replay = record_fixture_battle();

        let temp_path = std::env::temp_dir().join("skirmish_replay_roundtrip.bin");
        replay.save(&temp_path).unwrap();

        let loaded = BattleReplay::load(&temp_path).unwrap();
        assert_eq!(loaded.scenario, replay.scenario);
        assert_eq!(loaded.final_hash, replay.final_hash);

        let _ = std::fs::remove_file(temp_path);
    }

    #[test]
    fn test_version_mismatch_is_rejected() {
        let mut replay = BattleReplay::new("test_scenario", BattleConfig::default());
        replay.version = REPLAY_VERSION + 1;

        let bytes = bincode::serialize(&replay).unwrap();
        let result = BattleReplay::from_bytes(&bytes);

        assert!(matches!(
            result,
            Err(BattleError::ReplayVersionMismatch { expected, got })
                if expected == REPLAY_VERSION && got == REPLAY_VERSION + 1
        ));
    }

    #[test]
    fn test_replay_verifies_against_recording() {
        let replay = record_fixture_battle();
        assert!(replay.verify().unwrap());
    }

    #[test]
    fn test_playback_matches_recorded_final_tick() {
        let replay = record_fixture_battle();
        let battle = replay.play().unwrap();
        assert_eq!(battle.get_tick(), replay.final_tick);
        assert_eq!(battle.state_hash(), replay.final_hash);
    }

    #[test]
    fn test_tampered_replay_fails_verification() {
        let mut replay = record_fixture_battle();
        replay.final_hash ^= 1;
        assert!(!replay.verify().unwrap());

        // An injected command also diverges the playback.
        let mut replay = record_fixture_battle();
        replay.record(10, BattleCommand::AutoToggle { auto: false });
        assert!(!replay.verify().unwrap());
    }
}
