//! Scenario loading and configuration.
//!
//! A scenario describes one battle setup for headless runs: the player
//! deck, the objective, the clock, and an optional tick-stamped command
//! script that stands in for player input. Scenario files use RON.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use skirmish_core::battle::{enemy_deck, BattleConfig, DEFAULT_TIME_LIMIT_SECS};
use skirmish_core::catalog::{DeckEntry, UnitKind};
use skirmish_core::commands::{BattleCommand, BattleMode, SwipeDirection};

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Player deck, slot order.
    pub deck: [DeckEntry; 5],
    /// Battle objective.
    pub mode: BattleMode,
    /// Battle clock in seconds.
    pub time_limit_secs: u32,
    /// Whether the player auto controller starts enabled.
    #[serde(default = "default_auto")]
    pub auto: bool,
    /// Commands queued at fixed ticks, standing in for player input.
    #[serde(default)]
    pub script: Vec<ScriptEntry>,
}

fn default_auto() -> bool {
    true
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "Standard Attack".to_string(),
            description: "Mirror-deck assault on the neutral field".to_string(),
            deck: enemy_deck(),
            mode: BattleMode::Attack,
            time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
            auto: true,
            script: Vec::new(),
        }
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let scenario: Scenario = ron::from_str(&contents)?;
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Tier-two mixed deck on the attack, full clock.
    #[must_use]
    pub fn attack_standard() -> Self {
        Self {
            name: "Attack Standard".to_string(),
            description: "Tier-two mixed deck against the fixed garrison".to_string(),
            deck: [
                DeckEntry::new(UnitKind::Infantry, 2),
                DeckEntry::new(UnitKind::Infantry, 2),
                DeckEntry::new(UnitKind::Armor, 2),
                DeckEntry::new(UnitKind::Air, 2),
                DeckEntry::new(UnitKind::Specialist, 2),
            ],
            mode: BattleMode::Attack,
            time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
            auto: true,
            script: Vec::new(),
        }
    }

    /// Defense of the owned field with a scripted regroup opening.
    ///
    /// The script pulls the roster onto the center point under manual
    /// control, then hands back to the auto controller two seconds in.
    #[must_use]
    pub fn defense_hold() -> Self {
        Self {
            name: "Defense Hold".to_string(),
            description: "Hold all three points with a scripted center regroup".to_string(),
            deck: [
                DeckEntry::new(UnitKind::Infantry, 2),
                DeckEntry::new(UnitKind::Armor, 2),
                DeckEntry::new(UnitKind::Armor, 2),
                DeckEntry::new(UnitKind::Air, 2),
                DeckEntry::new(UnitKind::Specialist, 2),
            ],
            mode: BattleMode::Defense,
            time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
            auto: false,
            script: vec![
                ScriptEntry::new(
                    0,
                    BattleCommand::Swipe {
                        direction: SwipeDirection::Center,
                    },
                ),
                ScriptEntry::new(40, BattleCommand::AutoToggle { auto: true }),
            ],
        }
    }

    /// Battle configuration this scenario starts with.
    #[must_use]
    pub fn to_battle_config(&self) -> BattleConfig {
        BattleConfig {
            deck: self.deck,
            mode: self.mode,
            time_limit_secs: self.time_limit_secs,
        }
    }

    /// Scripted commands stamped for the given tick, in script order.
    #[must_use]
    pub fn commands_at_tick(&self, tick: u64) -> Vec<&ScriptEntry> {
        self.script
            .iter()
            .filter(|entry| entry.tick == tick)
            .collect()
    }
}

/// One scripted command, queued when the battle reaches its tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptEntry {
    /// Tick to queue the command at.
    pub tick: u64,
    /// The command to queue.
    pub command: BattleCommand,
}

impl ScriptEntry {
    /// Create a new script entry.
    #[must_use]
    pub const fn new(tick: u64, command: BattleCommand) -> Self {
        Self { tick, command }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scenario() {
        let scenario = Scenario::default();
        assert_eq!(scenario.mode, BattleMode::Attack);
        assert_eq!(scenario.time_limit_secs, DEFAULT_TIME_LIMIT_SECS);
        assert!(scenario.auto);
        assert!(scenario.script.is_empty());
        assert_eq!(scenario.deck, enemy_deck());
    }

    #[test]
    fn test_defense_preset_scripts_a_regroup() {
        let scenario = Scenario::defense_hold();
        assert_eq!(scenario.mode, BattleMode::Defense);
        assert!(!scenario.auto);
        assert_eq!(scenario.script.len(), 2);
        assert_eq!(scenario.commands_at_tick(0).len(), 1);
        assert_eq!(
            scenario.commands_at_tick(40)[0].command,
            BattleCommand::AutoToggle { auto: true }
        );
        assert!(scenario.commands_at_tick(7).is_empty());
    }

    #[test]
    fn test_battle_config_carries_scenario_setup() {
        let scenario = Scenario::attack_standard();
        let config = scenario.to_battle_config();
        assert_eq!(config.deck, scenario.deck);
        assert_eq!(config.mode, BattleMode::Attack);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_from_ron() {
        let ron = r#"
            Scenario(
                name: "Test",
                description: "Test scenario",
                deck: [
                    (kind: Infantry, tier: 1),
                    (kind: Infantry, tier: 1),
                    (kind: Armor, tier: 2),
                    (kind: Air, tier: 1),
                    (kind: Specialist, tier: 1),
                ],
                mode: Defense,
                time_limit_secs: 120,
                auto: false,
                script: [
                    (tick: 40, command: Skill(slot: 0)),
                    (tick: 90, command: Swipe(direction: Center)),
                ],
            )
        "#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.name, "Test");
        assert_eq!(scenario.mode, BattleMode::Defense);
        assert_eq!(scenario.deck[2].tier, 2);
        assert_eq!(scenario.script[0].command, BattleCommand::Skill { slot: 0 });
    }

    #[test]
    fn test_auto_and_script_are_optional_in_ron() {
        let ron = r#"
            Scenario(
                name: "Bare",
                description: "No script",
                deck: [
                    (kind: Infantry, tier: 1),
                    (kind: Infantry, tier: 1),
                    (kind: Infantry, tier: 1),
                    (kind: Infantry, tier: 1),
                    (kind: Infantry, tier: 1),
                ],
                mode: Attack,
                time_limit_secs: 60,
            )
        "#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert!(scenario.auto);
        assert!(scenario.script.is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Scenario::load("/nonexistent/scenario.ron");
        assert!(matches!(result, Err(ScenarioError::FileNotFound(_))));
    }

    #[test]
    fn test_load_roundtrips_through_file() {
        let scenario = Scenario::defense_hold();
        let ron_text = ron::to_string(&scenario).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("defense.ron");
        std::fs::write(&path, ron_text).unwrap();

        let loaded = Scenario::load(&path).unwrap();
        assert_eq!(loaded, scenario);
    }

    #[test]
    fn test_parse_error_reports_position() {
        let result = Scenario::from_ron_str("Scenario(name: \"broken\"");
        assert!(matches!(result, Err(ScenarioError::ParseError(_))));
    }
}
