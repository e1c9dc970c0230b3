//! JSON protocol for headless battle communication.
//!
//! The headless runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the driver
//! **Output (stdout):** Battle state updates and responses
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0",...}`
//! 2. Driver sends commands as JSON lines
//! 3. Runner outputs HUD lines once per battle second and state on `query`
//! 4. On battle end, outputs `{"type":"result","outcome":"Victory"|"Defeat",...}`
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","scenario":"Standard Attack","tick":0}
//! -> {"cmd":"start"}
//! <- {"type":"ack","cmd":"start"}
//! -> {"cmd":"tick","count":40}
//! <- {"type":"hud","tick":20,"time_left_secs":599,...}
//! <- {"type":"hud","tick":40,"time_left_secs":598,...}
//! <- {"type":"state","tick":40,"units":[...],"points":[...],"hash":1234}
//! -> {"cmd":"skill","slot":0}
//! <- {"type":"ack","cmd":"skill"}
//! -> {"cmd":"quit"}
//! <- {"type":"bye"}
//! ```
//!
//! Battle-domain values reuse the simulation's serde names, so unit
//! kinds arrive as `"Infantry"` and factions as `"Player"`.

use serde::{Deserialize, Serialize};

use skirmish_core::battle::BattlePhase;
use skirmish_core::capture::CapturePoint;
use skirmish_core::catalog::{DeckEntry, UnitKind};
use skirmish_core::commands::{BattleMode, SwipeDirection};
use skirmish_core::events::{BattleOutcome, BattleResult, HudState};
use skirmish_core::factions::Faction;
use skirmish_core::units::Unit;

// ============================================================================
// Input Commands (Driver -> Runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Start the battle. Omitted fields fall back to the scenario.
    Start {
        #[serde(default)]
        deck: Option<[DeckEntry; 5]>,
        #[serde(default)]
        mode: Option<BattleMode>,
        #[serde(default)]
        time_limit_secs: Option<u32>,
    },

    /// Advance the battle by N ticks (default: 1).
    Tick {
        #[serde(default = "default_tick_count")]
        count: u32,
    },

    /// Query current battle state without advancing time.
    Query,

    /// Fire the skill in the given slot.
    Skill { slot: u8 },

    /// Swipe the roster toward a region.
    Swipe { direction: SwipeDirection },

    /// Enable or disable the player auto controller.
    Auto { enabled: bool },

    /// Report the state hash (for determinism verification).
    Hash,

    /// Save the recorded command stream as a replay file.
    SaveReplay { path: String },

    /// Quit the runner.
    Quit,
}

fn default_tick_count() -> u32 {
    1
}

// ============================================================================
// Output Responses (Runner -> Driver)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready {
        version: String,
        scenario: String,
        tick: u64,
    },

    /// Acknowledgment of a command.
    Ack { cmd: String },

    /// Error processing a command.
    Error {
        message: String,
        cmd: Option<String>,
    },

    /// Current battle state.
    State {
        tick: u64,
        phase: BattlePhase,
        time_left_secs: u32,
        auto: bool,
        units: Vec<UnitState>,
        points: Vec<PointState>,
        hash: u64,
    },

    /// Periodic HUD refresh, one per battle second.
    Hud {
        tick: u64,
        time_left_secs: u32,
        player_alive: u32,
        enemy_alive: u32,
        skill_cooldowns: [f32; 4],
    },

    /// The battle has ended.
    Result {
        tick: u64,
        outcome: BattleOutcome,
        mode: BattleMode,
        survivors: u32,
        elapsed_secs: u32,
        resource_reward: u32,
        fame_reward: u32,
    },

    /// State hash for determinism verification.
    StateHash { tick: u64, hash: u64 },

    /// The command stream was written to disk.
    ReplaySaved {
        path: String,
        commands: usize,
        tick: u64,
    },

    /// Goodbye message before shutdown.
    Bye,
}

// ============================================================================
// State Types
// ============================================================================

/// State of a single unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitState {
    pub id: u32,
    pub kind: UnitKind,
    pub tier: u8,
    pub faction: Faction,
    pub x: f64,
    pub y: f64,
    pub hp: u32,
    pub max_hp: u32,
    pub alive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<u32>,
}

impl UnitState {
    /// Capture the protocol view of a unit.
    #[must_use]
    pub fn from_unit(unit: &Unit) -> Self {
        Self {
            id: unit.id,
            kind: unit.kind,
            tier: unit.tier,
            faction: unit.faction,
            x: unit.position.x.to_num(),
            y: unit.position.y.to_num(),
            hp: unit.hp.round().to_num(),
            max_hp: unit.max_hp.round().to_num(),
            alive: unit.alive,
            target: unit.attack_target,
        }
    }
}

/// State of a single capture point. Progress runs 0 to 100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointState {
    pub id: u8,
    pub x: f64,
    pub y: f64,
    pub owner: Option<Faction>,
    pub contender: Option<Faction>,
    pub progress: f64,
}

impl PointState {
    /// Capture the protocol view of a capture point.
    #[must_use]
    pub fn from_point(point: &CapturePoint) -> Self {
        Self {
            id: point.id,
            x: point.position.x.to_num(),
            y: point.position.y.to_num(),
            owner: point.owner,
            contender: point.contender,
            progress: point.progress.to_num(),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(scenario: &str, tick: u64) -> Self {
        Self::Ready {
            version: "1.0".to_string(),
            scenario: scenario.to_string(),
            tick,
        }
    }

    /// Create an acknowledgment.
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Build a HUD response from the simulation's HUD snapshot.
    #[must_use]
    pub fn hud(tick: u64, hud: &HudState) -> Self {
        Self::Hud {
            tick,
            time_left_secs: hud.time_left_secs,
            player_alive: hud.player_alive,
            enemy_alive: hud.enemy_alive,
            skill_cooldowns: hud.skill_cooldowns,
        }
    }

    /// Build a result response from the simulation's final accounting.
    #[must_use]
    pub fn result(tick: u64, result: &BattleResult) -> Self {
        Self::Result {
            tick,
            outcome: result.outcome,
            mode: result.mode,
            survivors: result.survivors,
            elapsed_secs: result.elapsed_secs,
            resource_reward: result.resource_reward,
            fame_reward: result.fame_reward,
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"type":"error","message":"Serialization failed: {}"}}"#,
                e
            )
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for acknowledgment.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Tick { .. } => "tick",
            Self::Query => "query",
            Self::Skill { .. } => "skill",
            Self::Swipe { .. } => "swipe",
            Self::Auto { .. } => "auto",
            Self::Hash => "hash",
            Self::SaveReplay { .. } => "save_replay",
            Self::Quit => "quit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tick_command() {
        let json = r#"{"cmd":"tick","count":60}"#;
        let cmd = Command::from_json(json).unwrap();
        assert!(matches!(cmd, Command::Tick { count: 60 }));
    }

    #[test]
    fn test_default_tick_count() {
        let json = r#"{"cmd":"tick"}"#;
        let cmd = Command::from_json(json).unwrap();
        assert!(matches!(cmd, Command::Tick { count: 1 }));
    }

    #[test]
    fn test_parse_bare_start_command() {
        let json = r#"{"cmd":"start"}"#;
        let cmd = Command::from_json(json).unwrap();
        assert!(matches!(
            cmd,
            Command::Start {
                deck: None,
                mode: None,
                time_limit_secs: None,
            }
        ));
    }

    #[test]
    fn test_parse_start_command_with_overrides() {
        let json = r#"{"cmd":"start","mode":"Defense","time_limit_secs":90}"#;
        let cmd = Command::from_json(json).unwrap();
        assert!(matches!(
            cmd,
            Command::Start {
                deck: None,
                mode: Some(BattleMode::Defense),
                time_limit_secs: Some(90),
            }
        ));
    }

    #[test]
    fn test_parse_swipe_command() {
        let json = r#"{"cmd":"swipe","direction":"Center"}"#;
        let cmd = Command::from_json(json).unwrap();
        assert!(matches!(
            cmd,
            Command::Swipe {
                direction: SwipeDirection::Center
            }
        ));
    }

    #[test]
    fn test_serialize_hud_response() {
        let hud = HudState {
            time_left_secs: 599,
            player_alive: 5,
            enemy_alive: 4,
            skill_cooldowns: [0.0, 0.5, 0.0, 1.0],
        };
        let json = Response::hud(20, &hud).to_json_line();
        assert!(json.contains(r#""type":"hud""#));
        assert!(json.contains(r#""tick":20"#));
        assert!(json.contains(r#""enemy_alive":4"#));
        assert!(json.ends_with('\n'));
    }

    #[test]
    fn test_serialize_result_response() {
        let result = BattleResult::tally(BattleOutcome::Victory, BattleMode::Attack, 3, 45);
        let json = Response::result(900, &result).to_json_line();
        assert!(json.contains(r#""type":"result""#));
        assert!(json.contains(r#""outcome":"Victory""#));
        assert!(json.contains(r#""resource_reward":260"#));
    }

    #[test]
    fn test_command_names_match_wire_tags() {
        let commands = [
            (r#"{"cmd":"query"}"#, "query"),
            (r#"{"cmd":"hash"}"#, "hash"),
            (r#"{"cmd":"skill","slot":2}"#, "skill"),
            (r#"{"cmd":"auto","enabled":false}"#, "auto"),
            (r#"{"cmd":"save_replay","path":"out.replay"}"#, "save_replay"),
            (r#"{"cmd":"quit"}"#, "quit"),
        ];
        for (json, name) in commands {
            assert_eq!(Command::from_json(json).unwrap().name(), name);
        }
    }

    #[test]
    fn test_unknown_command_is_an_error() {
        assert!(Command::from_json(r#"{"cmd":"teleport","x":1}"#).is_err());
    }
}
