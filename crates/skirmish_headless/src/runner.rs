//! Interactive runner and scripted scenario playback.
//!
//! Two entry points:
//!
//! - [`HeadlessRunner`] owns one battle and processes protocol commands
//!   read from stdin, one JSON line at a time. The scenario only
//!   supplies the setup here; the driver is the script.
//! - [`run_scenario`] plays a scenario's own command script to
//!   completion without a driver, emitting HUD and result lines.
//!
//! Both record the command stream as they go, so every run can be
//! saved as a replay and verified later.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use skirmish_core::battle::{Battle, BattleConfig, BattlePhase, TICK_RATE};
use skirmish_core::catalog::DeckEntry;
use skirmish_core::commands::{BattleCommand, BattleMode};
use skirmish_core::error::BattleError;
use skirmish_core::events::BattleResult;
use skirmish_core::replay::BattleReplay;

use crate::protocol::{Command, PointState, Response, UnitState};
use crate::scenario::{Scenario, ScenarioError};

/// Error type for runner operations.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Scenario loading failed.
    #[error("Scenario error: {0}")]
    Scenario(#[from] ScenarioError),
    /// The simulation rejected a setup or command.
    #[error("Battle error: {0}")]
    Battle(#[from] BattleError),
    /// Reading or writing protocol lines failed.
    #[error("Runner IO failed: {0}")]
    Io(#[from] std::io::Error),
    /// The battle outlived its own clock without producing a result.
    #[error("Battle still running after {0} ticks")]
    NoResult(u64),
}

/// Configuration for the interactive runner.
#[derive(Debug, Clone, Default)]
pub struct HeadlessConfig {
    /// Scenario file to load. `None` uses the default scenario.
    pub scenario_path: Option<PathBuf>,
    /// Emit a full state line after every tick command.
    pub auto_state: bool,
    /// Write the recorded replay here when the session ends.
    pub record_path: Option<PathBuf>,
}

/// Interactive headless runner.
///
/// Holds a battle built from the scenario and mutates it in response
/// to protocol commands. Responses are returned rather than printed by
/// [`HeadlessRunner::handle_command`], which keeps the command logic
/// testable without a terminal.
pub struct HeadlessRunner {
    config: HeadlessConfig,
    scenario: Scenario,
    battle: Battle,
    replay: BattleReplay,
}

impl HeadlessRunner {
    /// Create a runner with the default configuration.
    ///
    /// # Errors
    /// Returns an error if the default scenario produces an invalid
    /// battle setup.
    pub fn new() -> Result<Self, RunnerError> {
        Self::with_config(HeadlessConfig::default())
    }

    /// Create a runner with the given configuration.
    ///
    /// # Errors
    /// Returns an error if the scenario cannot be loaded or its setup
    /// is invalid.
    pub fn with_config(config: HeadlessConfig) -> Result<Self, RunnerError> {
        let scenario = match &config.scenario_path {
            Some(path) => Scenario::load(path)?,
            None => Scenario::default(),
        };
        let battle_config = scenario.to_battle_config();
        let battle = Battle::new(battle_config)?;
        let replay = BattleReplay::new(scenario.name.clone(), battle_config);
        Ok(Self {
            config,
            scenario,
            battle,
            replay,
        })
    }

    /// The battle being driven.
    #[must_use]
    pub const fn battle(&self) -> &Battle {
        &self.battle
    }

    /// The scenario this runner was built from.
    #[must_use]
    pub const fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// The command stream recorded so far.
    #[must_use]
    pub const fn replay(&self) -> &BattleReplay {
        &self.replay
    }

    /// Run the stdin/stdout protocol loop until quit or EOF.
    ///
    /// # Errors
    /// Returns an error if reading stdin fails.
    pub fn run(mut self) -> Result<(), RunnerError> {
        info!(scenario = %self.scenario.name, "Headless runner ready");
        Self::print_response(&Response::ready(
            &self.scenario.name,
            self.battle.get_tick(),
        ));

        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let command = match Command::from_json(trimmed) {
                Ok(command) => command,
                Err(e) => {
                    Self::print_response(&Response::error(format!("Invalid command: {e}"), None));
                    continue;
                }
            };

            if matches!(command, Command::Quit) {
                Self::print_response(&Response::Bye);
                break;
            }

            for response in self.handle_command(command) {
                Self::print_response(&response);
            }
        }

        self.save_recording();
        Ok(())
    }

    /// Process one protocol command, returning the responses to emit.
    pub fn handle_command(&mut self, command: Command) -> Vec<Response> {
        let name = command.name();
        match command {
            Command::Start {
                deck,
                mode,
                time_limit_secs,
            } => self.handle_start(deck, mode, time_limit_secs),
            Command::Tick { count } => self.handle_tick(count),
            Command::Query => vec![self.state_response()],
            Command::Skill { slot } => self.queue_battle_command(BattleCommand::Skill { slot }, name),
            Command::Swipe { direction } => {
                self.queue_battle_command(BattleCommand::Swipe { direction }, name)
            }
            Command::Auto { enabled } => {
                self.queue_battle_command(BattleCommand::AutoToggle { auto: enabled }, name)
            }
            Command::Hash => vec![Response::StateHash {
                tick: self.battle.get_tick(),
                hash: self.battle.state_hash(),
            }],
            Command::SaveReplay { path } => self.handle_save_replay(&path),
            Command::Quit => vec![Response::Bye],
        }
    }

    /// Start the battle, overriding scenario fields where given.
    ///
    /// The battle is rebuilt rather than started in place, so the
    /// recorded command stream always begins at tick zero and replays
    /// cleanly.
    fn handle_start(
        &mut self,
        deck: Option<[DeckEntry; 5]>,
        mode: Option<BattleMode>,
        time_limit_secs: Option<u32>,
    ) -> Vec<Response> {
        if self.battle.phase() != BattlePhase::Pending {
            return vec![Response::error("Battle already started", Some("start"))];
        }

        let base = self.scenario.to_battle_config();
        let config = BattleConfig {
            deck: deck.unwrap_or(base.deck),
            mode: mode.unwrap_or(base.mode),
            time_limit_secs: time_limit_secs.unwrap_or(base.time_limit_secs),
        };

        let mut battle = match Battle::new(config) {
            Ok(battle) => battle,
            Err(e) => {
                return vec![Response::error(
                    format!("Rejected start: {e}"),
                    Some("start"),
                )]
            }
        };
        if let Err(e) = battle.start() {
            return vec![Response::error(
                format!("Rejected start: {e}"),
                Some("start"),
            )];
        }

        self.battle = battle;
        self.replay = BattleReplay::new(self.scenario.name.clone(), config);
        if !self.scenario.auto {
            self.record_and_queue(BattleCommand::AutoToggle { auto: false });
        }

        info!(mode = ?config.mode, time_limit_secs = config.time_limit_secs, "Battle started");
        vec![Response::ack("start")]
    }

    /// Advance the battle, surfacing HUD and result events as lines.
    fn handle_tick(&mut self, count: u32) -> Vec<Response> {
        if self.battle.phase() != BattlePhase::Active {
            return vec![Response::error("Battle not running", Some("tick"))];
        }

        let mut responses = Vec::new();
        for _ in 0..count {
            let events = self.battle.tick();
            if let Some(hud) = events.hud {
                responses.push(Response::hud(self.battle.get_tick(), &hud));
            }
            if let Some(result) = events.result {
                self.replay
                    .finalize(self.battle.get_tick(), self.battle.state_hash());
                responses.push(Response::result(self.battle.get_tick(), &result));
                break;
            }
        }

        if self.config.auto_state {
            responses.push(self.state_response());
        } else if !matches!(responses.last(), Some(Response::Result { .. })) {
            responses.push(Response::ack("tick"));
        }
        responses
    }

    /// Queue a battle command, recording it for replay.
    fn queue_battle_command(&mut self, command: BattleCommand, name: &str) -> Vec<Response> {
        match self.battle.phase() {
            BattlePhase::Pending => vec![Response::error("Battle not started", Some(name))],
            BattlePhase::Ended => vec![Response::error("Battle already ended", Some(name))],
            BattlePhase::Active => {
                self.record_and_queue(command);
                vec![Response::ack(name)]
            }
        }
    }

    fn record_and_queue(&mut self, command: BattleCommand) {
        self.replay.record(self.battle.get_tick(), command.clone());
        self.battle.queue_command(command);
    }

    fn handle_save_replay(&mut self, path: &str) -> Vec<Response> {
        self.replay
            .finalize(self.battle.get_tick(), self.battle.state_hash());
        match self.replay.save(path) {
            Ok(()) => vec![Response::ReplaySaved {
                path: path.to_string(),
                commands: self.replay.command_count(),
                tick: self.battle.get_tick(),
            }],
            Err(e) => vec![Response::error(
                format!("Failed to save replay: {e}"),
                Some("save_replay"),
            )],
        }
    }

    /// Full battle state as a protocol response.
    fn state_response(&self) -> Response {
        Response::State {
            tick: self.battle.get_tick(),
            phase: self.battle.phase(),
            time_left_secs: self.battle.time_left_secs(),
            auto: self.battle.auto_enabled(),
            units: self.battle.units().iter().map(UnitState::from_unit).collect(),
            points: self
                .battle
                .capture_points()
                .iter()
                .map(PointState::from_point)
                .collect(),
            hash: self.battle.state_hash(),
        }
    }

    /// Write the session recording if one was requested.
    fn save_recording(&mut self) {
        let Some(path) = self.config.record_path.clone() else {
            return;
        };
        self.replay
            .finalize(self.battle.get_tick(), self.battle.state_hash());
        match self.replay.save(&path) {
            Ok(()) => info!(
                path = %path.display(),
                commands = self.replay.command_count(),
                "Session replay saved"
            ),
            Err(error) => warn!(%error, path = %path.display(), "Failed to save session replay"),
        }
    }

    fn print_response(response: &Response) {
        print!("{}", response.to_json_line());
        io::stdout().flush().ok();
    }
}

/// Outcome of a scripted scenario run.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    /// Final accounting of the battle.
    pub result: BattleResult,
    /// Recorded command stream, finalized for verification.
    pub replay: BattleReplay,
    /// Tick the battle ended on.
    pub final_tick: u64,
    /// State hash at the final tick.
    pub final_hash: u64,
}

/// Play a scenario's command script to completion.
///
/// Writes protocol lines to the sink: a `ready` line, one `hud` line
/// per battle second, and a single closing `result` line. The returned
/// replay verifies against the run.
///
/// # Errors
/// Returns an error if the scenario setup is invalid or the sink
/// rejects a write.
pub fn run_scenario<W: Write>(scenario: &Scenario, sink: &mut W) -> Result<ScenarioRun, RunnerError> {
    let config = scenario.to_battle_config();
    let mut battle = Battle::new(config)?;
    let mut replay = BattleReplay::new(scenario.name.clone(), config);
    battle.start()?;

    info!(scenario = %scenario.name, mode = ?scenario.mode, "Scenario started");
    sink.write_all(
        Response::ready(&scenario.name, battle.get_tick())
            .to_json_line()
            .as_bytes(),
    )?;

    if !scenario.auto {
        let command = BattleCommand::AutoToggle { auto: false };
        replay.record(battle.get_tick(), command.clone());
        battle.queue_command(command);
    }

    // The clock guarantees an end within the limit; one extra tick of
    // slack covers the expiry tick itself.
    let max_ticks = u64::from(scenario.time_limit_secs) * u64::from(TICK_RATE) + 1;
    let mut outcome = None;
    for _ in 0..max_ticks {
        if battle.phase() == BattlePhase::Ended {
            break;
        }
        for entry in scenario.commands_at_tick(battle.get_tick()) {
            replay.record(entry.tick, entry.command.clone());
            battle.queue_command(entry.command.clone());
        }

        let events = battle.tick();
        if let Some(hud) = events.hud {
            sink.write_all(Response::hud(battle.get_tick(), &hud).to_json_line().as_bytes())?;
        }
        if let Some(result) = events.result {
            sink.write_all(
                Response::result(battle.get_tick(), &result)
                    .to_json_line()
                    .as_bytes(),
            )?;
            outcome = Some(result);
            break;
        }
    }

    let Some(result) = outcome else {
        return Err(RunnerError::NoResult(battle.get_tick()));
    };

    replay.finalize(battle.get_tick(), battle.state_hash());
    info!(
        outcome = ?result.outcome,
        ticks = battle.get_tick(),
        survivors = result.survivors,
        "Scenario finished"
    );

    Ok(ScenarioRun {
        result,
        final_tick: battle.get_tick(),
        final_hash: battle.state_hash(),
        replay,
    })
}
