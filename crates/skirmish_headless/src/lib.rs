//! Headless battle runner for balance testing and CI verification.
//!
//! This crate provides a headless battle runner that can be controlled via
//! JSON commands on stdin, with battle state output on stdout. This enables:
//!
//! - **Balance testing**: Batch sweeps over deck tiers without graphics
//! - **CI verification**: Automated testing of battle logic and determinism
//! - **Replay verification**: Check that recorded battles reproduce their hashes
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from controller (start, tick, skill, swipe, etc.)
//! - **stdout**: State updates and responses (JSON)
//! - **stderr**: Debug logs (human-readable)
//!
//! See the [`protocol`] module for the full command and response set.
//!
//! # Example
//!
//! ```bash
//! # Run interactively
//! echo '{"cmd":"start"}
//! {"cmd":"tick","count":60}' | cargo run -p skirmish_headless
//!
//! # Play a scenario script
//! cargo run -p skirmish_headless -- run --scenario scenarios/defense.ron
//!
//! # Verify a recorded battle
//! cargo run -p skirmish_headless -- replay --file battle.replay --verify
//! ```

pub mod batch;
pub mod protocol;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, BatchConfig, BatchResults, BatchSummary};
pub use protocol::{Command, Response};
pub use runner::{run_scenario, HeadlessConfig, HeadlessRunner, RunnerError, ScenarioRun};
pub use scenario::{Scenario, ScenarioError, ScriptEntry};
