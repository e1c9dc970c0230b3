//! # Skirmish Core
//!
//! Deterministic simulation core for the tactical mini-battle game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness
//! - No floating-point math in simulation state (uses fixed-point)
//!
//! This separation enables:
//! - Headless balance runs
//! - Replay recording and verification
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`battle`] - Battle orchestrator and per-tick pipeline
//! - [`units`] - Combatant state and per-tick behavior
//! - [`catalog`] - Unit stat tables and tier scaling
//! - [`capture`] - Capture point ownership state machine
//! - [`skills`] - Cooldown-gated player abilities
//! - [`ai`] - Priority-based autonomous controllers
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod battle;
pub mod capture;
pub mod catalog;
pub mod commands;
pub mod error;
pub mod events;
pub mod factions;
pub mod map;
pub mod math;
pub mod projectiles;
pub mod replay;
pub mod skills;
pub mod units;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::battle::{Battle, BattleConfig, BattlePhase, TICK_DURATION_MS, TICK_RATE};
    pub use crate::capture::CapturePoint;
    pub use crate::catalog::{DeckEntry, UnitKind, UnitStats};
    pub use crate::commands::{BattleCommand, BattleMode, SwipeDirection};
    pub use crate::error::{BattleError, Result};
    pub use crate::events::{BattleOutcome, BattleResult, HudState, TickEvents};
    pub use crate::factions::Faction;
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::replay::BattleReplay;
    pub use crate::skills::SkillKind;
    pub use crate::units::{Unit, UnitId};
}
