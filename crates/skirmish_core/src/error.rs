//! Error types for the battle simulation.

use thiserror::Error;

/// Result type alias using [`BattleError`].
pub type Result<T> = std::result::Result<T, BattleError>;

/// Top-level error type for all battle simulation errors.
#[derive(Debug, Error)]
pub enum BattleError {
    /// Deck entry with a tier outside the supported range.
    #[error("Invalid unit tier {tier}: expected {min}-{max}")]
    InvalidTier {
        /// The rejected tier value.
        tier: u8,
        /// Lowest supported tier.
        min: u8,
        /// Highest supported tier.
        max: u8,
    },

    /// Battle configured with a zero time limit.
    #[error("Time limit must be at least one second")]
    ZeroTimeLimit,

    /// Invalid battle state.
    #[error("Invalid battle state: {0}")]
    InvalidState(String),

    /// Replay recorded with an incompatible format version.
    #[error("Replay version mismatch: expected {expected}, got {got}")]
    ReplayVersionMismatch {
        /// Version this build understands.
        expected: u32,
        /// Version found in the replay data.
        got: u32,
    },
}
