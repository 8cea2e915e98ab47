//! Engine error types
//!
//! Board queries use explicit enums for routine control flow; these errors
//! cover the cases a caller has to react to.

use crate::sim::{Coord, TokenId};

/// Errors raised by grid queries and mutations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    /// Coordinate lies outside the board extent
    #[error("coordinate {0} is outside the board")]
    OutOfBounds(Coord),

    /// Coordinate is on the board but holds no token
    #[error("no token at {0}")]
    CellMissing(Coord),

    /// Token id was never issued by this grid
    #[error("unknown token {0:?}")]
    UnknownToken(TokenId),

    /// Target cell already holds another token
    #[error("cell {0} is already occupied")]
    CellOccupied(Coord),

    /// A full-board scan met an empty cell: something is still animating
    #[error("board is mid-transition (empty cell at {0})")]
    BoardUnsettled(Coord),

    /// Swap target is not orthogonally adjacent to the source
    #[error("cannot swap {from} with {to}")]
    InvalidSwap { from: Coord, to: Coord },

    /// Refill found more empty cells than recycled tokens
    #[error("refill pool exhausted with {missing} empty cell(s) left in column {column}")]
    PoolExhausted { column: i32, missing: usize },
}

/// Errors raised by tweeners and the easing library
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TweenError {
    /// A tween was added to a one-shot tweener that already fired
    #[error("tween added to a tweener that already completed")]
    TweenerMisuse,

    /// Easing name not recognised
    #[error("unknown easing function: {0}")]
    UnknownEasing(String),

    /// Negative or non-finite duration/delay
    #[error("invalid tween duration {0}")]
    InvalidDuration(f64),
}

/// Errors raised by the timer scheduler
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    /// Negative or non-finite delay
    #[error("invalid timer delay {0}")]
    InvalidDuration(f64),

    /// Repeating timers need a positive period
    #[error("invalid repeat period {0}")]
    InvalidPeriod(f64),
}

/// Errors raised while loading or validating configuration
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Umbrella error for a game session
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Tween(#[from] TweenError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;
