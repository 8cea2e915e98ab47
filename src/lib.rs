//! Seed Match - match-3 battle engine
//!
//! Core modules:
//! - `sim`: Board state machine, tweening, timers and combat
//! - `config`: Data-driven tuning (board, scoring, enemy table)
//! - `error`: Error types shared across the engine

pub mod config;
pub mod error;
pub mod sim;

pub use config::{EnemyStats, EngineConfig};
pub use error::{EngineError, Result};

use glam::Vec2;

use crate::sim::Coord;

/// Game configuration constants
pub mod consts {
    /// Board half-extent: coordinates run from -2 to 2 (5x5)
    pub const BOARD_HALF_EXTENT: i32 = 2;
    /// Minimum same-type run that counts as a match
    pub const MIN_RUN: usize = 3;

    /// Score for a plain 3-run
    pub const RUN_SCORE: u64 = 250;
    /// Extra score for extending a run to 4
    pub const FOUR_RUN_BONUS: u64 = 250;
    /// Extra score for extending a run to 5
    pub const FIVE_RUN_BONUS: u64 = 500;

    /// Swap animation duration (seconds)
    pub const SWAP_DURATION: f64 = 0.25;
    /// Snap-back animation duration for a rejected drag (seconds)
    pub const SNAP_BACK_DURATION: f64 = 0.25;

    /// Starting value of the stagger factor for cleared tokens
    pub const STAGGER_START: f64 = 0.5;
    /// Multiplier applied to the stagger factor per cleared token
    pub const STAGGER_DECAY: f64 = 0.9;
    /// Flight time per board unit of distance for cleared tokens
    pub const FLIGHT_SECONDS_PER_UNIT: f64 = 0.1;

    /// Delay before sliding/dropping tokens start to fall
    pub const FALL_DELAY: f64 = 0.5;
    /// Base duration of a fall (a random jitter up to `FALL_JITTER` is added)
    pub const FALL_DURATION: f64 = 1.0;
    pub const FALL_JITTER: f64 = 0.25;
    /// Rows above the board that new tokens drop from
    pub const DROP_HEIGHT: f32 = 4.0;
    /// Dropped tokens grow from nothing to full size over this long
    pub const DROP_GROW_DURATION: f64 = 0.25;

    /// Player health and shield caps
    pub const PLAYER_MAX_HEALTH: i32 = 10;
    pub const PLAYER_MAX_SHIELD: i32 = 10;
    /// Flat heal granted when green seeds are matched
    pub const HEAL_AMOUNT: i32 = 2;
    /// Flat shield granted when blue seeds are matched
    pub const SHIELD_AMOUNT: i32 = 3;

    /// Screen-space anchors for the two combatants (board units)
    pub const PLAYER_X: f32 = -5.0;
    pub const MONSTER_X: f32 = 5.0;

    /// How long the monster shakes after being hit
    pub const SHAKE_DURATION: f64 = 0.5;
    /// Seconds between shake jitters
    pub const SHAKE_INTERVAL: f64 = 0.05;
    /// Largest shake offset (board units)
    pub const SHAKE_AMPLITUDE: f32 = 0.2;
    /// Where a defeated monster sinks to before the next wave rises
    pub const MONSTER_SINK_Y: f32 = -8.0;
    /// Duration of the sink and of the rise
    pub const MONSTER_MOVE_DURATION: f64 = 1.0;
    /// Pause between sinking and the next monster rising
    pub const RESPAWN_DELAY: f64 = 1.0;
    /// Wind-up before a triggered enemy attack lands
    pub const ATTACK_WINDUP: f64 = 1.0;
    /// Seconds between corruption attempts
    pub const CORRUPTION_INTERVAL: f64 = 6.0;
    /// Duration of the corruption color shift
    pub const CORRUPTION_DURATION: f64 = 0.75;

    /// Number of pooled particle entities
    pub const PARTICLE_POOL_SIZE: usize = 100;
    /// Particle lifetime (seconds)
    pub const PARTICLE_LIFETIME: f64 = 0.5;
    /// Particles spawned by a landing burst
    pub const BURST_PARTICLES: usize = 10;
    /// Interval between sparkle particles while a token is in flight
    pub const SPARKLE_INTERVAL: f64 = 0.05;
}

/// Board coordinate under a position (nearest cell)
#[inline]
pub fn coord_at(pos: Vec2) -> Coord {
    Coord::new(pos.x.round() as i32, pos.y.round() as i32)
}

/// Resting position of a token at a board coordinate
#[inline]
pub fn position_of(coord: Coord) -> Vec2 {
    Vec2::new(coord.x as f32, coord.y as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coord_at_rounds_to_nearest() {
        assert_eq!(coord_at(Vec2::new(0.4, -0.6)), Coord::new(0, -1));
        assert_eq!(coord_at(Vec2::new(1.5, 2.49)), Coord::new(2, 2));
        assert_eq!(coord_at(position_of(Coord::new(-2, 1))), Coord::new(-2, 1));
    }
}
