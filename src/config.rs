//! Engine tuning and balance
//!
//! Defaults come from [`crate::consts`]; a build can override them from JSON.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;

/// Monster stats for one entry of the wave table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnemyStats {
    /// Hit points
    pub hp: i32,
    /// Damage per corrupted seed when the monster strikes
    pub strength: i32,
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// RNG seed for refill colors and effects
    pub seed: u64,

    // === Board ===
    /// Board half-extent (2 = 5x5)
    pub board_half_extent: i32,
    /// Minimum run length that counts as a match
    pub min_run: usize,
    /// Score for a minimum-length run
    pub run_score: u64,
    /// Extra score for a 4-run
    pub four_run_bonus: u64,
    /// Extra score for a 5-run (on top of the 4-run bonus)
    pub five_run_bonus: u64,

    // === Timing ===
    /// Swap animation duration (seconds)
    pub swap_duration: f64,
    /// Initial stagger factor for cleared tokens
    pub stagger_start: f64,
    /// Per-token stagger decay
    pub stagger_decay: f64,
    /// Seconds between corruption attempts (0 disables corruption)
    pub corruption_interval: f64,

    // === Combat ===
    pub player_max_health: i32,
    pub player_max_shield: i32,
    /// Flat heal for matching any green seeds
    pub heal_amount: i32,
    /// Flat shield for matching any blue seeds
    pub shield_amount: i32,
    /// Monster stats per wave; cycles with `enemy_cycle_multiplier`
    pub enemy_table: Vec<EnemyStats>,
    /// Stat multiplier applied per full cycle through the table
    pub enemy_cycle_multiplier: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed,

            board_half_extent: BOARD_HALF_EXTENT,
            min_run: MIN_RUN,
            run_score: RUN_SCORE,
            four_run_bonus: FOUR_RUN_BONUS,
            five_run_bonus: FIVE_RUN_BONUS,

            swap_duration: SWAP_DURATION,
            stagger_start: STAGGER_START,
            stagger_decay: STAGGER_DECAY,
            corruption_interval: CORRUPTION_INTERVAL,

            player_max_health: PLAYER_MAX_HEALTH,
            player_max_shield: PLAYER_MAX_SHIELD,
            heal_amount: HEAL_AMOUNT,
            shield_amount: SHIELD_AMOUNT,
            enemy_table: vec![
                EnemyStats { hp: 10, strength: 1 },
                EnemyStats { hp: 14, strength: 1 },
                EnemyStats { hp: 18, strength: 2 },
                EnemyStats { hp: 24, strength: 2 },
                EnemyStats { hp: 30, strength: 3 },
            ],
            enemy_cycle_multiplier: 1.5,
        }
    }
}

impl EngineConfig {
    /// Parse a config from JSON; missing fields fall back to defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.board_half_extent < 1 {
            return Err(ConfigError::Invalid(format!(
                "board_half_extent must be at least 1, got {}",
                self.board_half_extent
            )));
        }
        let side = (self.board_half_extent * 2 + 1) as usize;
        if self.min_run < 2 || self.min_run > side {
            return Err(ConfigError::Invalid(format!(
                "min_run must be between 2 and {side}, got {}",
                self.min_run
            )));
        }
        if !(self.swap_duration.is_finite() && self.swap_duration > 0.0) {
            return Err(ConfigError::Invalid("swap_duration must be positive".into()));
        }
        if !(0.0..1.0).contains(&self.stagger_decay) || !(0.0..=1.0).contains(&self.stagger_start) {
            return Err(ConfigError::Invalid("stagger factors must lie in [0, 1)".into()));
        }
        if self.corruption_interval < 0.0 {
            return Err(ConfigError::Invalid("corruption_interval cannot be negative".into()));
        }
        if self.enemy_table.is_empty() {
            return Err(ConfigError::Invalid("enemy_table cannot be empty".into()));
        }
        if self.enemy_table.iter().any(|e| e.hp <= 0) {
            return Err(ConfigError::Invalid("enemy hp must be positive".into()));
        }
        if self.enemy_table.iter().any(|e| e.strength < 0) {
            return Err(ConfigError::Invalid("enemy strength cannot be negative".into()));
        }
        Ok(())
    }

    /// Side length of the board
    pub fn board_side(&self) -> usize {
        (self.board_half_extent * 2 + 1) as usize
    }

    /// Score for a run of the given length (0 if it does not qualify)
    pub fn score_for_run(&self, len: usize) -> u64 {
        if len < self.min_run {
            return 0;
        }
        let mut score = self.run_score;
        if len > self.min_run {
            score += self.four_run_bonus;
        }
        if len > self.min_run + 1 {
            score += self.five_run_bonus;
        }
        score
    }

    /// Monster stats for a wave index, scaled per full cycle through the table
    pub fn enemy_for_wave(&self, wave: u32) -> EnemyStats {
        let len = self.enemy_table.len().max(1) as u32;
        let base = self
            .enemy_table
            .get((wave % len) as usize)
            .copied()
            .unwrap_or(EnemyStats { hp: 10, strength: 1 });
        let scale = self.enemy_cycle_multiplier.powi((wave / len) as i32);
        EnemyStats {
            hp: ((base.hp as f32) * scale).round().max(1.0) as i32,
            strength: ((base.strength as f32) * scale).round() as i32,
        }
    }
}
