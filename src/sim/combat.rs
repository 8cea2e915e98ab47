//! Player vs monster: health, shields and match outcomes
//!
//! Matched seeds turn into effects by kind:
//! - red, yellow and white deal one point of damage each to the monster
//! - green heals the player a flat amount if any were matched
//! - blue grants the player a flat shield if any were matched
//! - corrupted seeds make the monster strike back

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::events::{GameEvent, SoundId};
use super::grid::{MatchSet, TokenKind};
use crate::config::{EnemyStats, EngineConfig};

/// The two sides of an encounter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActorKind {
    Player,
    Monster,
}

/// What a hit did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DamageReport {
    /// Taken by the shield
    pub absorbed: i32,
    /// Taken from health
    pub health_lost: i32,
    /// This hit took health to zero
    pub died: bool,
}

/// One combatant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub kind: ActorKind,
    pub health: i32,
    pub max_health: i32,
    pub shield: i32,
    pub max_shield: i32,
    /// Damage per corrupted seed (monster only)
    pub strength: i32,
}

impl Actor {
    pub fn player(config: &EngineConfig) -> Self {
        Self {
            kind: ActorKind::Player,
            health: config.player_max_health,
            max_health: config.player_max_health,
            shield: 0,
            max_shield: config.player_max_shield,
            strength: 0,
        }
    }

    pub fn monster(stats: EnemyStats) -> Self {
        Self {
            kind: ActorKind::Monster,
            health: stats.hp,
            max_health: stats.hp,
            shield: 0,
            max_shield: 0,
            strength: stats.strength,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Shield absorbs first; the rest comes off health, clamped at zero
    pub fn take_damage(&mut self, amount: i32) -> DamageReport {
        if amount <= 0 || !self.is_alive() {
            return DamageReport::default();
        }
        let absorbed = amount.min(self.shield);
        self.shield -= absorbed;
        let health_lost = (amount - absorbed).min(self.health);
        self.health -= health_lost;
        DamageReport {
            absorbed,
            health_lost,
            died: health_lost > 0 && self.health == 0,
        }
    }

    /// Returns the health actually restored
    pub fn heal(&mut self, amount: i32) -> i32 {
        if !self.is_alive() {
            return 0;
        }
        let before = self.health;
        self.health = (self.health + amount.max(0)).min(self.max_health);
        self.health - before
    }

    /// Returns the shield actually gained
    pub fn add_shield(&mut self, amount: i32) -> i32 {
        let before = self.shield;
        self.shield = (self.shield + amount.max(0)).min(self.max_shield);
        self.shield - before
    }
}

/// Effect carried by a cleared seed, applied when it lands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Impact {
    /// Damage to the monster
    Damage(i32),
    /// Heal the player
    Heal(i32),
    /// Shield the player
    Shield(i32),
    /// Monster strikes the player after a wind-up
    Strike(i32),
}

/// Where a cleared seed flies and what it does on arrival
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Effect {
    pub toward: ActorKind,
    pub impact: Option<Impact>,
}

/// Totals of a match set's effects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outcome {
    pub damage: i32,
    pub heal: i32,
    pub shield: i32,
    pub strike: i32,
}

/// Effect for each member of `set`, in member order.
///
/// Flat effects (heal, shield, strike) ride on the first seed of their kind
/// so they land exactly once per pass.
pub fn plan_effects(set: &MatchSet, config: &EngineConfig, monster_strength: i32) -> Vec<Effect> {
    let counts = set.counts();
    let corrupted = counts.get(&TokenKind::Corrupted).copied().unwrap_or(0) as i32;
    let mut carried: Vec<TokenKind> = Vec::new();
    let mut first_of = |kind: TokenKind| {
        if carried.contains(&kind) {
            false
        } else {
            carried.push(kind);
            true
        }
    };

    set.members
        .iter()
        .map(|m| match m.kind {
            TokenKind::Red | TokenKind::Yellow | TokenKind::White => Effect {
                toward: ActorKind::Monster,
                impact: Some(Impact::Damage(1)),
            },
            TokenKind::Green => Effect {
                toward: ActorKind::Player,
                impact: first_of(TokenKind::Green).then_some(Impact::Heal(config.heal_amount)),
            },
            TokenKind::Blue => Effect {
                toward: ActorKind::Player,
                impact: first_of(TokenKind::Blue).then_some(Impact::Shield(config.shield_amount)),
            },
            TokenKind::Corrupted => Effect {
                toward: ActorKind::Monster,
                impact: first_of(TokenKind::Corrupted)
                    .then_some(Impact::Strike(monster_strength * corrupted)),
            },
        })
        .collect()
}

/// Sum a plan into totals
pub fn summarize(effects: &[Effect]) -> Outcome {
    effects
        .iter()
        .filter_map(|e| e.impact)
        .fold(Outcome::default(), |mut out, impact| {
            match impact {
                Impact::Damage(n) => out.damage += n,
                Impact::Heal(n) => out.heal += n,
                Impact::Shield(n) => out.shield += n,
                Impact::Strike(n) => out.strike += n,
            }
            out
        })
}

/// Both actors and the wave counter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Combatants {
    pub player: Actor,
    pub monster: Actor,
    /// Current wave index (0-based)
    pub wave: u32,
}

impl Combatants {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            player: Actor::player(config),
            monster: Actor::monster(config.enemy_for_wave(0)),
            wave: 0,
        }
    }

    pub fn actor(&self, kind: ActorKind) -> &Actor {
        match kind {
            ActorKind::Player => &self.player,
            ActorKind::Monster => &self.monster,
        }
    }

    pub fn actor_mut(&mut self, kind: ActorKind) -> &mut Actor {
        match kind {
            ActorKind::Player => &mut self.player,
            ActorKind::Monster => &mut self.monster,
        }
    }

    /// Apply a combat event. Returns the events it causes.
    pub fn apply(&mut self, event: &GameEvent) -> Vec<GameEvent> {
        let mut follow = Vec::new();
        match *event {
            GameEvent::DamageDealt { target, amount } => {
                let report = self.actor_mut(target).take_damage(amount);
                log::debug!("{target:?} took {amount}: {report:?}");
                if report.absorbed > 0 || report.health_lost > 0 {
                    follow.push(GameEvent::PlaySound(SoundId::Hit));
                }
                if report.died {
                    log::info!("{target:?} died");
                    follow.push(GameEvent::ActorDied { actor: target });
                    follow.push(GameEvent::PlaySound(SoundId::Death));
                }
            }
            GameEvent::Healed { target, amount } => {
                if self.actor_mut(target).heal(amount) > 0 {
                    follow.push(GameEvent::PlaySound(SoundId::Heal));
                }
            }
            GameEvent::ShieldGained { target, amount } => {
                if self.actor_mut(target).add_shield(amount) > 0 {
                    follow.push(GameEvent::PlaySound(SoundId::Shield));
                }
            }
            _ => {}
        }
        follow
    }

    /// Replace the monster with the next wave's
    pub fn next_wave(&mut self, config: &EngineConfig) -> GameEvent {
        self.wave += 1;
        let stats = config.enemy_for_wave(self.wave);
        log::info!("Wave {}: monster hp={} strength={}", self.wave, stats.hp, stats.strength);
        self.monster = Actor::monster(stats);
        GameEvent::WaveStarted { wave: self.wave }
    }

    /// Match composition as reported in `MovementStarted`
    pub fn tally(set: &MatchSet) -> BTreeMap<TokenKind, u32> {
        set.counts()
    }
}
