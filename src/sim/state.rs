//! Session state and core simulation types
//!
//! Everything a session owns lives here: the board, the clock-driven
//! collaborators (scheduler, tweeners), combatants, sprites and the RNG.

use std::collections::BTreeMap;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::combat::{ActorKind, Combatants, Effect};
use super::events::EventBus;
use super::grid::{Coord, Grid, GridSnapshot, TokenId, TokenKind};
use super::particles::ParticlePool;
use super::scheduler::{Scheduler, TimerHandle};
use super::sprite::{EntityId, Sprite, Sprites};
use super::tween::Tweener;
use crate::config::EngineConfig;
use crate::consts::*;
use crate::error::Result;
use crate::position_of;

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for Enter
    Title,
    Playing,
    /// Paused behind the menu; the session clock stops
    Menu,
    /// Player died; Enter restarts
    GameOver,
}

/// Resolution sub-step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStep {
    /// Matched tokens are flying off the board
    Clearing,
    /// Gravity and new tokens are settling
    Refilling,
}

/// Board state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardPhase {
    /// Accepting input
    Idle,
    /// A token is being dragged
    Held { token: TokenId, origin: Coord },
    /// Swap or snap-back animating
    Swapping,
    Resolving(ResolveStep),
    /// A token is turning corrupted
    Corrupting,
}

impl BoardPhase {
    /// Input and corruption are locked out
    pub fn is_frozen(&self) -> bool {
        matches!(
            self,
            BoardPhase::Swapping | BoardPhase::Resolving(_) | BoardPhase::Corrupting
        )
    }
}

/// Deferred work, run by the session when a timer fires or a tweener drains
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    SwapSettled,
    SnapBackSettled,
    RefillSettled,
    /// A cleared token starts its flight
    StartSparkle { token: TokenId },
    /// Emit one sparkle particle behind a flying token
    Spark { token: TokenId },
    /// A cleared token reached its destination; the last landing of a
    /// pass settles the clear
    FlightLanded { token: TokenId, effect: Effect },
    /// Wind-up finished: the monster's strike lands
    EnemyStrike { amount: i32 },
    Shake,
    StopShake,
    MonsterSunk,
    /// Periodic corruption attempt
    Corrupt,
    CorruptionSettled { token: TokenId },
}

/// Active monster shake timers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shake {
    pub timer: TimerHandle,
    pub stop: TimerHandle,
}

/// Complete session state
pub struct GameState {
    pub config: EngineConfig,
    /// Session clock in seconds; stands still outside play
    pub now: f64,
    /// Last host time passed to `tick`
    pub last_host_time: Option<f64>,
    pub session: SessionPhase,
    pub board: BoardPhase,
    pub grid: Grid,
    pub sprites: Sprites,
    pub scheduler: Scheduler<Task>,
    /// One-shot animation batches
    pub tweeners: Vec<Tweener<Task>>,
    /// Long-lived tweener for particles and actor effects
    pub effects: Tweener<Task>,
    pub particles: ParticlePool,
    pub combatants: Combatants,
    pub bus: EventBus,
    pub rng: Pcg32,
    pub score: u64,
    /// Token picked by a click, waiting for a neighbour
    pub selection: Option<Coord>,
    /// A scan was deferred because the board was mid-transition
    pub pending_scan: bool,
    /// Cleared tokens still flying
    pub flights_pending: usize,
    pub sparkles: BTreeMap<TokenId, TimerHandle>,
    pub shake: Option<Shake>,
    pub corruption: Option<TimerHandle>,
    pub player_entity: EntityId,
    pub monster_entity: EntityId,
}

impl std::fmt::Debug for GameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameState")
            .field("now", &self.now)
            .field("session", &self.session)
            .field("board", &self.board)
            .field("score", &self.score)
            .field("combatants", &self.combatants)
            .finish_non_exhaustive()
    }
}

/// Where tokens fly to for a given actor
pub fn anchor(actor: ActorKind) -> Vec2 {
    match actor {
        ActorKind::Player => Vec2::new(PLAYER_X, 0.0),
        ActorKind::Monster => Vec2::new(MONSTER_X, 0.0),
    }
}

impl GameState {
    /// New session on a randomly filled board
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = Pcg32::seed_from_u64(config.seed);
        let mut sprites = Sprites::new();
        let mut grid = Grid::new(config.board_half_extent);
        for c in grid.coords() {
            let kind = random_color(&mut rng);
            let id = grid.add_token(kind, spawn_token_sprite(&mut sprites, c, kind));
            grid.place(id, c)?;
        }
        Ok(Self::assemble(config, grid, sprites, rng))
    }

    /// New session on a known board
    pub fn from_snapshot(config: EngineConfig, snapshot: &GridSnapshot) -> Result<Self> {
        config.validate()?;
        let rng = Pcg32::seed_from_u64(config.seed);
        let mut sprites = Sprites::new();
        let grid = Grid::from_snapshot(snapshot, |c, kind| {
            spawn_token_sprite(&mut sprites, c, kind)
        })?;
        Ok(Self::assemble(config, grid, sprites, rng))
    }

    fn assemble(config: EngineConfig, grid: Grid, mut sprites: Sprites, rng: Pcg32) -> Self {
        let player_entity = sprites.spawn(Sprite {
            size: 2.0,
            ..Sprite::new(anchor(ActorKind::Player))
        });
        let monster_entity = sprites.spawn(Sprite {
            size: 2.0,
            ..Sprite::new(anchor(ActorKind::Monster))
        });
        let particles = ParticlePool::new(&mut sprites, PARTICLE_POOL_SIZE);
        let combatants = Combatants::new(&config);

        Self {
            config,
            now: 0.0,
            last_host_time: None,
            session: SessionPhase::Title,
            board: BoardPhase::Idle,
            grid,
            sprites,
            scheduler: Scheduler::new(),
            tweeners: Vec::new(),
            effects: Tweener::reusable(),
            particles,
            combatants,
            bus: EventBus::new(),
            rng,
            score: 0,
            selection: None,
            pending_scan: false,
            flights_pending: 0,
            sparkles: BTreeMap::new(),
            shake: None,
            corruption: None,
            player_entity,
            monster_entity,
        }
    }

    /// Fresh session with the same config and subscribers, reseeded from
    /// this session's RNG
    pub fn restart(&mut self) -> Result<()> {
        let mut config = self.config.clone();
        config.seed = self.rng.random();
        let mut next = GameState::new(config)?;
        std::mem::swap(&mut next.bus, &mut self.bus);
        next.last_host_time = self.last_host_time;
        *self = next;
        Ok(())
    }

    /// Whether nothing is animating or waiting on the board
    pub fn is_settled(&self) -> bool {
        self.board == BoardPhase::Idle && self.tweeners.is_empty() && self.grid.is_full()
    }

    pub fn snapshot(&self) -> GridSnapshot {
        self.grid.snapshot()
    }

    /// Sprite entity of the token at a board coordinate
    pub fn entity_at(&self, c: Coord) -> Option<EntityId> {
        self.grid.get(c).ok().map(|t| t.entity)
    }

    pub fn entity_of(&self, token: TokenId) -> Option<EntityId> {
        self.grid.token(token).map(|t| t.entity)
    }

    /// Sprite entity standing for an actor
    pub fn actor_entity(&self, actor: ActorKind) -> EntityId {
        match actor {
            ActorKind::Player => self.player_entity,
            ActorKind::Monster => self.monster_entity,
        }
    }
}

/// Uniform pick from the five colors
pub fn random_color(rng: &mut impl Rng) -> TokenKind {
    TokenKind::COLORS[rng.random_range(0..TokenKind::COLORS.len())]
}

fn spawn_token_sprite(sprites: &mut Sprites, c: Coord, kind: TokenKind) -> EntityId {
    sprites.spawn(Sprite {
        color: kind.tint(),
        ..Sprite::new(position_of(c))
    })
}
