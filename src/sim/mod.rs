//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Caller-supplied clock only
//! - Seeded RNG only
//! - Stable iteration order (by coordinate, registration or token id)
//! - No rendering or platform dependencies

pub mod combat;
pub mod easing;
pub mod events;
pub mod grid;
pub mod particles;
pub mod resolve;
pub mod scheduler;
pub mod sprite;
pub mod state;
pub mod tick;
pub mod tween;

pub use combat::{Actor, ActorKind, Combatants, DamageReport, Effect, Impact, Outcome};
pub use easing::{Easing, ease};
pub use events::{EventBus, EventKind, EventLog, GameEvent, SoundId};
pub use grid::{
    Axis, Cell, Coord, Fall, Grid, GridSnapshot, MatchSet, Matched, Run, Token, TokenId, TokenKind,
};
pub use particles::ParticlePool;
pub use scheduler::{Scheduler, TimerHandle};
pub use sprite::{Animatable, EntityId, Property, Rgb, Sprite, Sprites, Value};
pub use state::{BoardPhase, GameState, ResolveStep, SessionPhase, Task};
pub use tick::{InputEvent, Key, TickInput, emit, tick};
pub use tween::{Tween, TweenOptions, Tweener};
