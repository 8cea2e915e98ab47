//! Pooled particle effects
//!
//! A fixed set of sprites recycled round-robin. Spawning the oldest particle
//! again simply restarts it.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::easing::Easing;
use super::sprite::{EntityId, Property, Rgb, Sprite, Sprites, Value};
use super::tween::{TweenOptions, Tweener};
use crate::consts::PARTICLE_LIFETIME;
use crate::error::TweenError;

/// Starting opacity of a fresh particle
const SPAWN_OPACITY: i32 = 128;
const SPAWN_SIZE: f32 = 1.5;
const END_SIZE: f32 = 2.5;
/// Draw above tokens
const PARTICLE_LAYER: i32 = 3;

#[derive(Debug, Clone, Default)]
pub struct ParticlePool {
    entities: Vec<EntityId>,
    next: usize,
}

impl ParticlePool {
    /// Create `size` hidden particle sprites
    pub fn new(sprites: &mut Sprites, size: usize) -> Self {
        let entities = (0..size)
            .map(|_| {
                sprites.spawn(Sprite {
                    opacity: 0,
                    size: 0.0,
                    layer: PARTICLE_LAYER,
                    ..Sprite::new(Vec2::ZERO)
                })
            })
            .collect();
        Self { entities, next: 0 }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// Start a particle at `pos` that fades out while growing, optionally
    /// drifting by `heading`. Returns `None` for an empty pool.
    pub fn spawn<C>(
        &mut self,
        now: f64,
        tweener: &mut Tweener<C>,
        sprites: &mut Sprites,
        pos: Vec2,
        color: Rgb,
        heading: Option<Vec2>,
    ) -> Result<Option<EntityId>, TweenError> {
        let Some(&entity) = self.entities.get(self.next) else {
            return Ok(None);
        };
        self.next = (self.next + 1) % self.entities.len();

        tweener.cancel_entity(entity);
        if let Some(sprite) = sprites.get_mut(entity) {
            sprite.position = pos;
            sprite.color = color;
            sprite.opacity = SPAWN_OPACITY as u8;
            sprite.size = SPAWN_SIZE;
        }

        let opts = TweenOptions::default();
        tweener.tween(now, entity, Property::Opacity, Value::Integer(0), PARTICLE_LIFETIME, opts)?;
        tweener.tween(now, entity, Property::Size, Value::Scalar(END_SIZE), PARTICLE_LIFETIME, opts)?;
        if let Some(heading) = heading {
            tweener.tween(
                now,
                entity,
                Property::Position,
                Value::Vector(pos + heading),
                PARTICLE_LIFETIME,
                opts.easing(Easing::OutQuad),
            )?;
        }
        Ok(Some(entity))
    }

    /// Spray `count` particles outward from `pos` in random directions
    #[allow(clippy::too_many_arguments)]
    pub fn burst<C>(
        &mut self,
        now: f64,
        tweener: &mut Tweener<C>,
        sprites: &mut Sprites,
        pos: Vec2,
        color: Rgb,
        count: usize,
        rng: &mut impl Rng,
    ) -> Result<(), TweenError> {
        for _ in 0..count {
            let angle = rng.random_range(0.0..TAU);
            let reach = rng.random_range(0.5..1.5);
            let heading = Vec2::from_angle(angle) * reach;
            self.spawn(now, tweener, sprites, pos, color, Some(heading))?;
        }
        Ok(())
    }
}
