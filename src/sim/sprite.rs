//! Animatable entities
//!
//! The engine never renders anything. It owns a store of plain sprites whose
//! properties (position, size, opacity, color) the presentation layer reads
//! each frame, and tweens write through the [`Animatable`] trait.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Opaque handle to an animatable entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
}

/// Property a tween can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Property {
    Position,
    Size,
    Opacity,
    Color,
}

/// A property value. The variant of a tween's end value selects how it is
/// interpolated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Scalar(f32),
    /// Integral values round to the nearest integer after interpolation
    Integer(i32),
    Vector(Vec2),
    Color(Rgb),
}

impl Value {
    /// Interpolate from `start` toward `self` by eased progress `t`.
    ///
    /// Returns `None` when the two values are of different kinds (a scalar
    /// start is accepted for an integer end and vice versa).
    pub fn lerp_from(self, start: Value, t: f32) -> Option<Value> {
        match (start, self) {
            (Value::Vector(a), Value::Vector(b)) => Some(Value::Vector(a + (b - a) * t)),
            (Value::Integer(a), Value::Integer(b)) => {
                Some(Value::Integer(ilerp(a as f32, b as f32, t)))
            }
            (Value::Scalar(a), Value::Integer(b)) => Some(Value::Integer(ilerp(a, b as f32, t))),
            (Value::Scalar(a), Value::Scalar(b)) => Some(Value::Scalar(a + (b - a) * t)),
            (Value::Integer(a), Value::Scalar(b)) => {
                Some(Value::Scalar(a as f32 + (b - a as f32) * t))
            }
            (Value::Color(a), Value::Color(b)) => Some(Value::Color(Rgb(
                channel(a.0, b.0, t),
                channel(a.1, b.1, t),
                channel(a.2, b.2, t),
            ))),
            _ => None,
        }
    }
}

fn ilerp(a: f32, b: f32, t: f32) -> i32 {
    (a + (b - a) * t).round() as i32
}

fn channel(a: u8, b: u8, t: f32) -> u8 {
    ilerp(a as f32, b as f32, t).clamp(0, 255) as u8
}

/// Read/write access to entity properties
pub trait Animatable {
    /// Current value, or `None` if the entity no longer exists
    fn read(&self, entity: EntityId, property: Property) -> Option<Value>;

    /// Write a value. Returns `false` if the entity is gone or the value
    /// does not fit the property.
    fn write(&mut self, entity: EntityId, property: Property, value: Value) -> bool;
}

/// Visual state of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub position: Vec2,
    pub size: f32,
    /// 0-255
    pub opacity: u8,
    pub color: Rgb,
    /// Draw order hint for the presentation layer
    pub layer: i32,
}

impl Sprite {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            size: 1.0,
            opacity: 255,
            color: Rgb::WHITE,
            layer: 1,
        }
    }
}

/// Flat store of sprites addressed by [`EntityId`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sprites {
    entries: Vec<Option<Sprite>>,
}

impl Sprites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sprite and return its handle
    pub fn spawn(&mut self, sprite: Sprite) -> EntityId {
        let id = EntityId(self.entries.len() as u32);
        self.entries.push(Some(sprite));
        id
    }

    /// Remove a sprite; its handle stays dead
    pub fn despawn(&mut self, id: EntityId) -> Option<Sprite> {
        self.entries.get_mut(id.0 as usize).and_then(Option::take)
    }

    pub fn get(&self, id: EntityId) -> Option<&Sprite> {
        self.entries.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Sprite> {
        self.entries.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    /// Live sprites with their handles
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Sprite)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (EntityId(i as u32), s)))
    }

    pub fn len(&self) -> usize {
        self.entries.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Animatable for Sprites {
    fn read(&self, entity: EntityId, property: Property) -> Option<Value> {
        let sprite = self.get(entity)?;
        Some(match property {
            Property::Position => Value::Vector(sprite.position),
            Property::Size => Value::Scalar(sprite.size),
            Property::Opacity => Value::Integer(sprite.opacity as i32),
            Property::Color => Value::Color(sprite.color),
        })
    }

    fn write(&mut self, entity: EntityId, property: Property, value: Value) -> bool {
        let Some(sprite) = self.get_mut(entity) else {
            return false;
        };
        match (property, value) {
            (Property::Position, Value::Vector(v)) => sprite.position = v,
            (Property::Size, Value::Scalar(s)) => sprite.size = s.max(0.0),
            (Property::Size, Value::Integer(s)) => sprite.size = s.max(0) as f32,
            (Property::Opacity, Value::Integer(o)) => sprite.opacity = o.clamp(0, 255) as u8,
            (Property::Opacity, Value::Scalar(o)) => {
                sprite.opacity = o.round().clamp(0.0, 255.0) as u8
            }
            (Property::Color, Value::Color(c)) => sprite.color = c,
            _ => return false,
        }
        true
    }
}
