//! Property tweening
//!
//! A [`Tweener`] holds a batch of [`Tween`]s and a list of completion
//! callbacks. Callbacks are plain values handed back from
//! [`Tweener::update`] once every tween in the batch has finished; the owner
//! runs them.
//!
//! Example:
//!
//! ```
//! use glam::Vec2;
//! use seed_match::sim::{Easing, Property, Sprite, Sprites, TweenOptions, Tweener, Value};
//!
//! let mut sprites = Sprites::new();
//! let bomb = sprites.spawn(Sprite::new(Vec2::ZERO));
//!
//! let mut t = Tweener::new();
//! t.tween(0.0, bomb, Property::Position, Value::Vector(Vec2::new(5.0, 0.0)), 1.0,
//!     TweenOptions::default().easing(Easing::OutQuad)).unwrap();
//! t.when_done("BOOM");
//!
//! assert!(t.update(0.5, &mut sprites).is_empty());
//! assert_eq!(t.update(1.0, &mut sprites), vec!["BOOM"]);
//! ```

use super::easing::Easing;
use super::sprite::{Animatable, EntityId, Property, Value};
use crate::error::TweenError;

/// Per-tween options
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TweenOptions {
    /// Seconds before the transition starts
    pub delay: f64,
    pub easing: Easing,
}

impl TweenOptions {
    pub fn delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }
}

/// One property transition
#[derive(Debug, Clone, PartialEq)]
pub struct Tween {
    pub entity: EntityId,
    pub property: Property,
    /// Captured at the first evaluation at or after `start_time`
    pub start_value: Option<Value>,
    pub end_value: Value,
    pub start_time: f64,
    pub end_time: f64,
    pub easing: Easing,
}

impl Tween {
    /// Linear progress at `now`, clamped to [0, 1]
    pub fn progress(&self, now: f64) -> f64 {
        let span = self.end_time - self.start_time;
        if span <= 0.0 {
            return if now >= self.start_time { 1.0 } else { 0.0 };
        }
        ((now - self.start_time) / span).clamp(0.0, 1.0)
    }
}

/// A batch of tweens sharing a completion signal.
///
/// A one-shot tweener (the default) fires its callbacks once and is then
/// finished; adding tweens to it afterwards is a programming error. A
/// reusable tweener accepts new tweens after firing and fires again each
/// time its batch drains, which suits long-lived effect channels.
#[derive(Debug, Clone)]
pub struct Tweener<C> {
    tweens: Vec<Tween>,
    callbacks: Vec<C>,
    used: bool,
    finished: bool,
    reusable: bool,
}

impl<C> Default for Tweener<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Tweener<C> {
    /// One-shot tweener
    pub fn new() -> Self {
        Self {
            tweens: Vec::new(),
            callbacks: Vec::new(),
            used: false,
            finished: false,
            reusable: false,
        }
    }

    /// Tweener that can be refilled after it fires
    pub fn reusable() -> Self {
        Self {
            reusable: true,
            ..Self::new()
        }
    }

    /// Whether any tween is still active
    pub fn is_tweening(&self) -> bool {
        !self.tweens.is_empty()
    }

    /// Whether a tween was ever added
    pub fn is_used(&self) -> bool {
        self.used
    }

    /// Whether a one-shot tweener has fired
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn len(&self) -> usize {
        self.tweens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweens.is_empty()
    }

    /// Active tweens in insertion order
    pub fn tweens(&self) -> &[Tween] {
        &self.tweens
    }

    /// Animate `property` of `entity` to `end_value` over `duration` seconds
    pub fn tween(
        &mut self,
        now: f64,
        entity: EntityId,
        property: Property,
        end_value: Value,
        duration: f64,
        options: TweenOptions,
    ) -> Result<(), TweenError> {
        if self.finished {
            log::error!("tween on {entity:?}.{property:?} added to a finished tweener");
            return Err(TweenError::TweenerMisuse);
        }
        if !duration.is_finite() || duration < 0.0 {
            return Err(TweenError::InvalidDuration(duration));
        }
        if !options.delay.is_finite() || options.delay < 0.0 {
            return Err(TweenError::InvalidDuration(options.delay));
        }

        let start_time = now + options.delay;
        self.used = true;
        self.tweens.push(Tween {
            entity,
            property,
            start_value: None,
            end_value,
            start_time,
            end_time: start_time + duration,
            easing: options.easing,
        });
        Ok(())
    }

    /// Register a callback for when every tween has finished
    pub fn when_done(&mut self, callback: C) {
        self.callbacks.push(callback);
    }

    /// Drop every tween that targets `entity` without finishing it
    pub fn cancel_entity(&mut self, entity: EntityId) {
        self.tweens.retain(|t| t.entity != entity);
    }

    /// Advance every started tween to `now`, writing values into `target`.
    ///
    /// Returns the completion callbacks if the batch drained on this update.
    pub fn update(&mut self, now: f64, target: &mut impl Animatable) -> Vec<C> {
        let mut done = Vec::new();

        for (i, tween) in self.tweens.iter_mut().enumerate() {
            if tween.start_time > now {
                continue;
            }
            let start = match tween.start_value {
                Some(v) => v,
                None => match target.read(tween.entity, tween.property) {
                    Some(v) => {
                        tween.start_value = Some(v);
                        v
                    }
                    None => {
                        log::warn!("dropping tween on missing entity {:?}", tween.entity);
                        done.push(i);
                        continue;
                    }
                },
            };

            let t = tween.progress(now);
            let eased = tween.easing.apply(t) as f32;
            let written = tween
                .end_value
                .lerp_from(start, eased)
                .is_some_and(|value| target.write(tween.entity, tween.property, value));
            if !written {
                log::warn!(
                    "dropping tween {:?}.{:?}: value does not fit",
                    tween.entity,
                    tween.property
                );
                done.push(i);
                continue;
            }
            if t >= 1.0 {
                done.push(i);
            }
        }

        for i in done.into_iter().rev() {
            self.tweens.remove(i);
        }

        if !self.used || !self.tweens.is_empty() || self.finished {
            return Vec::new();
        }
        if self.reusable {
            std::mem::take(&mut self.callbacks)
        } else {
            self.finished = true;
            std::mem::take(&mut self.callbacks)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::sprite::{Sprite, Sprites};
    use glam::Vec2;

    fn setup() -> (Sprites, EntityId) {
        let mut sprites = Sprites::new();
        let id = sprites.spawn(Sprite::new(Vec2::ZERO));
        (sprites, id)
    }

    #[test]
    fn test_unused_tweener_never_fires() {
        let (mut sprites, _) = setup();
        let mut t = Tweener::new();
        t.when_done(1);
        for i in 0..100 {
            assert!(t.update(i as f64 * 0.1, &mut sprites).is_empty());
        }
        assert!(!t.is_finished());
    }

    #[test]
    fn test_fires_once_after_last_tween() {
        let (mut sprites, id) = setup();
        let mut t = Tweener::new();
        t.tween(0.0, id, Property::Size, Value::Scalar(3.0), 2.0, TweenOptions::default())
            .unwrap();
        t.tween(
            0.0,
            id,
            Property::Position,
            Value::Vector(Vec2::new(1.0, 1.0)),
            0.5,
            TweenOptions::default().delay(2.0),
        )
        .unwrap();
        t.tween(0.0, id, Property::Opacity, Value::Integer(0), 0.1, TweenOptions::default())
            .unwrap();
        t.when_done("a");
        t.when_done("b");

        assert!(t.update(0.1, &mut sprites).is_empty());
        assert!(t.update(2.0, &mut sprites).is_empty());
        assert_eq!(t.update(2.5, &mut sprites), vec!["a", "b"]);
        assert!(t.update(3.0, &mut sprites).is_empty());
        assert!(t.is_finished());

        let sprite = sprites.get(id).unwrap();
        assert_eq!(sprite.size, 3.0);
        assert_eq!(sprite.opacity, 0);
        assert_eq!(sprite.position, Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_finished_tweener_rejects_tweens() {
        let (mut sprites, id) = setup();
        let mut t: Tweener<()> = Tweener::new();
        t.tween(0.0, id, Property::Size, Value::Scalar(0.0), 0.1, TweenOptions::default())
            .unwrap();
        t.update(1.0, &mut sprites);
        assert_eq!(
            t.tween(1.0, id, Property::Size, Value::Scalar(1.0), 0.1, TweenOptions::default()),
            Err(TweenError::TweenerMisuse)
        );
    }

    #[test]
    fn test_reusable_fires_per_batch() {
        let (mut sprites, id) = setup();
        let mut t = Tweener::reusable();
        t.tween(0.0, id, Property::Size, Value::Scalar(2.0), 1.0, TweenOptions::default())
            .unwrap();
        t.when_done(1);
        assert_eq!(t.update(1.0, &mut sprites), vec![1]);

        t.tween(1.0, id, Property::Size, Value::Scalar(0.0), 1.0, TweenOptions::default())
            .unwrap();
        t.when_done(2);
        assert!(t.update(1.5, &mut sprites).is_empty());
        assert_eq!(t.update(2.0, &mut sprites), vec![2]);
    }

    #[test]
    fn test_start_value_captured_when_tween_starts() {
        let (mut sprites, id) = setup();
        let mut t: Tweener<()> = Tweener::new();
        t.tween(
            0.0,
            id,
            Property::Position,
            Value::Vector(Vec2::new(10.0, 0.0)),
            1.0,
            TweenOptions::default().delay(1.0),
        )
        .unwrap();

        // Moved before the tween starts: the move becomes the start value
        sprites.get_mut(id).unwrap().position = Vec2::new(4.0, 0.0);
        t.update(0.5, &mut sprites);
        assert_eq!(sprites.get(id).unwrap().position, Vec2::new(4.0, 0.0));

        t.update(1.5, &mut sprites);
        assert_eq!(sprites.get(id).unwrap().position, Vec2::new(7.0, 0.0));

        // Moved mid-transition: start value is not re-sampled
        sprites.get_mut(id).unwrap().position = Vec2::new(-100.0, 0.0);
        t.update(1.75, &mut sprites);
        assert_eq!(sprites.get(id).unwrap().position, Vec2::new(8.5, 0.0));
    }

    #[test]
    fn test_easing_applied_before_lerp() {
        let (mut sprites, id) = setup();
        let mut t: Tweener<()> = Tweener::new();
        t.tween(
            0.0,
            id,
            Property::Size,
            Value::Scalar(5.0),
            1.0,
            TweenOptions::default().easing(Easing::InQuad),
        )
        .unwrap();
        t.update(0.5, &mut sprites);
        // 1.0 + (5.0 - 1.0) * 0.25
        assert_eq!(sprites.get(id).unwrap().size, 2.0);
    }

    #[test]
    fn test_last_write_wins_in_insertion_order() {
        let (mut sprites, id) = setup();
        let mut t: Tweener<()> = Tweener::new();
        t.tween(0.0, id, Property::Size, Value::Scalar(9.0), 1.0, TweenOptions::default())
            .unwrap();
        t.tween(0.0, id, Property::Size, Value::Scalar(1.0), 1.0, TweenOptions::default())
            .unwrap();
        t.update(0.5, &mut sprites);
        assert_eq!(sprites.get(id).unwrap().size, 1.0);
    }

    #[test]
    fn test_missing_entity_counts_as_done() {
        let (mut sprites, id) = setup();
        let mut t = Tweener::new();
        t.tween(0.0, id, Property::Size, Value::Scalar(2.0), 5.0, TweenOptions::default())
            .unwrap();
        t.when_done(());
        sprites.despawn(id);
        assert_eq!(t.update(0.1, &mut sprites), vec![()]);
    }

    #[test]
    fn test_invalid_duration() {
        let (_, id) = setup();
        let mut t: Tweener<()> = Tweener::new();
        assert_eq!(
            t.tween(0.0, id, Property::Size, Value::Scalar(2.0), -1.0, TweenOptions::default()),
            Err(TweenError::InvalidDuration(-1.0))
        );
        assert!(!t.is_used());
    }
}
