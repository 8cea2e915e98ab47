//! Match resolution: clearing, gravity, refill and cascades
//!
//! A pass starts with a full-board scan. Matched tokens leave the index at
//! once and fly off toward the actor their effect targets, each on its own
//! tweener; once the last flight has landed the columns compact and recycled tokens drop in from
//! above. The refill settling triggers the next scan, so cascades resolve
//! naturally until a scan comes back empty.

use std::collections::BTreeMap;

use glam::Vec2;
use rand::Rng;

use super::combat::{Combatants, Effect, Impact, plan_effects, summarize};
use super::easing::Easing;
use super::events::{GameEvent, SoundId};
use super::grid::{Coord, Grid, MatchSet, TokenId};
use super::state::{BoardPhase, GameState, ResolveStep, Task, anchor, random_color};
use super::sprite::{Property, Value};
use super::tick::emit;
use super::tween::{TweenOptions, Tweener};
use crate::config::EngineConfig;
use crate::consts::*;
use crate::error::{GridError, Result};
use crate::position_of;

/// Scan the board and start clearing whatever matched.
///
/// An unsettled board defers the scan to the next settle; an empty result
/// returns the board to `Idle`.
pub fn scan(state: &mut GameState) -> Result<()> {
    match state.grid.scan(&state.config) {
        Ok(set) if set.is_empty() => {
            state.pending_scan = false;
            state.board = BoardPhase::Idle;
            Ok(())
        }
        Ok(set) => {
            state.pending_scan = false;
            clear(state, set)
        }
        Err(GridError::BoardUnsettled(c)) => {
            log::debug!("Scan deferred: board still moving at {c}");
            state.pending_scan = true;
            state.board = BoardPhase::Idle;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Lift matched tokens off the board and send them flying
pub fn clear(state: &mut GameState, set: MatchSet) -> Result<()> {
    let effects = plan_effects(&set, &state.config, state.combatants.monster.strength);
    let outcome = summarize(&effects);
    log::info!(
        "Matched {} token(s) in {} run(s) for {} points ({outcome:?})",
        set.len(),
        set.runs.len(),
        set.score
    );
    log::debug!("Clearing {:?}", set.coords());

    state.score += set.score;
    emit(state, GameEvent::ScorePoints { amount: set.score })?;
    emit(
        state,
        GameEvent::MovementStarted {
            counts: Combatants::tally(&set),
        },
    )?;
    emit(state, GameEvent::PlaySound(SoundId::Match))?;

    let now = state.now;
    let mut stagger = state.config.stagger_start;
    state.board = BoardPhase::Resolving(ResolveStep::Clearing);

    for (m, effect) in set.members.iter().zip(effects) {
        state.grid.free(m.id);
        let Some(entity) = state.entity_of(m.id) else {
            continue;
        };

        let delay = 1.0 - stagger;
        stagger *= state.config.stagger_decay;

        let from = position_of(m.coord);
        let dest = anchor(effect.toward);
        let flight = FLIGHT_SECONDS_PER_UNIT * from.distance(dest) as f64;
        let opts = TweenOptions::default().delay(delay);

        let mut tweener = Tweener::new();
        tweener.tween(
            now,
            entity,
            Property::Position,
            Value::Vector(dest),
            flight,
            opts.easing(Easing::OutQuad),
        )?;
        tweener.tween(
            now,
            entity,
            Property::Size,
            Value::Scalar(0.0),
            flight,
            opts.easing(Easing::InQuad),
        )?;
        tweener.when_done(Task::FlightLanded {
            token: m.id,
            effect,
        });
        state.tweeners.push(tweener);
        state.flights_pending += 1;

        state
            .scheduler
            .delay(delay, Task::StartSparkle { token: m.id })?;
    }

    if state.flights_pending == 0 {
        return refill(state);
    }
    Ok(())
}

/// One sparkle behind a flying token
pub fn spark(state: &mut GameState, token: TokenId) -> Result<()> {
    let Some(t) = state.grid.token(token) else {
        return Ok(());
    };
    let color = t.kind.tint();
    let Some(pos) = state.sprites.get(t.entity).map(|s| s.position) else {
        return Ok(());
    };
    state
        .particles
        .spawn(state.now, &mut state.effects, &mut state.sprites, pos, color, None)?;
    Ok(())
}

/// A cleared token arrived: burst, apply its effect, and settle the clear
/// once nothing is left in flight
pub fn land(state: &mut GameState, token: TokenId, effect: Effect) -> Result<()> {
    if let Some(handle) = state.sparkles.remove(&token) {
        state.scheduler.cancel(handle);
    }
    if let Some(t) = state.grid.token(token) {
        let color = t.kind.tint();
        let entity = t.entity;
        let pos = state.sprites.get(entity).map_or(anchor(effect.toward), |s| s.position);
        state.particles.burst(
            state.now,
            &mut state.effects,
            &mut state.sprites,
            pos,
            color,
            BURST_PARTICLES,
            &mut state.rng,
        )?;
        emit(state, GameEvent::PlaySound(SoundId::Burst))?;
    }

    match effect.impact {
        None => {}
        Some(Impact::Damage(amount)) => emit(
            state,
            GameEvent::DamageDealt {
                target: effect.toward,
                amount,
            },
        )?,
        Some(Impact::Heal(amount)) => emit(
            state,
            GameEvent::Healed {
                target: effect.toward,
                amount,
            },
        )?,
        Some(Impact::Shield(amount)) => emit(
            state,
            GameEvent::ShieldGained {
                target: effect.toward,
                amount,
            },
        )?,
        Some(Impact::Strike(amount)) => {
            emit(
                state,
                GameEvent::EnemyAttack {
                    enemy: effect.toward,
                    amount,
                },
            )?;
            emit(state, GameEvent::PlaySound(SoundId::Attack))?;
            state
                .scheduler
                .delay(ATTACK_WINDUP, Task::EnemyStrike { amount })?;
        }
    }

    state.flights_pending = state.flights_pending.saturating_sub(1);
    if state.flights_pending == 0 && state.board == BoardPhase::Resolving(ResolveStep::Clearing) {
        refill(state)?;
    }
    Ok(())
}

/// Compact columns and drop recycled tokens into the gaps
pub fn refill(state: &mut GameState) -> Result<()> {
    let now = state.now;
    let mut batch = Tweener::new();

    let falls = state.grid.compact();
    for fall in &falls {
        let Some(entity) = state.entity_of(fall.id) else {
            continue;
        };
        let duration = FALL_DURATION + state.rng.random::<f64>() * FALL_JITTER;
        batch.tween(
            now,
            entity,
            Property::Position,
            Value::Vector(position_of(fall.to)),
            duration,
            TweenOptions::default()
                .delay(FALL_DELAY)
                .easing(Easing::OutBounce),
        )?;
    }

    let mut pool = state
        .grid
        .tokens()
        .iter()
        .filter(|t| t.is_free())
        .map(|t| t.id)
        .collect::<Vec<_>>()
        .into_iter();
    let mut shortfall: BTreeMap<i32, usize> = BTreeMap::new();

    for c in state.grid.empty_cells() {
        let Some(id) = pool.next() else {
            *shortfall.entry(c.x).or_default() += 1;
            continue;
        };
        let kind = random_color(&mut state.rng);
        state.grid.set_kind(id, kind);
        state.grid.place(id, c)?;

        let Some(entity) = state.entity_of(id) else {
            continue;
        };
        // Cancel anything still driving the recycled sprite
        state.effects.cancel_entity(entity);
        if let Some(sprite) = state.sprites.get_mut(entity) {
            sprite.position = position_of(c) + Vec2::new(0.0, DROP_HEIGHT);
            sprite.size = 0.0;
            sprite.opacity = 255;
            sprite.color = kind.tint();
        }

        let duration = FALL_DURATION + state.rng.random::<f64>() * FALL_JITTER;
        let opts = TweenOptions::default().delay(FALL_DELAY);
        batch.tween(
            now,
            entity,
            Property::Position,
            Value::Vector(position_of(c)),
            duration,
            opts.easing(Easing::OutBounce),
        )?;
        batch.tween(now, entity, Property::Size, Value::Scalar(1.0), DROP_GROW_DURATION, opts)?;
    }

    for (column, missing) in shortfall {
        log::error!("{}", GridError::PoolExhausted { column, missing });
    }

    log::debug!("Refill: {} fall(s), board full: {}", falls.len(), state.grid.is_full());
    state.board = BoardPhase::Resolving(ResolveStep::Refilling);
    if !batch.is_used() {
        return refill_settled(state);
    }
    batch.when_done(Task::RefillSettled);
    state.tweeners.push(batch);
    Ok(())
}

/// Refill landed: report and look for cascades
pub fn refill_settled(state: &mut GameState) -> Result<()> {
    emit(state, GameEvent::MovementFinished)?;
    scan(state)
}

/// First swap (scanning columns then rows) that would produce a match
pub fn find_move(grid: &Grid, config: &EngineConfig) -> Option<(Coord, Coord)> {
    grid.coords()
        .flat_map(|c| [(c, c.offset(1, 0)), (c, c.offset(0, 1))])
        .filter(|&(_, to)| grid.in_bounds(to))
        .find(|&(from, to)| {
            let mut trial = grid.clone();
            trial.swap(from, to).is_ok()
                && trial.scan(config).is_ok_and(|set| !set.is_empty())
        })
}
