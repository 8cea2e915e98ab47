//! Session tick
//!
//! One call advances the session clock, fires due timers, advances every
//! tweener with the same time, and then processes the input events of the
//! tick. Timers and tweens always run before input.

use std::collections::VecDeque;

use glam::Vec2;
use rand::Rng;
use rand::seq::IndexedRandom;

use super::combat::ActorKind;
use super::easing::Easing;
use super::events::{GameEvent, SoundId};
use super::grid::{Cell, Coord, TokenId, TokenKind};
use super::resolve;
use super::sprite::{Property, Value};
use super::state::{BoardPhase, GameState, SessionPhase, Shake, Task, anchor};
use super::tween::{TweenOptions, Tweener};
use crate::consts::*;
use crate::error::Result;
use crate::{coord_at, position_of};

/// Draw order of a token being dragged
const HELD_LAYER: i32 = 2;
/// Draw order of a token at rest
const TOKEN_LAYER: i32 = 1;

/// Keys the session reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Space,
    Other,
}

/// Host input, positions in board units
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown(Vec2),
    PointerMove(Vec2),
    PointerUp(Vec2),
    KeyUp(Key),
}

/// Input gathered for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    pub events: Vec<InputEvent>,
}

impl TickInput {
    pub fn new(events: impl IntoIterator<Item = InputEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    pub fn key(key: Key) -> Self {
        Self::new([InputEvent::KeyUp(key)])
    }

    /// Press, drag and release in one tick
    pub fn drag(from: Vec2, to: Vec2) -> Self {
        Self::new([
            InputEvent::PointerDown(from),
            InputEvent::PointerMove(to),
            InputEvent::PointerUp(to),
        ])
    }
}

/// Advance the session to host time `host_time` (seconds)
pub fn tick(state: &mut GameState, input: &TickInput, host_time: f64) -> Result<()> {
    let last = state.last_host_time.unwrap_or(host_time);
    let dt = (host_time - last).max(0.0);
    state.last_host_time = Some(last.max(host_time));
    if matches!(state.session, SessionPhase::Playing | SessionPhase::GameOver) {
        state.now += dt;
    }
    let now = state.now;

    // Timers
    state.scheduler.advance(now);
    while let Some(task) = state.scheduler.next_due() {
        run_task(state, task)?;
    }

    // Tweens
    let mut drained = Vec::new();
    for tweener in &mut state.tweeners {
        let was_finished = tweener.is_finished();
        let callbacks = tweener.update(now, &mut state.sprites);
        if !was_finished && tweener.is_finished() {
            drained.push(callbacks);
        }
    }
    state.tweeners.retain(|t| !t.is_finished());
    let effect_callbacks = state.effects.update(now, &mut state.sprites);

    for callbacks in drained {
        emit(state, GameEvent::AnimationBatchFinished)?;
        for task in callbacks {
            run_task(state, task)?;
        }
    }
    for task in effect_callbacks {
        run_task(state, task)?;
    }

    if state.pending_scan && state.board == BoardPhase::Idle && state.tweeners.is_empty() {
        resolve::scan(state)?;
    }

    // Input
    for &event in &input.events {
        handle_input(state, event)?;
    }
    Ok(())
}

/// Apply an event to the combatants, let the session react, publish it,
/// then do the same for every event it caused
pub fn emit(state: &mut GameState, event: GameEvent) -> Result<()> {
    let mut queue = VecDeque::from([event]);
    while let Some(event) = queue.pop_front() {
        let follow = state.combatants.apply(&event);
        react(state, &event)?;
        log::trace!("{event:?}");
        state.bus.publish(&event);
        queue.extend(follow);
    }
    Ok(())
}

fn react(state: &mut GameState, event: &GameEvent) -> Result<()> {
    match *event {
        GameEvent::DamageDealt {
            target: ActorKind::Monster,
            amount,
        } if amount > 0 && state.combatants.monster.is_alive() => shake_monster(state),
        GameEvent::ActorDied {
            actor: ActorKind::Monster,
        } => sink_monster(state),
        GameEvent::ActorDied {
            actor: ActorKind::Player,
        } => {
            game_over(state);
            Ok(())
        }
        _ => Ok(()),
    }
}

fn run_task(state: &mut GameState, task: Task) -> Result<()> {
    match task {
        Task::SwapSettled => {
            emit(state, GameEvent::MovementFinished)?;
            resolve::scan(state)
        }
        Task::SnapBackSettled => {
            state.board = BoardPhase::Idle;
            Ok(())
        }
        Task::RefillSettled => resolve::refill_settled(state),
        Task::StartSparkle { token } => {
            let handle = state
                .scheduler
                .repeat(SPARKLE_INTERVAL, Task::Spark { token })?;
            if let Some(old) = state.sparkles.insert(token, handle) {
                state.scheduler.cancel(old);
            }
            Ok(())
        }
        Task::Spark { token } => resolve::spark(state, token),
        Task::FlightLanded { token, effect } => resolve::land(state, token, effect),
        Task::EnemyStrike { amount } => {
            if state.session == SessionPhase::Playing && state.combatants.monster.is_alive() {
                emit(
                    state,
                    GameEvent::DamageDealt {
                        target: ActorKind::Player,
                        amount,
                    },
                )?;
            }
            Ok(())
        }
        Task::Shake => {
            let offset = Vec2::new(
                state.rng.random_range(-SHAKE_AMPLITUDE..=SHAKE_AMPLITUDE),
                state.rng.random_range(-SHAKE_AMPLITUDE..=SHAKE_AMPLITUDE),
            );
            if let Some(sprite) = state.sprites.get_mut(state.monster_entity) {
                sprite.position = anchor(ActorKind::Monster) + offset;
            }
            Ok(())
        }
        Task::StopShake => {
            stop_shake(state);
            Ok(())
        }
        Task::MonsterSunk => {
            let event = state.combatants.next_wave(&state.config);
            emit(state, event)?;
            let mut rise = Tweener::new();
            rise.tween(
                state.now,
                state.monster_entity,
                Property::Position,
                Value::Vector(anchor(ActorKind::Monster)),
                MONSTER_MOVE_DURATION,
                TweenOptions::default()
                    .delay(RESPAWN_DELAY)
                    .easing(Easing::OutQuad),
            )?;
            state.tweeners.push(rise);
            Ok(())
        }
        Task::Corrupt => corrupt(state),
        Task::CorruptionSettled { token } => {
            state.grid.set_kind(token, TokenKind::Corrupted);
            if let Some(c) = state.grid.token(token).and_then(|t| t.coord) {
                emit(state, GameEvent::TokenCorruptionFinished { x: c.x, y: c.y })?;
            }
            resolve::scan(state)
        }
    }
}

fn shake_monster(state: &mut GameState) -> Result<()> {
    let timer = match state.shake.take() {
        Some(shake) => {
            state.scheduler.cancel(shake.stop);
            shake.timer
        }
        None => state.scheduler.repeat(SHAKE_INTERVAL, Task::Shake)?,
    };
    let stop = state.scheduler.delay(SHAKE_DURATION, Task::StopShake)?;
    state.shake = Some(Shake { timer, stop });
    Ok(())
}

fn stop_shake(state: &mut GameState) {
    if let Some(shake) = state.shake.take() {
        state.scheduler.cancel(shake.timer);
        state.scheduler.cancel(shake.stop);
        if let Some(sprite) = state.sprites.get_mut(state.monster_entity) {
            sprite.position = anchor(ActorKind::Monster);
        }
    }
}

fn sink_monster(state: &mut GameState) -> Result<()> {
    stop_shake(state);
    let mut sink = Tweener::new();
    sink.tween(
        state.now,
        state.monster_entity,
        Property::Position,
        Value::Vector(Vec2::new(MONSTER_X, MONSTER_SINK_Y)),
        MONSTER_MOVE_DURATION,
        TweenOptions::default().easing(Easing::InQuad),
    )?;
    sink.when_done(Task::MonsterSunk);
    state.tweeners.push(sink);
    Ok(())
}

fn game_over(state: &mut GameState) {
    log::info!("Game over: score {}, wave {}", state.score, state.combatants.wave);
    release_hold(state);
    state.session = SessionPhase::GameOver;
    state.selection = None;
    if let Some(handle) = state.corruption.take() {
        state.scheduler.cancel(handle);
    }
}

/// Turn a random colored token while the board is idle
fn corrupt(state: &mut GameState) -> Result<()> {
    if state.session != SessionPhase::Playing
        || state.board != BoardPhase::Idle
        || !state.combatants.monster.is_alive()
    {
        return Ok(());
    }
    let candidates: Vec<Coord> = state
        .grid
        .coords()
        .filter(|&c| state.grid.kind_at(c).is_some_and(TokenKind::is_color))
        .collect();
    let Some(&c) = candidates.choose(&mut state.rng) else {
        return Ok(());
    };
    let token = state.grid.get(c)?;
    let (id, entity) = (token.id, token.entity);
    log::debug!("Corrupting token at {c}");

    emit(state, GameEvent::TokenCorruptionStarted { x: c.x, y: c.y })?;
    emit(state, GameEvent::PlaySound(SoundId::Corrupt))?;

    let mut shift = Tweener::new();
    shift.tween(
        state.now,
        entity,
        Property::Color,
        Value::Color(TokenKind::Corrupted.tint()),
        CORRUPTION_DURATION,
        TweenOptions::default(),
    )?;
    shift.when_done(Task::CorruptionSettled { token: id });
    state.tweeners.push(shift);
    state.board = BoardPhase::Corrupting;
    Ok(())
}

/// Title -> Playing
fn start(state: &mut GameState) -> Result<()> {
    log::info!("Session started (seed {:#x})", state.config.seed);
    state.session = SessionPhase::Playing;
    let wave = state.combatants.wave;
    emit(state, GameEvent::GameStarted)?;
    emit(state, GameEvent::WaveStarted { wave })?;
    if state.config.corruption_interval > 0.0 {
        let handle = state
            .scheduler
            .repeat(state.config.corruption_interval, Task::Corrupt)?;
        state.corruption = Some(handle);
    }
    resolve::scan(state)
}

fn handle_input(state: &mut GameState, event: InputEvent) -> Result<()> {
    match (state.session, event) {
        (SessionPhase::Title, InputEvent::KeyUp(Key::Enter)) => start(state),
        (SessionPhase::GameOver, InputEvent::KeyUp(Key::Enter)) => {
            state.restart()?;
            start(state)
        }
        (SessionPhase::Playing, InputEvent::KeyUp(Key::Escape)) => {
            release_hold(state);
            state.session = SessionPhase::Menu;
            emit(state, GameEvent::MenuOpened)
        }
        (SessionPhase::Menu, InputEvent::KeyUp(Key::Escape)) => {
            state.session = SessionPhase::Playing;
            emit(state, GameEvent::MenuClosed)
        }
        (SessionPhase::Playing, InputEvent::PointerDown(pos)) => pointer_down(state, pos),
        (SessionPhase::Playing, InputEvent::PointerMove(pos)) => {
            if let BoardPhase::Held { token, .. } = state.board {
                if let Some(sprite) = state.entity_of(token).and_then(|e| state.sprites.get_mut(e)) {
                    sprite.position = pos;
                }
            }
            Ok(())
        }
        (SessionPhase::Playing, InputEvent::PointerUp(pos)) => pointer_up(state, pos),
        _ => Ok(()),
    }
}

fn pointer_down(state: &mut GameState, pos: Vec2) -> Result<()> {
    if state.board != BoardPhase::Idle {
        return Ok(());
    }
    let c = coord_at(pos);
    let Cell::Occupied(token) = state.grid.query(c) else {
        state.selection = None;
        return Ok(());
    };
    if let Some(selected) = state.selection.take() {
        if selected.is_adjacent(c) {
            return try_swap(state, selected, c, None);
        }
    }
    state.board = BoardPhase::Held { token, origin: c };
    set_layer(state, token, HELD_LAYER);
    Ok(())
}

fn pointer_up(state: &mut GameState, pos: Vec2) -> Result<()> {
    let BoardPhase::Held { token, origin } = state.board else {
        return Ok(());
    };
    set_layer(state, token, TOKEN_LAYER);
    let target = coord_at(pos);
    if target == origin {
        // Click: put it back and remember it for click-to-swap
        place_sprite(state, token, origin);
        state.selection = Some(origin);
        state.board = BoardPhase::Idle;
        return Ok(());
    }
    try_swap(state, origin, target, Some(token))
}

/// Swap `from` with `to`, animating both tokens. A rejected swap snaps the
/// held token (if any) back to `from`.
fn try_swap(state: &mut GameState, from: Coord, to: Coord, held: Option<TokenId>) -> Result<()> {
    match state.grid.swap(from, to) {
        Ok(_) => {
            let mut swap = Tweener::new();
            for c in [from, to] {
                if let Some(entity) = state.entity_at(c) {
                    swap.tween(
                        state.now,
                        entity,
                        Property::Position,
                        Value::Vector(position_of(c)),
                        state.config.swap_duration,
                        TweenOptions::default(),
                    )?;
                }
            }
            swap.when_done(Task::SwapSettled);
            state.tweeners.push(swap);
            state.board = BoardPhase::Swapping;
            emit(state, GameEvent::PlaySound(SoundId::Swap))
        }
        Err(e) => {
            log::debug!("Swap rejected: {e}");
            emit(state, GameEvent::PlaySound(SoundId::Denied))?;
            let Some(entity) = held.and_then(|t| state.entity_of(t)) else {
                state.board = BoardPhase::Idle;
                return Ok(());
            };
            let mut back = Tweener::new();
            back.tween(
                state.now,
                entity,
                Property::Position,
                Value::Vector(position_of(from)),
                SNAP_BACK_DURATION,
                TweenOptions::default().easing(Easing::OutQuad),
            )?;
            back.when_done(Task::SnapBackSettled);
            state.tweeners.push(back);
            state.board = BoardPhase::Swapping;
            Ok(())
        }
    }
}

/// Drop a held token back on its origin without animating
fn release_hold(state: &mut GameState) {
    if let BoardPhase::Held { token, origin } = state.board {
        set_layer(state, token, TOKEN_LAYER);
        place_sprite(state, token, origin);
        state.board = BoardPhase::Idle;
    }
}

fn place_sprite(state: &mut GameState, token: TokenId, c: Coord) {
    if let Some(sprite) = state.entity_of(token).and_then(|e| state.sprites.get_mut(e)) {
        sprite.position = position_of(c);
    }
}

fn set_layer(state: &mut GameState, token: TokenId, layer: i32) {
    if let Some(sprite) = state.entity_of(token).and_then(|e| state.sprites.get_mut(e)) {
        sprite.layer = layer;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::sim::events::{EventKind, EventLog};
    use crate::sim::grid::tests::stripe;
    use crate::sim::grid::{Grid, GridSnapshot};

    const STEP: f64 = 1.0 / 60.0;

    fn quiet_config() -> EngineConfig {
        EngineConfig {
            corruption_interval: 0.0,
            ..EngineConfig::default()
        }
    }

    fn session_with(config: EngineConfig, overrides: &[(i32, i32, TokenKind)]) -> GameState {
        let grid = Grid::new(2);
        let cells = grid
            .coords()
            .map(|c| {
                let kind = overrides
                    .iter()
                    .find(|o| Coord::new(o.0, o.1) == c)
                    .map(|o| o.2)
                    .unwrap_or_else(|| stripe(c));
                (c, kind)
            })
            .collect();
        GameState::from_snapshot(config, &GridSnapshot { half_extent: 2, cells }).unwrap()
    }

    /// Row y=-2 reads R R Y Y B; swapping (0,-1) down completes three reds
    fn swap_ready() -> GameState {
        session_with(
            quiet_config(),
            &[
                (-2, -2, TokenKind::Red),
                (-1, -2, TokenKind::Red),
                (0, -2, TokenKind::Yellow),
                (0, -1, TokenKind::Red),
            ],
        )
    }

    fn record_all(state: &mut GameState) -> EventLog {
        state.bus.record(&EventKind::ALL)
    }

    /// Tick with no input from `from` up to `to` host seconds
    fn run(state: &mut GameState, from: f64, to: f64) -> f64 {
        let mut t = from;
        let mut i = 0u32;
        while t < to {
            i += 1;
            t = from + i as f64 * STEP;
            tick(state, &TickInput::default(), t).unwrap();
        }
        t
    }

    fn count(log: &EventLog, kind: EventKind) -> usize {
        log.borrow().iter().filter(|e| e.kind() == kind).count()
    }

    #[test]
    fn test_enter_starts_session() {
        let mut state = swap_ready();
        let log = record_all(&mut state);
        tick(&mut state, &TickInput::key(Key::Space), 0.0).unwrap();
        assert_eq!(state.session, SessionPhase::Title);
        tick(&mut state, &TickInput::key(Key::Enter), 0.0).unwrap();
        assert_eq!(state.session, SessionPhase::Playing);
        assert_eq!(
            log.borrow()[..2],
            [GameEvent::GameStarted, GameEvent::WaveStarted { wave: 0 }]
        );
        assert_eq!(state.board, BoardPhase::Idle);
    }

    #[test]
    fn test_title_clock_stands_still() {
        let mut state = swap_ready();
        run(&mut state, 0.0, 2.0);
        assert_eq!(state.now, 0.0);
    }

    #[test]
    fn test_drag_swap_resolves_match() {
        let mut state = swap_ready();
        let log = record_all(&mut state);
        tick(&mut state, &TickInput::key(Key::Enter), 0.0).unwrap();

        let input = TickInput::drag(Vec2::new(0.0, -1.0), Vec2::new(0.1, -1.8));
        tick(&mut state, &input, 0.1).unwrap();
        assert_eq!(state.board, BoardPhase::Swapping);
        assert_eq!(state.grid.kind_at(Coord::new(0, -2)), Some(TokenKind::Red));
        assert_eq!(state.grid.kind_at(Coord::new(0, -1)), Some(TokenKind::Yellow));

        let mut t = 0.1;
        for _ in 0..20 {
            t = run(&mut state, t, t + 0.5);
            if state.is_settled() {
                break;
            }
        }
        assert!(state.is_settled());
        assert!(state.grid.scan(&state.config).unwrap().is_empty());
        assert!(state.grid.is_consistent());

        let events = log.borrow();
        let first_move = events
            .iter()
            .find_map(|e| match e {
                GameEvent::MovementStarted { counts } => Some(counts.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(first_move.get(&TokenKind::Red), Some(&3));
        assert_eq!(
            events.iter().find(|e| e.kind() == EventKind::ScorePoints),
            Some(&GameEvent::ScorePoints { amount: 250 })
        );
        drop(events);
        assert!(count(&log, EventKind::DamageDealt) >= 3);
        assert!(state.score >= 250);
    }

    #[test]
    fn test_gravity_cascade_resolves_without_input() {
        // Clearing the red column drops the green at (0,1) onto (0,-2),
        // completing the green row
        let mut state = session_with(
            quiet_config(),
            &[
                (0, -2, TokenKind::Red),
                (0, -1, TokenKind::Red),
                (0, 0, TokenKind::Red),
                (0, 1, TokenKind::Green),
                (-2, -2, TokenKind::Green),
                (-1, -2, TokenKind::Green),
            ],
        );
        let log = record_all(&mut state);
        tick(&mut state, &TickInput::key(Key::Enter), 0.0).unwrap();
        run(&mut state, 0.0, 20.0);

        assert!(state.is_settled());
        assert!(state.grid.scan(&state.config).unwrap().is_empty());
        assert!(state.grid.is_consistent());

        let events = log.borrow();
        let passes: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::MovementStarted { counts } => Some(counts.clone()),
                _ => None,
            })
            .collect();
        assert!(passes.len() >= 2);
        assert_eq!(passes[0].get(&TokenKind::Red), Some(&3));
        assert_eq!(passes[0].len(), 1);
        assert_eq!(passes[1].get(&TokenKind::Green), Some(&3));
        assert_eq!(passes[1].len(), 1);

        let scores: Vec<_> = events
            .iter()
            .filter(|e| e.kind() == EventKind::ScorePoints)
            .take(2)
            .cloned()
            .collect();
        assert_eq!(scores, vec![GameEvent::ScorePoints { amount: 250 }; 2]);
        assert!(state.score >= 500);
    }

    #[test]
    fn test_invalid_drag_snaps_back() {
        let mut state = swap_ready();
        tick(&mut state, &TickInput::key(Key::Enter), 0.0).unwrap();
        let before = state.snapshot();
        let entity = state.entity_at(Coord::new(0, 0)).unwrap();

        let input = TickInput::drag(Vec2::new(0.0, 0.0), Vec2::new(1.9, 2.2));
        tick(&mut state, &input, 0.1).unwrap();
        assert_eq!(state.snapshot(), before);
        assert_eq!(state.board, BoardPhase::Swapping);
        assert_eq!(state.sprites.get(entity).unwrap().position, Vec2::new(1.9, 2.2));

        run(&mut state, 0.1, 0.5);
        assert_eq!(state.board, BoardPhase::Idle);
        assert_eq!(state.sprites.get(entity).unwrap().position, Vec2::ZERO);
    }

    #[test]
    fn test_click_select_then_neighbour_swaps() {
        let mut state = swap_ready();
        tick(&mut state, &TickInput::key(Key::Enter), 0.0).unwrap();

        let click = TickInput::new([
            InputEvent::PointerDown(Vec2::new(0.0, -1.0)),
            InputEvent::PointerUp(Vec2::new(0.1, -0.9)),
        ]);
        tick(&mut state, &click, 0.1).unwrap();
        assert_eq!(state.selection, Some(Coord::new(0, -1)));
        assert_eq!(state.board, BoardPhase::Idle);

        let press = TickInput::new([InputEvent::PointerDown(Vec2::new(0.0, -2.0))]);
        tick(&mut state, &press, 0.2).unwrap();
        assert_eq!(state.board, BoardPhase::Swapping);
        assert_eq!(state.selection, None);
        assert_eq!(state.grid.kind_at(Coord::new(0, -2)), Some(TokenKind::Red));
    }

    #[test]
    fn test_menu_pauses_clock_and_input() {
        let mut state = swap_ready();
        let log = record_all(&mut state);
        tick(&mut state, &TickInput::key(Key::Enter), 0.0).unwrap();
        tick(&mut state, &TickInput::key(Key::Escape), 0.5).unwrap();
        assert_eq!(state.session, SessionPhase::Menu);
        let paused_at = state.now;

        let before = state.snapshot();
        tick(&mut state, &TickInput::drag(Vec2::new(0.0, -1.0), Vec2::new(0.0, -2.0)), 2.0)
            .unwrap();
        assert_eq!(state.snapshot(), before);
        assert_eq!(state.now, paused_at);

        tick(&mut state, &TickInput::key(Key::Escape), 3.0).unwrap();
        assert_eq!(state.session, SessionPhase::Playing);
        assert_eq!(count(&log, EventKind::MenuOpened), 1);
        assert_eq!(count(&log, EventKind::MenuClosed), 1);
    }

    #[test]
    fn test_corruption_turns_a_token() {
        let config = EngineConfig {
            corruption_interval: 1.0,
            ..EngineConfig::default()
        };
        let mut state = session_with(config, &[]);
        let log = record_all(&mut state);
        tick(&mut state, &TickInput::key(Key::Enter), 0.0).unwrap();
        run(&mut state, 0.0, 1.05);
        assert_eq!(state.board, BoardPhase::Corrupting);
        let started = log
            .borrow()
            .iter()
            .find_map(|e| match *e {
                GameEvent::TokenCorruptionStarted { x, y } => Some(Coord::new(x, y)),
                _ => None,
            })
            .unwrap();

        run(&mut state, 1.05, 1.9);
        assert_eq!(
            count(&log, EventKind::TokenCorruptionFinished),
            1,
            "corruption should settle once"
        );
        assert_eq!(state.grid.kind_at(started), Some(TokenKind::Corrupted));
        let entity = state.entity_at(started).unwrap();
        assert_eq!(
            state.sprites.get(entity).unwrap().color,
            TokenKind::Corrupted.tint()
        );
    }

    #[test]
    fn test_monster_death_brings_next_wave() {
        let mut state = swap_ready();
        let log = record_all(&mut state);
        tick(&mut state, &TickInput::key(Key::Enter), 0.0).unwrap();

        let hp = state.combatants.monster.health;
        emit(
            &mut state,
            GameEvent::DamageDealt {
                target: ActorKind::Monster,
                amount: hp,
            },
        )
        .unwrap();
        assert_eq!(count(&log, EventKind::ActorDied), 1);

        run(&mut state, 0.0, 1.1);
        let sunk = state.sprites.get(state.monster_entity).unwrap().position;
        assert_eq!(sunk, Vec2::new(MONSTER_X, MONSTER_SINK_Y));
        assert_eq!(state.combatants.wave, 1);
        assert!(log.borrow().contains(&GameEvent::WaveStarted { wave: 1 }));

        run(&mut state, 1.1, 3.2);
        let risen = state.sprites.get(state.monster_entity).unwrap().position;
        assert_eq!(risen, anchor(ActorKind::Monster));
    }

    #[test]
    fn test_damage_shakes_monster_then_settles() {
        let mut state = swap_ready();
        tick(&mut state, &TickInput::key(Key::Enter), 0.0).unwrap();
        emit(
            &mut state,
            GameEvent::DamageDealt {
                target: ActorKind::Monster,
                amount: 1,
            },
        )
        .unwrap();
        assert!(state.shake.is_some());
        run(&mut state, 0.0, 0.6);
        assert!(state.shake.is_none());
        assert_eq!(
            state.sprites.get(state.monster_entity).unwrap().position,
            anchor(ActorKind::Monster)
        );
    }

    #[test]
    fn test_player_death_and_restart() {
        let mut state = swap_ready();
        let log = record_all(&mut state);
        tick(&mut state, &TickInput::key(Key::Enter), 0.0).unwrap();
        state.combatants.player.health = 1;
        emit(
            &mut state,
            GameEvent::DamageDealt {
                target: ActorKind::Player,
                amount: 4,
            },
        )
        .unwrap();
        assert_eq!(state.session, SessionPhase::GameOver);

        // Board input is ignored once the game is over
        let before = state.snapshot();
        tick(&mut state, &TickInput::drag(Vec2::new(0.0, -1.0), Vec2::new(0.0, -2.0)), 0.1)
            .unwrap();
        assert_eq!(state.snapshot(), before);

        tick(&mut state, &TickInput::key(Key::Enter), 0.2).unwrap();
        assert_eq!(state.session, SessionPhase::Playing);
        assert_eq!(state.combatants.player.health, state.config.player_max_health);
        assert_eq!(count(&log, EventKind::GameStarted), 2);
    }

    #[test]
    fn test_corrupted_match_triggers_enemy_attack() {
        let mut state = session_with(
            quiet_config(),
            &[
                (2, -2, TokenKind::Corrupted),
                (2, -1, TokenKind::Corrupted),
                (2, 0, TokenKind::Corrupted),
            ],
        );
        let log = record_all(&mut state);
        tick(&mut state, &TickInput::key(Key::Enter), 0.0).unwrap();
        run(&mut state, 0.0, 3.0);

        let strength = state.config.enemy_for_wave(0).strength;
        assert!(log.borrow().contains(&GameEvent::EnemyAttack {
            enemy: ActorKind::Monster,
            amount: strength * 3,
        }));
        assert!(log.borrow().contains(&GameEvent::DamageDealt {
            target: ActorKind::Player,
            amount: strength * 3,
        }));
    }

    #[test]
    fn test_same_seed_same_session() {
        fn play() -> (GridSnapshot, u64, i32) {
            let mut state = GameState::new(EngineConfig::default()).unwrap();
            tick(&mut state, &TickInput::key(Key::Enter), 0.0).unwrap();
            let mut t = 0.0;
            for i in 0..600 {
                t = i as f64 * STEP;
                let input = if i % 120 == 60 {
                    let x = (i / 120) as f32 - 2.0;
                    TickInput::drag(Vec2::new(x, 0.0), Vec2::new(x, 1.0))
                } else {
                    TickInput::default()
                };
                tick(&mut state, &input, t).unwrap();
            }
            run(&mut state, t, t + 8.0);
            (state.snapshot(), state.score, state.combatants.monster.health)
        }
        assert_eq!(play(), play());
    }
}
