//! Seed Match headless demo
//!
//! Runs a seeded session at a fixed timestep, plays the first matching swap
//! it finds whenever the board is idle, and logs every outbound event.
//!
//! Usage: `seed-match [config.json]`

use seed_match::EngineConfig;
use seed_match::sim::resolve::find_move;
use seed_match::sim::{EventKind, GameEvent, GameState, InputEvent, Key, SessionPhase, TickInput, tick};

/// Simulation step (seconds)
const SIM_DT: f64 = 1.0 / 60.0;
/// Length of the demo (seconds)
const DEMO_SECONDS: f64 = 60.0;

fn main() {
    env_logger::init();
    log::info!("Seed Match (headless) starting...");

    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run() -> seed_match::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path).map_err(|e| {
                seed_match::error::ConfigError::Invalid(format!("cannot read {path}: {e}"))
            })?;
            EngineConfig::from_json(&json)?
        }
        None => EngineConfig::default(),
    };
    log::info!("Game initialized with seed: {:#x}", config.seed);

    let mut state = GameState::new(config)?;
    for kind in EventKind::ALL {
        if kind == EventKind::PlaySound {
            state
                .bus
                .subscribe(kind, |event| log::debug!("event: {event:?}"));
        } else {
            state.bus.subscribe(kind, |event| log::info!("event: {event:?}"));
        }
    }
    state.bus.subscribe(EventKind::ActorDied, |event| {
        if let GameEvent::ActorDied { actor } = event {
            log::warn!("{actor:?} was defeated");
        }
    });

    let steps = (DEMO_SECONDS / SIM_DT) as u64;
    let mut moves = 0u32;
    for step in 0..=steps {
        let now = step as f64 * SIM_DT;
        let mut input = TickInput::default();
        match state.session {
            SessionPhase::Title | SessionPhase::GameOver => {
                input.events.push(InputEvent::KeyUp(Key::Enter));
            }
            SessionPhase::Playing if state.is_settled() => {
                if let Some((from, to)) = find_move(&state.grid, &state.config) {
                    moves += 1;
                    log::info!("Move {moves}: {from} -> {to}");
                    input.events.extend([
                        InputEvent::PointerDown(seed_match::position_of(from)),
                        InputEvent::PointerMove(seed_match::position_of(to)),
                        InputEvent::PointerUp(seed_match::position_of(to)),
                    ]);
                }
            }
            _ => {}
        }
        tick(&mut state, &input, now)?;
    }

    log::info!(
        "Demo finished: {moves} move(s), score {}, wave {}, player {}/{} (+{} shield)",
        state.score,
        state.combatants.wave,
        state.combatants.player.health,
        state.combatants.player.max_health,
        state.combatants.player.shield,
    );
    Ok(())
}
