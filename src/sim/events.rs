//! Outbound events and the synchronous event bus
//!
//! Presentation collaborators (renderer, audio, HUD) subscribe to the
//! [`EventKind`]s they care about. `publish` calls every handler for the
//! event's kind, in registration order, before it returns.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::combat::ActorKind;
use super::grid::TokenKind;

/// Sound cues for the audio collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundId {
    Swap,
    /// Rejected move
    Denied,
    Match,
    Burst,
    Hit,
    Heal,
    Shield,
    Attack,
    Corrupt,
    Death,
}

/// Events published by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    GameStarted,
    MenuOpened,
    MenuClosed,
    /// A resolution pass started clearing tokens
    MovementStarted { counts: BTreeMap<TokenKind, u32> },
    /// A swap or refill settled
    MovementFinished,
    /// A tweener drained and fired its callbacks
    AnimationBatchFinished,
    TokenCorruptionStarted { x: i32, y: i32 },
    TokenCorruptionFinished { x: i32, y: i32 },
    /// The monster winds up a strike
    EnemyAttack { enemy: ActorKind, amount: i32 },
    DamageDealt { target: ActorKind, amount: i32 },
    Healed { target: ActorKind, amount: i32 },
    ShieldGained { target: ActorKind, amount: i32 },
    ActorDied { actor: ActorKind },
    WaveStarted { wave: u32 },
    ScorePoints { amount: u64 },
    PlaySound(SoundId),
}

/// Discriminant of [`GameEvent`], used as the subscription key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    GameStarted,
    MenuOpened,
    MenuClosed,
    MovementStarted,
    MovementFinished,
    AnimationBatchFinished,
    TokenCorruptionStarted,
    TokenCorruptionFinished,
    EnemyAttack,
    DamageDealt,
    Healed,
    ShieldGained,
    ActorDied,
    WaveStarted,
    ScorePoints,
    PlaySound,
}

impl EventKind {
    pub const ALL: [EventKind; 16] = [
        EventKind::GameStarted,
        EventKind::MenuOpened,
        EventKind::MenuClosed,
        EventKind::MovementStarted,
        EventKind::MovementFinished,
        EventKind::AnimationBatchFinished,
        EventKind::TokenCorruptionStarted,
        EventKind::TokenCorruptionFinished,
        EventKind::EnemyAttack,
        EventKind::DamageDealt,
        EventKind::Healed,
        EventKind::ShieldGained,
        EventKind::ActorDied,
        EventKind::WaveStarted,
        EventKind::ScorePoints,
        EventKind::PlaySound,
    ];
}

impl GameEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            GameEvent::GameStarted => EventKind::GameStarted,
            GameEvent::MenuOpened => EventKind::MenuOpened,
            GameEvent::MenuClosed => EventKind::MenuClosed,
            GameEvent::MovementStarted { .. } => EventKind::MovementStarted,
            GameEvent::MovementFinished => EventKind::MovementFinished,
            GameEvent::AnimationBatchFinished => EventKind::AnimationBatchFinished,
            GameEvent::TokenCorruptionStarted { .. } => EventKind::TokenCorruptionStarted,
            GameEvent::TokenCorruptionFinished { .. } => EventKind::TokenCorruptionFinished,
            GameEvent::EnemyAttack { .. } => EventKind::EnemyAttack,
            GameEvent::DamageDealt { .. } => EventKind::DamageDealt,
            GameEvent::Healed { .. } => EventKind::Healed,
            GameEvent::ShieldGained { .. } => EventKind::ShieldGained,
            GameEvent::ActorDied { .. } => EventKind::ActorDied,
            GameEvent::WaveStarted { .. } => EventKind::WaveStarted,
            GameEvent::ScorePoints { .. } => EventKind::ScorePoints,
            GameEvent::PlaySound(_) => EventKind::PlaySound,
        }
    }
}

type Handler = Box<dyn FnMut(&GameEvent)>;

/// Shared list filled by [`EventBus::record`]
pub type EventLog = Rc<RefCell<Vec<GameEvent>>>;

/// Synchronous fan-out keyed by event kind
#[derive(Default)]
pub struct EventBus {
    handlers: HashMap<EventKind, Vec<Handler>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: BTreeMap<_, _> = self.handlers.iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler for one kind of event
    pub fn subscribe(&mut self, kind: EventKind, handler: impl FnMut(&GameEvent) + 'static) {
        self.handlers.entry(kind).or_default().push(Box::new(handler));
    }

    /// Record every event of the given kinds into a shared log
    pub fn record(&mut self, kinds: &[EventKind]) -> EventLog {
        let log: EventLog = Rc::new(RefCell::new(Vec::new()));
        for &kind in kinds {
            let sink = Rc::clone(&log);
            self.subscribe(kind, move |ev| sink.borrow_mut().push(ev.clone()));
        }
        log
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Deliver `event` to its subscribers. Returns how many were called.
    pub fn publish(&mut self, event: &GameEvent) -> usize {
        let Some(handlers) = self.handlers.get_mut(&event.kind()) else {
            return 0;
        };
        for handler in handlers.iter_mut() {
            handler(event);
        }
        handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handlers_run_in_registration_order() {
        let mut bus = EventBus::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let order = Rc::clone(&order);
            bus.subscribe(EventKind::ScorePoints, move |_| order.borrow_mut().push(i));
        }
        assert_eq!(bus.publish(&GameEvent::ScorePoints { amount: 250 }), 3);
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_only_matching_kind_is_delivered() {
        let mut bus = EventBus::new();
        let log = bus.record(&[EventKind::ActorDied]);
        assert_eq!(bus.publish(&GameEvent::MovementFinished), 0);
        bus.publish(&GameEvent::ActorDied {
            actor: ActorKind::Monster,
        });
        assert_eq!(
            *log.borrow(),
            vec![GameEvent::ActorDied {
                actor: ActorKind::Monster
            }]
        );
        assert_eq!(bus.subscriber_count(EventKind::ActorDied), 1);
    }

    #[test]
    fn test_kind_table_is_complete() {
        let events = [
            GameEvent::GameStarted,
            GameEvent::MenuOpened,
            GameEvent::MenuClosed,
            GameEvent::MovementStarted {
                counts: BTreeMap::new(),
            },
            GameEvent::MovementFinished,
            GameEvent::AnimationBatchFinished,
            GameEvent::TokenCorruptionStarted { x: 0, y: 0 },
            GameEvent::TokenCorruptionFinished { x: 0, y: 0 },
            GameEvent::EnemyAttack {
                enemy: ActorKind::Monster,
                amount: 1,
            },
            GameEvent::DamageDealt {
                target: ActorKind::Player,
                amount: 1,
            },
            GameEvent::Healed {
                target: ActorKind::Player,
                amount: 1,
            },
            GameEvent::ShieldGained {
                target: ActorKind::Player,
                amount: 1,
            },
            GameEvent::ActorDied {
                actor: ActorKind::Player,
            },
            GameEvent::WaveStarted { wave: 1 },
            GameEvent::ScorePoints { amount: 1 },
            GameEvent::PlaySound(SoundId::Swap),
        ];
        let kinds: Vec<EventKind> = events.iter().map(GameEvent::kind).collect();
        assert_eq!(kinds, EventKind::ALL.to_vec());
    }
}
