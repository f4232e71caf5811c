//! Typed game events and the publish/subscribe bus that carries them.
//!
//! Producers emit [`GameEvent`] values; every handler registered for the event's
//! [`EventKind`] runs synchronously, in registration order, before `emit` returns.
//! A handler that emits another event runs that emission immediately (nested).

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use smallvec::SmallVec;
use strum::EnumCount;
use strum_macros::{AsRefStr, Display, EnumIter};

/// The closed set of event kinds a handler can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::EnumCount, EnumIter, Display, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    MicLevel,
    MicCalibrated,
    NoiseDetected,
    TimerChanged,
    PlayerMovement,
    ScareTriggered,
    BatteryChanged,
    FlashlightChanged,
    GameOver,
    GameWin,
}

/// Why a run ended in failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum GameOverReason {
    /// The microphone picked up something louder than the calibrated threshold.
    Noise,
    /// Anything else, currently only the countdown running out.
    Other,
}

/// An immutable event payload. Each variant corresponds to exactly one [`EventKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    MicLevel { rms: f32 },
    MicCalibrated { threshold: f32 },
    NoiseDetected { rms: f32, threshold: f32 },
    TimerChanged { time_left_seconds: f32 },
    PlayerMovement { is_moving: bool, speed: f32 },
    ScareTriggered { id: String, intensity: f32 },
    BatteryChanged { percent: f32 },
    FlashlightChanged { is_on: bool },
    GameOver { reason: GameOverReason },
    GameWin { time_spent_seconds: u64 },
}

impl GameEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            GameEvent::MicLevel { .. } => EventKind::MicLevel,
            GameEvent::MicCalibrated { .. } => EventKind::MicCalibrated,
            GameEvent::NoiseDetected { .. } => EventKind::NoiseDetected,
            GameEvent::TimerChanged { .. } => EventKind::TimerChanged,
            GameEvent::PlayerMovement { .. } => EventKind::PlayerMovement,
            GameEvent::ScareTriggered { .. } => EventKind::ScareTriggered,
            GameEvent::BatteryChanged { .. } => EventKind::BatteryChanged,
            GameEvent::FlashlightChanged { .. } => EventKind::FlashlightChanged,
            GameEvent::GameOver { .. } => EventKind::GameOver,
            GameEvent::GameWin { .. } => EventKind::GameWin,
        }
    }
}

type Handler = Rc<dyn Fn(&GameEvent)>;

struct Entry {
    id: u64,
    handler: Handler,
}

type Buckets = RefCell<[SmallVec<[Entry; 4]>; EventKind::COUNT]>;

struct BusInner {
    buckets: Buckets,
    next_id: Cell<u64>,
}

/// Publish/subscribe hub for [`GameEvent`]s.
///
/// Cloning the bus clones a handle to the same subscriber table, so one bus created at
/// startup can be handed to every component. Tests build their own isolated buses.
#[derive(Clone)]
pub struct EventBus {
    inner: Rc<BusInner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(BusInner {
                buckets: RefCell::new(std::array::from_fn(|_| SmallVec::new())),
                next_id: Cell::new(0),
            }),
        }
    }

    /// Registers `handler` for `kind`. The returned [`Subscription`] removes it again.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&GameEvent) + 'static,
    {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);

        self.inner.buckets.borrow_mut()[kind as usize].push(Entry {
            id,
            handler: Rc::new(handler),
        });

        Subscription {
            bus: Rc::downgrade(&self.inner),
            kind,
            id,
        }
    }

    /// Invokes every handler registered for the event's kind, in registration order.
    ///
    /// Handlers are snapshotted before the first one runs, so handlers may subscribe,
    /// unsubscribe or emit while the emission is in progress.
    pub fn emit(&self, event: GameEvent) {
        let kind = event.kind();
        let snapshot: SmallVec<[Handler; 8]> = self.inner.buckets.borrow()[kind as usize]
            .iter()
            .map(|entry| Rc::clone(&entry.handler))
            .collect();

        if snapshot.is_empty() {
            tracing::trace!(%kind, "No subscribers for event");
            return;
        }

        for handler in snapshot {
            handler(&event);
        }
    }

    /// Number of handlers currently registered for `kind`.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.inner.buckets.borrow()[kind as usize].len()
    }
}

/// Handle returned by [`EventBus::on`].
///
/// Dropping it leaves the handler registered; call [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct Subscription {
    bus: Weak<BusInner>,
    kind: EventKind,
    id: u64,
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Removes the handler. Safe to call from inside a running handler.
    pub fn unsubscribe(self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.buckets.borrow_mut()[self.kind as usize].retain(|entry| entry.id != self.id);
        }
    }
}

