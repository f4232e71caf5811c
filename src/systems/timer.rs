//! The tape countdown. Only runs while the player is moving.

use tracing::{debug, info};

use crate::events::{EventBus, GameEvent, GameOverReason};

pub struct Timer {
    bus: EventBus,
    initial_seconds: f32,
    time_left: f32,
    ended: bool,
}

impl Timer {
    pub fn new(bus: EventBus, initial_seconds: u32) -> Self {
        let initial_seconds = initial_seconds as f32;
        Self {
            bus,
            initial_seconds,
            time_left: initial_seconds,
            ended: false,
        }
    }

    /// Rewinds to the full duration and announces it.
    pub fn reset(&mut self) {
        self.time_left = self.initial_seconds;
        self.ended = false;
        debug!(time_left = self.time_left, "Timer reset");
        self.bus.emit(GameEvent::TimerChanged {
            time_left_seconds: self.time_left,
        });
    }

    /// Counts down by `dt` when `should_tick` is set.
    ///
    /// `TimerChanged` fires only when the whole-second value changes, carrying the
    /// remaining time rounded up. Reaching zero ends the run exactly once.
    pub fn update(&mut self, dt: f32, should_tick: bool) {
        if !should_tick || self.ended {
            return;
        }

        let previous = self.time_left;
        self.time_left = (self.time_left - dt).max(0.0);

        if previous.floor() != self.time_left.floor() {
            self.bus.emit(GameEvent::TimerChanged {
                time_left_seconds: self.time_left.ceil(),
            });
        }

        if self.time_left <= 0.0 {
            self.ended = true;
            info!("Tape ran out");
            self.bus.emit(GameEvent::GameOver {
                reason: GameOverReason::Other,
            });
        }
    }

    pub fn time_left(&self) -> f32 {
        self.time_left
    }

    pub fn initial_seconds(&self) -> f32 {
        self.initial_seconds
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Seconds of tape used so far.
    pub fn elapsed(&self) -> f32 {
        self.initial_seconds - self.time_left
    }
}
