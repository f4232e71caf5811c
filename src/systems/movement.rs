use glam::Vec3;
use tracing::trace;

use crate::events::{EventBus, GameEvent};

/// Derives a moving/idle flag from successive player positions.
///
/// Only edges are published: a stretch of movement produces one `PlayerMovement` when it
/// starts and one when it stops.
pub struct MovementTracker {
    bus: EventBus,
    threshold: f32,
    last_position: Option<Vec3>,
    is_moving: bool,
    speed: f32,
}

impl MovementTracker {
    pub fn new(bus: EventBus, threshold: f32) -> Self {
        Self {
            bus,
            threshold,
            last_position: None,
            is_moving: false,
            speed: 0.0,
        }
    }

    /// Anchors at `position` and forces an idle announcement.
    pub fn reset(&mut self, position: Vec3) {
        self.last_position = Some(position);
        self.is_moving = false;
        self.speed = 0.0;
        self.bus.emit(GameEvent::PlayerMovement {
            is_moving: false,
            speed: 0.0,
        });
    }

    pub fn update(&mut self, dt: f32, position: Vec3) {
        let Some(last) = self.last_position else {
            self.reset(position);
            return;
        };

        self.speed = if dt > 0.0 { position.distance(last) / dt } else { 0.0 };
        self.last_position = Some(position);

        let moving = self.speed > self.threshold;
        if moving != self.is_moving {
            trace!(moving, speed = self.speed, "Movement edge");
            self.is_moving = moving;
            self.bus.emit(GameEvent::PlayerMovement {
                is_moving: moving,
                speed: self.speed,
            });
        }
    }

    pub fn is_moving(&self) -> bool {
        self.is_moving
    }

    /// Speed measured on the last update, in units per second.
    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}
