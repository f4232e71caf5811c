//! Handheld flashlight with a draining battery.

use tracing::{debug, info};

use crate::constants::{
    FLASHLIGHT_BASE_INTENSITY, FLASHLIGHT_BASE_RANGE, FLASHLIGHT_DRAIN_PER_SECOND, FLASHLIGHT_EMPTY_EPSILON,
    FLASHLIGHT_MIN_TOGGLE_BATTERY, FLASHLIGHT_REGEN_PER_SECOND,
};
use crate::events::{EventBus, GameEvent};

/// Light parameters for the renderer, recomputed on every update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightOutput {
    pub intensity: f32,
    pub range: f32,
}

impl LightOutput {
    /// Dims with the battery instead of cutting out: a lit flashlight never drops below 5%
    /// intensity, and the range shrinks to 55% at empty.
    pub fn for_state(is_on: bool, battery_percent: f32) -> Self {
        let charge = (battery_percent / 100.0).clamp(0.0, 1.0);
        let scale = if is_on { charge.max(0.05) } else { 0.0 };
        Self {
            intensity: FLASHLIGHT_BASE_INTENSITY * scale,
            range: FLASHLIGHT_BASE_RANGE * (0.55 + 0.45 * charge),
        }
    }
}

pub struct Flashlight {
    bus: EventBus,
    is_on: bool,
    battery: f32,
    light: LightOutput,
}

impl Flashlight {
    /// A lit flashlight on a full battery. Announces its state right away.
    pub fn new(bus: EventBus) -> Self {
        let flashlight = Self {
            bus,
            is_on: true,
            battery: 100.0,
            light: LightOutput::for_state(true, 100.0),
        };
        flashlight.publish();
        flashlight
    }

    pub fn reset(&mut self) {
        self.is_on = true;
        self.battery = 100.0;
        self.publish();
        self.apply();
    }

    /// Flips the light. Turning on is refused when the battery is (nearly) dead.
    pub fn toggle(&mut self) -> bool {
        if !self.is_on && self.battery <= FLASHLIGHT_MIN_TOGGLE_BATTERY {
            debug!(battery = self.battery, "Flashlight too drained to turn on");
            return false;
        }
        self.is_on = !self.is_on;
        self.publish();
        self.apply();
        true
    }

    pub fn update(&mut self, dt: f32) {
        let previous = self.battery;
        let mut published = false;

        if self.is_on {
            self.battery = (self.battery - FLASHLIGHT_DRAIN_PER_SECOND * dt).max(0.0);
            if self.battery <= FLASHLIGHT_EMPTY_EPSILON {
                info!("Flashlight battery dead");
                self.battery = 0.0;
                self.is_on = false;
                self.publish();
                published = true;
            }
        } else {
            self.battery = (self.battery + FLASHLIGHT_REGEN_PER_SECOND * dt).min(100.0);
        }

        if !published && previous.floor() != self.battery.floor() {
            self.bus.emit(GameEvent::BatteryChanged { percent: self.battery });
        }
        self.apply();
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }

    pub fn battery_percent(&self) -> f32 {
        self.battery
    }

    pub fn light(&self) -> LightOutput {
        self.light
    }

    fn publish(&self) {
        self.bus.emit(GameEvent::FlashlightChanged { is_on: self.is_on });
        self.bus.emit(GameEvent::BatteryChanged { percent: self.battery });
    }

    fn apply(&mut self) {
        self.light = LightOutput::for_state(self.is_on, self.battery);
    }
}
