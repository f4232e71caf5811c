//! Jump-scare volumes along the corridor.
//!
//! Each [`ScareTrigger`] is an axis-aligned box. Walking into one is a chance to fire; what
//! decides whether it does is, in order: one-shot exhaustion, the trigger's own cooldown,
//! the global cooldown shared by every trigger, and finally a weighted coin flip.

use std::rc::Rc;
use std::time::Duration;

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::Rng;
use tracing::{debug, info, trace};

use crate::audio::loader::SoundClip;
use crate::clock::Clock;
use crate::constants::{
    SCARE_APPROX_STEP, SCARE_BASE_CHANCE, SCARE_CENTER_Y, SCARE_END_Z, SCARE_GLOBAL_COOLDOWN_MS, SCARE_HALF_EXTENTS,
    SCARE_INITIAL_GLOBAL_COOLDOWN, SCARE_INTENSITY_BASE, SCARE_INTENSITY_CHANCE, SCARE_INTENSITY_JITTER, SCARE_JITTER,
    SCARE_ONE_SHOT_CHANCE, SCARE_REPEAT_COOLDOWN_MS, SCARE_START_Z,
};
use crate::events::{EventBus, GameEvent};

/// Where a fired scare's sound goes.
pub trait ScareSound {
    fn play(&mut self, id: &str, intensity: f32);

    /// Delivers a finished background load for `id`.
    fn loaded(&mut self, id: String, clip: Option<SoundClip>) {
        let _ = (id, clip);
    }
}

/// Silent sound output, for headless runs.
impl ScareSound for () {
    fn play(&mut self, _id: &str, _intensity: f32) {}
}

/// Probability that an eligible trigger fires.
pub fn fire_chance(intensity: f32) -> f32 {
    SCARE_BASE_CHANCE + intensity * SCARE_INTENSITY_CHANCE
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScareTrigger {
    pub id: String,
    pub center: Vec3,
    pub half_extents: Vec3,
    pub intensity: f32,
    pub one_shot: bool,
    /// Zero for one-shot triggers.
    pub cooldown: Duration,
    triggered: bool,
    last_triggered: Option<Duration>,
    was_inside: bool,
}

impl ScareTrigger {
    pub fn one_shot(id: impl Into<String>, center: Vec3, half_extents: Vec3, intensity: f32) -> Self {
        Self::build(id.into(), center, half_extents, intensity, true, Duration::ZERO)
    }

    pub fn repeating(id: impl Into<String>, center: Vec3, half_extents: Vec3, intensity: f32, cooldown: Duration) -> Self {
        Self::build(id.into(), center, half_extents, intensity, false, cooldown)
    }

    fn build(id: String, center: Vec3, half_extents: Vec3, intensity: f32, one_shot: bool, cooldown: Duration) -> Self {
        Self {
            id,
            center,
            half_extents,
            intensity: intensity.clamp(0.0, 1.0),
            one_shot,
            cooldown,
            triggered: false,
            last_triggered: None,
            was_inside: false,
        }
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: Vec3) -> bool {
        (point - self.center).abs().cmple(self.half_extents).all()
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    pub fn last_triggered(&self) -> Option<Duration> {
        self.last_triggered
    }

    pub fn was_inside(&self) -> bool {
        self.was_inside
    }

    fn is_cooling_down(&self, now: Duration) -> bool {
        match self.last_triggered {
            Some(last) if !self.one_shot && !self.cooldown.is_zero() => now.saturating_sub(last) < self.cooldown,
            _ => false,
        }
    }

    fn reset(&mut self) {
        self.triggered = false;
        self.last_triggered = None;
        self.was_inside = false;
    }
}

/// Scatters triggers along the corridor with jittered spacing.
///
/// The count is fixed by the corridor length; only placement, intensity, and the
/// one-shot/repeating split come from `rng`.
pub fn generate_triggers<R: Rng + ?Sized>(rng: &mut R) -> Vec<ScareTrigger> {
    let count = (((SCARE_END_Z - SCARE_START_Z) / SCARE_APPROX_STEP).floor() as usize + 1).max(1);

    (0..count)
        .map(|i| {
            let z = SCARE_START_Z + i as f32 * SCARE_APPROX_STEP + rng.random_range(-SCARE_JITTER..SCARE_JITTER);
            let id = format!("screamer_{}", i + 1);
            let intensity = SCARE_INTENSITY_BASE + rng.random_range(SCARE_INTENSITY_JITTER.0..SCARE_INTENSITY_JITTER.1);
            let center = Vec3::new(0.0, SCARE_CENTER_Y, z);

            if rng.random::<f32>() < SCARE_ONE_SHOT_CHANCE {
                ScareTrigger::one_shot(id, center, SCARE_HALF_EXTENTS, intensity)
            } else {
                let (min, max) = SCARE_REPEAT_COOLDOWN_MS;
                let cooldown = Duration::from_millis(rng.random_range(min..max));
                ScareTrigger::repeating(id, center, SCARE_HALF_EXTENTS, intensity, cooldown)
            }
        })
        .collect()
}

pub struct ScareScheduler<R: Rng = SmallRng> {
    bus: EventBus,
    clock: Rc<dyn Clock>,
    rng: R,
    sound: Box<dyn ScareSound>,
    triggers: Vec<ScareTrigger>,
    last_global: Option<Duration>,
    global_cooldown: Duration,
}

impl<R: Rng> ScareScheduler<R> {
    /// Generates the corridor's triggers from `rng`, which then keeps driving the coin flips.
    pub fn new(bus: EventBus, clock: Rc<dyn Clock>, mut rng: R, sound: Box<dyn ScareSound>) -> Self {
        let triggers = generate_triggers(&mut rng);
        debug!(count = triggers.len(), "Scare triggers placed");
        Self::with_triggers(bus, clock, rng, sound, triggers)
    }

    pub fn with_triggers(
        bus: EventBus,
        clock: Rc<dyn Clock>,
        rng: R,
        sound: Box<dyn ScareSound>,
        triggers: Vec<ScareTrigger>,
    ) -> Self {
        Self {
            bus,
            clock,
            rng,
            sound,
            triggers,
            last_global: None,
            global_cooldown: SCARE_INITIAL_GLOBAL_COOLDOWN,
        }
    }

    pub fn triggers(&self) -> &[ScareTrigger] {
        &self.triggers
    }

    /// Window that must pass after the last scare before any other can fire.
    pub fn global_cooldown(&self) -> Duration {
        self.global_cooldown
    }

    pub fn last_global(&self) -> Option<Duration> {
        self.last_global
    }

    /// Clears per-run state. Trigger placement is kept.
    pub fn reset(&mut self) {
        for trigger in &mut self.triggers {
            trigger.reset();
        }
        self.last_global = None;
        self.global_cooldown = SCARE_INITIAL_GLOBAL_COOLDOWN;
    }

    pub fn update(&mut self, position: Vec3) {
        let now = self.clock.now();

        for trigger in &mut self.triggers {
            let inside = trigger.contains(position);
            let entered = inside && !trigger.was_inside;
            trigger.was_inside = inside;
            if !entered {
                continue;
            }

            if trigger.one_shot && trigger.triggered {
                continue;
            }
            if trigger.is_cooling_down(now) {
                trace!(id = %trigger.id, "Trigger still cooling down");
                continue;
            }
            if let Some(last) = self.last_global {
                if now.saturating_sub(last) < self.global_cooldown {
                    trace!(id = %trigger.id, "Global scare cooldown active");
                    continue;
                }
            }

            let roll = self.rng.random::<f32>();
            if roll > fire_chance(trigger.intensity) {
                trace!(id = %trigger.id, roll, "Scare roll missed");
                continue;
            }

            trigger.triggered = true;
            trigger.last_triggered = Some(now);
            self.last_global = Some(now);
            let (min, max) = SCARE_GLOBAL_COOLDOWN_MS;
            self.global_cooldown = Duration::from_millis(self.rng.random_range(min..max));

            info!(id = %trigger.id, intensity = trigger.intensity, "Scare triggered");
            self.bus.emit(GameEvent::ScareTriggered {
                id: trigger.id.clone(),
                intensity: trigger.intensity,
            });
            self.sound.play(&trigger.id, trigger.intensity);
        }
    }

    /// Routes a finished sound load to the audio side.
    pub fn sound_loaded(&mut self, id: String, clip: Option<SoundClip>) {
        self.sound.loaded(id, clip);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_layout_covers_corridor() {
        let mut rng = SmallRng::seed_from_u64(7);
        let triggers = generate_triggers(&mut rng);
        assert_eq!(triggers.len(), 20);
        assert_eq!(triggers[0].id, "screamer_1");
        assert_eq!(triggers[19].id, "screamer_20");
        for trigger in &triggers {
            assert!((0.23..=0.61).contains(&trigger.intensity));
            if trigger.one_shot {
                assert_eq!(trigger.cooldown, Duration::ZERO);
            } else {
                assert!(trigger.cooldown >= Duration::from_secs(8) && trigger.cooldown < Duration::from_secs(15));
            }
        }
    }

    #[test]
    fn test_same_seed_same_layout() {
        let a = generate_triggers(&mut SmallRng::seed_from_u64(42));
        let b = generate_triggers(&mut SmallRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_containment_is_inclusive() {
        let trigger = ScareTrigger::one_shot("edge", Vec3::ZERO, Vec3::ONE, 0.5);
        assert!(trigger.contains(Vec3::new(1.0, -1.0, 1.0)));
        assert!(!trigger.contains(Vec3::new(1.01, 0.0, 0.0)));
    }
}
