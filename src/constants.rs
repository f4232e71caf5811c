//! This module contains all the tuning constants used in the game.

use std::time::Duration;

use glam::Vec3;

pub const LOOP_TIME: Duration = Duration::from_nanos((1_000_000_000.0 / 60.0) as u64);

/// Upper bound on a single frame step, so a stall (window hidden, debugger) cannot teleport the simulation.
pub const MAX_FRAME_DELTA: f32 = 0.05;

/* Microphone */

/// Number of time-domain samples the analyser keeps (and averages RMS over).
pub const ANALYSER_SIZE: usize = 2048;
/// Storage key for the calibrated RMS threshold.
pub const THRESHOLD_STORAGE_KEY: &str = "shutup.mic_threshold";
/// Calibration polls the microphone at this fixed interval, independent of frame rate.
pub const CALIBRATION_POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_CALIBRATION_SECONDS: f32 = 3.0;
pub const CALIBRATION_PEAK_FACTOR: f32 = 1.6;
pub const CALIBRATION_SIGMA_FACTOR: f32 = 6.0;
/// Hard floor; a zero threshold would end every run on the first frame.
pub const MIN_THRESHOLD: f32 = 0.02;
pub const MIN_THRESHOLD_MULTIPLIER: f32 = 0.5;
pub const MAX_THRESHOLD_MULTIPLIER: f32 = 2.0;

/* Panic effect applied after a scare */

pub const PANIC_MAX_TIGHTENING: f32 = 0.25;
pub const PANIC_INTENSITY_FACTOR: f32 = 0.15;
pub const PANIC_DURATION: Duration = Duration::from_millis(2500);

/* Timer */

/// 18 minutes.
pub const DEFAULT_TIMER_SECONDS: u32 = 18 * 60;

/* Movement */

/// Units per second above which the player counts as moving.
pub const DEFAULT_MOVEMENT_THRESHOLD: f32 = 0.1;

/* Corridor layout */

pub const CORRIDOR_SEGMENT_DEPTH: f32 = 22.0;
pub const CORRIDOR_SEGMENTS: u32 = 18;
pub const CORRIDOR_WIDTH: f32 = 20.0;
pub const SPAWN_POSITION: Vec3 = Vec3::new(0.0, 1.8, 0.0);
/// The run is won once the player's z reaches this value.
pub const GOAL_Z: f32 = CORRIDOR_SEGMENT_DEPTH * CORRIDOR_SEGMENTS as f32 - 8.0;
pub const WALK_SPEED: f32 = 4.0;

/* Scare volumes */

pub const SCARE_START_Z: f32 = 24.0;
pub const SCARE_END_Z: f32 = 382.0;
pub const SCARE_APPROX_STEP: f32 = 18.0;
pub const SCARE_JITTER: f32 = 10.0;
pub const SCARE_CENTER_Y: f32 = 1.8;
pub const SCARE_HALF_EXTENTS: Vec3 = Vec3::new(8.5, 3.0, 5.5);
/// Intensities are drawn around this base, then clamped to [0, 1].
pub const SCARE_INTENSITY_BASE: f32 = 0.32;
pub const SCARE_INTENSITY_JITTER: (f32, f32) = (-0.08, 0.28);
pub const SCARE_ONE_SHOT_CHANCE: f32 = 0.55;
pub const SCARE_BASE_CHANCE: f32 = 0.32;
pub const SCARE_INTENSITY_CHANCE: f32 = 0.45;
/// Repeating volumes wait 8-15 s before they can fire again.
pub const SCARE_REPEAT_COOLDOWN_MS: (u64, u64) = (8_000, 15_000);
/// Window between any two scares, reseeded after every fire.
pub const SCARE_GLOBAL_COOLDOWN_MS: (u64, u64) = (4_500, 14_000);
/// Global cooldown in effect before the first reseed of a run.
pub const SCARE_INITIAL_GLOBAL_COOLDOWN: Duration = Duration::from_millis(6_500);

/* Flashlight */

/// Full drain in 60 seconds of continuous use.
pub const FLASHLIGHT_DRAIN_PER_SECOND: f32 = 100.0 / 60.0;
/// Full recharge in 180 seconds.
pub const FLASHLIGHT_REGEN_PER_SECOND: f32 = 100.0 / 180.0;
/// Toggling on is refused at or below this charge.
pub const FLASHLIGHT_MIN_TOGGLE_BATTERY: f32 = 0.5;
/// Below this charge the light is considered empty and switches off.
pub const FLASHLIGHT_EMPTY_EPSILON: f32 = 0.01;
pub const FLASHLIGHT_BASE_INTENSITY: f32 = 12.0;
pub const FLASHLIGHT_BASE_RANGE: f32 = 60.0;

/* Audio output */

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
/// Decoded screamers are cut off after this long.
pub const SCREAMER_MAX_SECONDS: f32 = 1.25;
pub const SCREAMER_EXTENSIONS: [&str; 3] = ["ogg", "mp3", "wav"];

/* Ambient bed levels, in [0, 1] */

pub const AMBIENT_PLAY_LEVEL: f32 = 0.6;
pub const AMBIENT_PRE_PLAY_LEVEL: f32 = AMBIENT_PLAY_LEVEL * 0.5;
pub const AMBIENT_GAME_OVER_LEVEL: f32 = 0.35;
pub const AMBIENT_WIN_LEVEL: f32 = 0.25;
