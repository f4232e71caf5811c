//! Per-frame gameplay systems.
//!
//! Each system owns its state, publishes changes on the event bus, and is advanced by the
//! play state in a fixed order every frame.

pub mod flashlight;
pub mod movement;
pub mod scare;
pub mod timer;

pub use flashlight::{Flashlight, LightOutput};
pub use movement::MovementTracker;
pub use scare::{ScareScheduler, ScareSound, ScareTrigger};
pub use timer::Timer;
