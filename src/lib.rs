//! SHUT UP! game library crate.
//!
//! The game-state core of a short first-person horror run: stay silent (the microphone is
//! listening), keep moving (the tape only runs while you walk), and reach the end of the
//! corridor before the tape does.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

#[cfg(feature = "sdl")]
#[cfg_attr(coverage_nightly, coverage(off))]
pub mod app;
#[cfg_attr(coverage_nightly, coverage(off))]
pub mod error;
#[cfg_attr(coverage_nightly, coverage(off))]
pub mod formatter;
#[cfg_attr(coverage_nightly, coverage(off))]
pub mod logging;
#[cfg(feature = "sdl")]
#[cfg_attr(coverage_nightly, coverage(off))]
pub mod platform;

pub mod audio;
pub mod clock;
pub mod config;
pub mod constants;
pub mod events;
pub mod game;
pub mod input;
pub mod storage;
pub mod systems;
pub mod tasks;
