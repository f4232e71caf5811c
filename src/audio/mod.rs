//! Audio input and output.
//!
//! Input is the microphone loudness analyser the whole game revolves around. Output is a
//! small software mixer fed with pre-rendered buffers: scare sounds and the ambient bed.

pub mod ambient;
pub mod analysis;
pub mod loader;
pub mod microphone;
pub mod mixer;
pub mod screamer;
pub mod synth;

pub use analysis::{AudioAnalysis, ThresholdBoost};
pub use microphone::{MicrophoneBackend, SampleBuffer};
pub use mixer::{AudioSink, Mixer, MixerHandle};
