//! Desktop platform layer.

pub mod sdl;

pub use sdl::{open_playback, SdlMicrophone, WavDecoder};
