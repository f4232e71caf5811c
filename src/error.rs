//! Centralized error types for the game.
//!
//! Numeric game state never errors; it is clamped where it is mutated. The errors here
//! cover the edges of the core: devices, persistence, configuration and audio assets.

use std::io;

/// Main error type for the game.
///
/// This is the primary error type that should be used in public APIs.
#[derive(thiserror::Error, Debug)]
pub enum GameError {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Errors raised by microphone input, decoding and playback backends.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    /// The user denied access, or no capture device is available.
    #[error("Microphone unavailable: {0}")]
    PermissionOrDevice(String),

    #[error("Microphone is not connected")]
    NotConnected,

    #[error("Failed to decode sound: {0}")]
    Decode(String),

    #[error("Audio backend failure: {0}")]
    Backend(String),
}

/// Errors from the durable key-value store.
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to extract configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl From<figment::Error> for ConfigError {
    fn from(error: figment::Error) -> Self {
        ConfigError::Extract(Box::new(error))
    }
}
