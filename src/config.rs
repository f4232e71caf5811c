//! Runtime configuration, read from `SHUTUP_`-prefixed environment variables.

use std::path::PathBuf;

use figment::{providers::Env, Figment};
use serde::Deserialize;

use crate::constants::{DEFAULT_CALIBRATION_SECONDS, DEFAULT_MOVEMENT_THRESHOLD, DEFAULT_SAMPLE_RATE, DEFAULT_TIMER_SECONDS};
use crate::error::ConfigError;

pub const ENV_PREFIX: &str = "SHUTUP_";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// Length of the tape, in seconds of movement.
    #[serde(default = "default_timer_seconds")]
    pub timer_seconds: u32,
    #[serde(default = "default_calibration_seconds")]
    pub calibration_seconds: f32,
    /// Units per second above which the player counts as moving.
    #[serde(default = "default_movement_threshold")]
    pub movement_threshold: f32,
    /// Where the calibrated threshold is stored.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Root of the `sfx/` folder screamer sounds are loaded from.
    #[serde(default = "default_asset_dir")]
    pub asset_dir: PathBuf,
    /// Fixed seed for scare layout and rolls. Random when unset.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default)]
    pub mute: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timer_seconds: default_timer_seconds(),
            calibration_seconds: default_calibration_seconds(),
            movement_threshold: default_movement_threshold(),
            data_dir: default_data_dir(),
            asset_dir: default_asset_dir(),
            seed: None,
            sample_rate: default_sample_rate(),
            mute: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Figment::new().merge(Env::prefixed(ENV_PREFIX)))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.timer_seconds == 0 {
            return Err(ConfigError::Invalid {
                field: "timer_seconds",
                reason: "must be at least one second".to_string(),
            });
        }
        if !(self.calibration_seconds.is_finite() && self.calibration_seconds > 0.0) {
            return Err(ConfigError::Invalid {
                field: "calibration_seconds",
                reason: format!("expected a positive number, got {}", self.calibration_seconds),
            });
        }
        if !(self.movement_threshold.is_finite() && self.movement_threshold >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "movement_threshold",
                reason: format!("expected a non-negative number, got {}", self.movement_threshold),
            });
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid {
                field: "sample_rate",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

fn default_timer_seconds() -> u32 {
    DEFAULT_TIMER_SECONDS
}

fn default_calibration_seconds() -> f32 {
    DEFAULT_CALIBRATION_SECONDS
}

fn default_movement_threshold() -> f32 {
    DEFAULT_MOVEMENT_THRESHOLD
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_asset_dir() -> PathBuf {
    PathBuf::from("assets")
}

fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_empty_environment() {
        let config = Config::from_figment(Figment::new()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.timer_seconds, 18 * 60);
    }
}
