//! Microphone loudness analysis, calibration and the noise rule.
//!
//! [`AudioAnalysis`] owns the connection to the capture device and the calibrated RMS
//! threshold. Each active frame it publishes the current level and, while a run is in
//! progress, ends the run when the level breaks the (possibly panic-tightened) threshold.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::audio::microphone::{MicrophoneBackend, SampleBuffer};
use crate::clock::Clock;
use crate::constants::{
    CALIBRATION_PEAK_FACTOR, CALIBRATION_POLL_INTERVAL, CALIBRATION_SIGMA_FACTOR, MAX_THRESHOLD_MULTIPLIER,
    MIN_THRESHOLD, MIN_THRESHOLD_MULTIPLIER, THRESHOLD_STORAGE_KEY,
};
use crate::error::AudioError;
use crate::events::{EventBus, GameEvent, GameOverReason};
use crate::storage::KeyValueStore;
use crate::tasks::{TaskResult, TaskSpawner};

/// Root-mean-square amplitude of `samples`. An empty window is silent.
pub fn rms(samples: &[f32]) -> f32 {
    rms_of_parts(samples, &[])
}

/// RMS over two slices read back to back, as a ring buffer hands them out.
pub(crate) fn rms_of_parts(front: &[f32], back: &[f32]) -> f32 {
    let count = front.len() + back.len();
    if count == 0 {
        return 0.0;
    }
    let sum: f32 = front.iter().chain(back).map(|v| v * v).sum();
    (sum / count as f32).sqrt()
}

/// Summary of the RMS readings collected during calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationStats {
    pub mean: f32,
    /// Population standard deviation.
    pub std_dev: f32,
    pub peak: f32,
}

impl CalibrationStats {
    pub fn from_samples(samples: &[f32]) -> Self {
        if samples.is_empty() {
            return Self {
                mean: 0.0,
                std_dev: 0.0,
                peak: 0.0,
            };
        }

        let count = samples.len() as f32;
        let mean = samples.iter().sum::<f32>() / count;
        let variance = samples.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / count;
        let peak = samples.iter().copied().fold(f32::NEG_INFINITY, f32::max);

        Self {
            mean,
            std_dev: variance.sqrt(),
            peak,
        }
    }

    /// `max(peak * 1.6, mean + 6 * std_dev, 0.02)`.
    pub fn threshold(&self) -> f32 {
        (self.peak * CALIBRATION_PEAK_FACTOR)
            .max(self.mean + CALIBRATION_SIGMA_FACTOR * self.std_dev)
            .max(MIN_THRESHOLD)
    }
}

/// Threshold computed from a sequence of calibration readings.
pub fn threshold_from_samples(samples: &[f32]) -> f32 {
    CalibrationStats::from_samples(samples).threshold()
}

/// Number of polls a calibration window of `seconds` takes. The first poll is immediate.
pub fn calibration_poll_count(seconds: f32) -> usize {
    let window = Duration::try_from_secs_f32(seconds.max(0.0)).unwrap_or_default();
    let polls = window.as_nanos().div_ceil(CALIBRATION_POLL_INTERVAL.as_nanos());
    (polls as usize).max(1)
}

/// Polls `input` every 50 ms and reports one RMS reading per poll.
pub async fn sample_calibration(input: SampleBuffer, polls: usize) -> TaskResult {
    let mut interval = tokio::time::interval(CALIBRATION_POLL_INTERVAL);
    let mut samples = Vec::with_capacity(polls);
    for _ in 0..polls {
        interval.tick().await;
        samples.push(input.rms());
    }
    TaskResult::CalibrationSampled { samples }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Boost {
    multiplier: f32,
    expires_at: Option<Duration>,
}

impl Default for Boost {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            expires_at: None,
        }
    }
}

/// Temporary scale applied to the noise threshold.
///
/// Clones share state, so the scare handler can tighten the threshold the analyser reads
/// in the same frame.
#[derive(Clone)]
pub struct ThresholdBoost {
    state: Rc<Cell<Boost>>,
    clock: Rc<dyn Clock>,
}

impl ThresholdBoost {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            state: Rc::new(Cell::new(Boost::default())),
            clock,
        }
    }

    /// Scales the threshold by `multiplier` (clamped to [0.5, 2]) until `duration` has passed.
    pub fn apply(&self, multiplier: f32, duration: Duration) {
        let multiplier = multiplier.clamp(MIN_THRESHOLD_MULTIPLIER, MAX_THRESHOLD_MULTIPLIER);
        let expires_at = self.clock.now() + duration;
        debug!(multiplier, ?expires_at, "Threshold boost applied");
        self.state.set(Boost {
            multiplier,
            expires_at: Some(expires_at),
        });
    }

    /// Drops the boost once its deadline is behind us.
    fn expire(&self) {
        let boost = self.state.get();
        if let Some(expires_at) = boost.expires_at {
            if self.clock.now() > expires_at {
                trace!("Threshold boost expired");
                self.state.set(Boost::default());
            }
        }
    }

    pub fn multiplier(&self) -> f32 {
        self.state.get().multiplier
    }

    pub fn is_active(&self) -> bool {
        self.state.get().expires_at.is_some()
    }

    pub fn clear(&self) {
        self.state.set(Boost::default());
    }
}

pub struct AudioAnalysis {
    bus: EventBus,
    backend: Box<dyn MicrophoneBackend>,
    store: Box<dyn KeyValueStore>,
    spawner: Option<TaskSpawner>,
    input: Option<SampleBuffer>,
    threshold: Option<f32>,
    boost: ThresholdBoost,
    in_game: bool,
    calibrating: bool,
}

impl AudioAnalysis {
    /// Builds the analyser and restores a previously calibrated threshold.
    ///
    /// A stored value that is not a finite positive number is ignored. A valid one is
    /// announced with `MicCalibrated` right away.
    pub fn new(
        bus: EventBus,
        backend: Box<dyn MicrophoneBackend>,
        store: Box<dyn KeyValueStore>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let threshold = store.get(THRESHOLD_STORAGE_KEY).and_then(|saved| match saved.trim().parse::<f32>() {
            Ok(value) if value.is_finite() && value > 0.0 => Some(value),
            _ => {
                warn!(saved = %saved, "Ignoring invalid stored microphone threshold");
                None
            }
        });

        if let Some(threshold) = threshold {
            info!(threshold, "Restored microphone threshold");
            bus.emit(GameEvent::MicCalibrated { threshold });
        }

        Self {
            bus,
            backend,
            store,
            spawner: None,
            input: None,
            threshold,
            boost: ThresholdBoost::new(clock),
            in_game: false,
            calibrating: false,
        }
    }

    /// Lets calibration run in the background on the given runtime.
    pub fn with_spawner(mut self, spawner: TaskSpawner) -> Self {
        self.spawner = Some(spawner);
        self
    }

    pub fn threshold(&self) -> Option<f32> {
        self.threshold
    }

    /// The threshold the noise rule compares against right now.
    pub fn effective_threshold(&self) -> Option<f32> {
        self.threshold.map(|threshold| threshold * self.boost.multiplier())
    }

    pub fn is_connected(&self) -> bool {
        self.input.is_some()
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibrating
    }

    pub fn is_in_game(&self) -> bool {
        self.in_game
    }

    /// Gates whether a breach can end the run. Menus and calibration run with this off.
    pub fn set_in_game(&mut self, in_game: bool) {
        self.in_game = in_game;
    }

    pub fn input(&self) -> Option<&SampleBuffer> {
        self.input.as_ref()
    }

    /// Shared handle to the panic boost, for the scare handler.
    pub fn threshold_boost(&self) -> ThresholdBoost {
        self.boost.clone()
    }

    /// Opens the capture device. Does nothing if already connected.
    pub fn connect_microphone(&mut self) -> Result<(), AudioError> {
        if self.input.is_some() {
            return Ok(());
        }

        match self.backend.open() {
            Ok(input) => {
                info!("Microphone connected");
                self.input = Some(input);
                Ok(())
            }
            Err(error) => {
                warn!(%error, "Microphone connection failed");
                Err(error)
            }
        }
    }

    /// Starts a calibration window of `seconds`, connecting the microphone first if needed.
    ///
    /// Sampling runs as a background task; the result comes back through
    /// [`TaskResult::CalibrationSampled`] and is applied by [`AudioAnalysis::finish_calibration`].
    pub fn calibrate(&mut self, seconds: f32) -> Result<(), AudioError> {
        self.connect_microphone()?;
        if self.calibrating {
            debug!("Calibration already running");
            return Ok(());
        }

        let input = self.input.clone().ok_or(AudioError::NotConnected)?;
        let spawner = self
            .spawner
            .as_ref()
            .ok_or_else(|| AudioError::Backend("no task runtime for calibration".to_string()))?;

        let polls = calibration_poll_count(seconds);
        info!(seconds, polls, "Calibrating microphone, stay silent");
        spawner.spawn(sample_calibration(input, polls));
        self.calibrating = true;
        Ok(())
    }

    /// Sets, persists and announces the threshold derived from calibration readings.
    pub fn finish_calibration(&mut self, samples: &[f32]) -> f32 {
        self.calibrating = false;

        let stats = CalibrationStats::from_samples(samples);
        let threshold = stats.threshold();
        info!(
            threshold,
            mean = stats.mean,
            std_dev = stats.std_dev,
            peak = stats.peak,
            samples = samples.len(),
            "Calibration complete"
        );

        self.threshold = Some(threshold);
        if let Err(error) = self.store.set(THRESHOLD_STORAGE_KEY, &threshold.to_string()) {
            warn!(%error, "Could not persist microphone threshold");
        }
        self.bus.emit(GameEvent::MicCalibrated { threshold });
        threshold
    }

    /// Tightens or loosens the noise rule for a short window.
    pub fn apply_temporary_threshold_multiplier(&self, multiplier: f32, duration: Duration) {
        self.boost.apply(multiplier, duration);
    }

    /// Publishes the current level and applies the noise rule. Does nothing until connected.
    pub fn update(&mut self) {
        let Some(input) = &self.input else {
            return;
        };

        self.boost.expire();

        let rms = input.rms();
        self.bus.emit(GameEvent::MicLevel { rms });

        let Some(threshold) = self.threshold else {
            return;
        };
        if self.in_game && rms > threshold * self.boost.multiplier() {
            info!(rms, threshold, multiplier = self.boost.multiplier(), "Noise detected");
            self.bus.emit(GameEvent::NoiseDetected { rms, threshold });
            self.bus.emit(GameEvent::GameOver {
                reason: GameOverReason::Noise,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms_of_split_window_matches_contiguous() {
        let samples = [0.5, -0.25, 0.125, 0.0, -1.0];
        assert_eq!(rms_of_parts(&samples[..2], &samples[2..]), rms(&samples));
    }

    #[test]
    fn test_empty_window_is_silent() {
        assert_eq!(rms(&[]), 0.0);
        assert_eq!(threshold_from_samples(&[]), MIN_THRESHOLD);
    }

    #[test]
    fn test_poll_count_rounds_up() {
        assert_eq!(calibration_poll_count(3.0), 60);
        assert_eq!(calibration_poll_count(0.12), 3);
        assert_eq!(calibration_poll_count(0.0), 1);
    }
}
