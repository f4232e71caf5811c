//! Microphone capture: the shared sample window and the device seam.

use std::sync::Arc;

use circular_buffer::CircularBuffer;
use parking_lot::Mutex;

use crate::constants::ANALYSER_SIZE;
use crate::error::AudioError;

type SampleWindow = CircularBuffer<ANALYSER_SIZE, f32>;

/// The most recent time-domain samples from the input device.
///
/// Clones share one window: the capture callback pushes from the audio thread while the
/// analyser and the calibration task read from theirs.
#[derive(Clone)]
pub struct SampleBuffer {
    window: Arc<Mutex<Box<SampleWindow>>>,
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self {
            window: Arc::new(Mutex::new(SampleWindow::boxed())),
        }
    }

    /// Appends captured samples, evicting the oldest once the window is full.
    pub fn push(&self, samples: &[f32]) {
        let mut window = self.window.lock();
        for &sample in samples {
            window.push_back(sample);
        }
    }

    /// Fills the whole window with one value. Handy for driving the analyser with a known level.
    pub fn fill(&self, value: f32) {
        let mut window = self.window.lock();
        for _ in 0..ANALYSER_SIZE {
            window.push_back(value);
        }
    }

    pub fn len(&self) -> usize {
        self.window.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.lock().is_empty()
    }

    /// Root-mean-square level over every sample currently held, oldest first.
    pub fn rms(&self) -> f32 {
        let window = self.window.lock();
        let (front, back) = window.as_slices();
        super::analysis::rms_of_parts(front, back)
    }
}

/// Source of live microphone input.
pub trait MicrophoneBackend {
    /// Opens the capture device and starts streaming into the returned buffer.
    fn open(&mut self) -> Result<SampleBuffer, AudioError>;
}

/// Backend for builds without a capture device. Every request is refused.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMicrophone;

impl MicrophoneBackend for NoMicrophone {
    fn open(&mut self) -> Result<SampleBuffer, AudioError> {
        Err(AudioError::PermissionOrDevice("no capture backend available".to_string()))
    }
}
