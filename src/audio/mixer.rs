//! Software mixer feeding the output device.
//!
//! The game renders complete buffers up front and hands them to an [`AudioSink`]; the
//! device callback pulls mixed samples out of the [`Mixer`] on the audio thread.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

/// Destination for rendered audio.
pub trait AudioSink {
    fn sample_rate(&self) -> u32;
    /// Plays a one-shot buffer once, on top of whatever is already playing.
    fn play(&self, samples: Vec<f32>);
    /// Replaces the looping bed.
    fn start_loop(&self, samples: Vec<f32>, gain: f32);
    fn set_loop_gain(&self, gain: f32);
}

#[derive(Debug)]
struct Voice {
    samples: Vec<f32>,
    cursor: usize,
}

#[derive(Debug)]
struct Bed {
    samples: Vec<f32>,
    cursor: usize,
    gain: f32,
}

/// Sums one-shot voices and a single looping bed into the output buffer.
#[derive(Debug)]
pub struct Mixer {
    sample_rate: u32,
    voices: Vec<Voice>,
    bed: Option<Bed>,
    muted: bool,
}

impl Mixer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            voices: Vec::new(),
            bed: None,
            muted: false,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn play(&mut self, samples: Vec<f32>) {
        if samples.is_empty() {
            return;
        }
        self.voices.push(Voice { samples, cursor: 0 });
    }

    pub fn start_loop(&mut self, samples: Vec<f32>, gain: f32) {
        self.bed = Some(Bed {
            samples,
            cursor: 0,
            gain,
        });
    }

    pub fn set_loop_gain(&mut self, gain: f32) {
        if let Some(bed) = &mut self.bed {
            bed.gain = gain;
        }
    }

    pub fn loop_gain(&self) -> Option<f32> {
        self.bed.as_ref().map(|bed| bed.gain)
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Instantly mute or unmute all output. Voices keep advancing while muted.
    pub fn set_mute(&mut self, mute: bool) {
        self.muted = mute;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Fills `out` with the next mixed samples, clamped to [-1, 1].
    pub fn mix(&mut self, out: &mut [f32]) {
        for slot in out.iter_mut() {
            let mut acc = 0.0;

            for voice in &mut self.voices {
                if let Some(sample) = voice.samples.get(voice.cursor) {
                    acc += sample;
                    voice.cursor += 1;
                }
            }

            if let Some(bed) = &mut self.bed {
                if !bed.samples.is_empty() {
                    acc += bed.samples[bed.cursor] * bed.gain;
                    bed.cursor = (bed.cursor + 1) % bed.samples.len();
                }
            }

            *slot = if self.muted { 0.0 } else { acc.clamp(-1.0, 1.0) };
        }

        let before = self.voices.len();
        self.voices.retain(|voice| voice.cursor < voice.samples.len());
        if self.voices.len() != before {
            trace!(finished = before - self.voices.len(), "Voices finished");
        }
    }
}

/// Thread-safe handle to a [`Mixer`], shared between the game and the device callback.
#[derive(Debug, Clone)]
pub struct MixerHandle {
    mixer: Arc<Mutex<Mixer>>,
}

impl MixerHandle {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            mixer: Arc::new(Mutex::new(Mixer::new(sample_rate))),
        }
    }

    pub fn mix(&self, out: &mut [f32]) {
        self.mixer.lock().mix(out);
    }

    pub fn set_mute(&self, mute: bool) {
        self.mixer.lock().set_mute(mute);
    }

    pub fn active_voices(&self) -> usize {
        self.mixer.lock().active_voices()
    }

    pub fn loop_gain(&self) -> Option<f32> {
        self.mixer.lock().loop_gain()
    }
}

impl AudioSink for MixerHandle {
    fn sample_rate(&self) -> u32 {
        self.mixer.lock().sample_rate()
    }

    fn play(&self, samples: Vec<f32>) {
        self.mixer.lock().play(samples);
    }

    fn start_loop(&self, samples: Vec<f32>, gain: f32) {
        self.mixer.lock().start_loop(samples, gain);
    }

    fn set_loop_gain(&self, gain: f32) {
        self.mixer.lock().set_loop_gain(gain);
    }
}
