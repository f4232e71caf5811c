//! Background noise bed whose loudness follows the flow of the game.

use std::rc::Rc;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{debug, trace};

use crate::audio::mixer::AudioSink;
use crate::audio::synth;

const START_GAIN: f32 = 0.04;
const MIN_GAIN: f32 = 0.02;
const GAIN_RANGE: f32 = 0.06;

/// Gain for a level in [0, 1]. Out-of-range levels are clamped.
pub fn gain_for_level(level: f32) -> f32 {
    MIN_GAIN + level.clamp(0.0, 1.0) * GAIN_RANGE
}

pub struct AmbientBed {
    sink: Rc<dyn AudioSink>,
    rng: SmallRng,
    started: bool,
    gain: Option<f32>,
}

impl AmbientBed {
    pub fn new(sink: Rc<dyn AudioSink>, seed: u64) -> Self {
        Self {
            sink,
            rng: SmallRng::seed_from_u64(seed),
            started: false,
            gain: None,
        }
    }

    /// Starts the looping bed. Later calls do nothing.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        let bed = synth::render_ambient_bed(self.sink.sample_rate(), &mut self.rng);
        debug!(samples = bed.len(), "Ambient bed started");
        self.sink.start_loop(bed, START_GAIN);
        self.gain = Some(START_GAIN);
        self.started = true;
    }

    /// Sets the bed loudness. Ignored until [`AmbientBed::start`] has run.
    pub fn set_level(&mut self, level: f32) {
        if !self.started {
            trace!(level, "Ambient level ignored before start");
            return;
        }
        let gain = gain_for_level(level);
        self.sink.set_loop_gain(gain);
        self.gain = Some(gain);
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Current loop gain, `None` before the bed starts.
    pub fn gain(&self) -> Option<f32> {
        self.gain
    }
}
