//! Scare playback: loaded screamers when available, the synthesized stinger otherwise.

use std::rc::Rc;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{debug, trace};

use crate::audio::loader::{Lookup, SoundBank, SoundClip};
use crate::audio::mixer::AudioSink;
use crate::audio::synth;
use crate::systems::scare::ScareSound;

pub struct ScreamerPlayer {
    bank: SoundBank,
    sink: Rc<dyn AudioSink>,
    rng: SmallRng,
}

impl ScreamerPlayer {
    pub fn new(bank: SoundBank, sink: Rc<dyn AudioSink>, seed: u64) -> Self {
        Self {
            bank,
            sink,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn bank(&self) -> &SoundBank {
        &self.bank
    }

    fn play_resolved(&mut self, clip: Option<&SoundClip>, intensity: f32) {
        let sample_rate = self.sink.sample_rate();
        let samples = match clip {
            Some(clip) => {
                let rate = synth::playback_rate_jitter(&mut self.rng);
                trace!(intensity, rate, "Playing screamer clip");
                synth::render_screamer(clip, intensity, rate, sample_rate)
            }
            None => {
                trace!(intensity, "Playing synthesized stinger");
                synth::render_stinger(intensity, sample_rate, &mut self.rng)
            }
        };
        self.sink.play(samples);
    }
}

impl ScareSound for ScreamerPlayer {
    fn play(&mut self, id: &str, intensity: f32) {
        match self.bank.request(id, intensity) {
            Lookup::Ready(clip) => self.play_resolved(clip.as_deref(), intensity),
            Lookup::Pending => {}
        }
    }

    fn loaded(&mut self, id: String, clip: Option<SoundClip>) {
        let (clip, waiting) = self.bank.complete(id, clip);
        debug!(found = clip.is_some(), waiting = waiting.len(), "Screamer load resolved");
        for intensity in waiting {
            self.play_resolved(clip.as_deref(), intensity);
        }
    }
}
