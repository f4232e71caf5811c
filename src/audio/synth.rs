//! Offline rendering of every sound the game plays: enveloped screamers, the synthesized
//! stinger used when no asset exists, and the ambient noise bed.
//!
//! Everything renders to mono `f32` buffers at the output sample rate; the mixer only sums.

use std::f32::consts::PI;

use rand::Rng;

use crate::audio::loader::SoundClip;
use crate::constants::SCREAMER_MAX_SECONDS;

/// Gain floor used as the start and end of every envelope.
const SILENCE: f32 = 0.0001;
const SCREAMER_ATTACK: f32 = 0.015;
const STINGER_ATTACK: f32 = 0.02;
const STINGER_HIGHPASS_HZ: f32 = 700.0;
const STINGER_BANDPASS_Q: f32 = 6.0;
const STINGER_GLIDE_END_HZ: f32 = 110.0;
const AMBIENT_SECONDS: f32 = 2.0;
const AMBIENT_AMPLITUDE: f32 = 0.15;

/// Gain at time `t` of a linear attack to `peak` followed by an exponential decay that
/// reaches silence at `duration`.
pub fn envelope(t: f32, attack: f32, duration: f32, peak: f32) -> f32 {
    if t <= 0.0 {
        return SILENCE;
    }
    if t < attack {
        return SILENCE + (peak - SILENCE) * (t / attack);
    }
    if duration <= attack {
        return SILENCE;
    }
    let progress = ((t - attack) / (duration - attack)).min(1.0);
    peak * (SILENCE / peak).powf(progress)
}

pub fn screamer_peak(intensity: f32) -> f32 {
    (0.55 + intensity * 0.55).min(1.0)
}

/// Random playback rate in [0.92, 1.10).
pub fn playback_rate_jitter<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    0.92 + rng.random::<f32>() * 0.18
}

/// Resamples `clip` at `playback_rate`, cuts it at 1.25 s and applies the screamer envelope.
pub fn render_screamer(clip: &SoundClip, intensity: f32, playback_rate: f32, sample_rate: u32) -> Vec<f32> {
    if clip.samples.is_empty() || clip.sample_rate == 0 || sample_rate == 0 {
        return Vec::new();
    }

    let step = playback_rate * clip.sample_rate as f32 / sample_rate as f32;
    let natural = (clip.samples.len() as f32 / step) as usize;
    let cap = (SCREAMER_MAX_SECONDS * sample_rate as f32) as usize;
    let len = natural.min(cap);
    let duration = len as f32 / sample_rate as f32;
    let peak = screamer_peak(intensity);

    (0..len)
        .map(|i| {
            let position = i as f32 * step;
            let index = position as usize;
            let frac = position - index as f32;
            let a = clip.samples[index.min(clip.samples.len() - 1)];
            let b = clip.samples[(index + 1).min(clip.samples.len() - 1)];
            let t = i as f32 / sample_rate as f32;
            (a + (b - a) * frac) * envelope(t, SCREAMER_ATTACK, duration, peak)
        })
        .collect()
}

/// Second-order IIR section (RBJ cookbook coefficients).
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    fn from_coefficients(b: [f32; 3], a: [f32; 3]) -> Self {
        Self {
            b0: b[0] / a[0],
            b1: b[1] / a[0],
            b2: b[2] / a[0],
            a1: a[1] / a[0],
            a2: a[2] / a[0],
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    fn highpass(cutoff: f32, q: f32, sample_rate: f32) -> Self {
        let w0 = 2.0 * PI * cutoff / sample_rate;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * q);
        Self::from_coefficients(
            [(1.0 + cos) / 2.0, -(1.0 + cos), (1.0 + cos) / 2.0],
            [1.0 + alpha, -2.0 * cos, 1.0 - alpha],
        )
    }

    /// Constant 0 dB peak gain band-pass.
    fn bandpass(center: f32, q: f32, sample_rate: f32) -> Self {
        let w0 = 2.0 * PI * center / sample_rate;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * q);
        Self::from_coefficients([alpha, 0.0, -alpha], [1.0 + alpha, -2.0 * cos, 1.0 - alpha])
    }

    fn process(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.b1 * self.x1 + self.b2 * self.x2 - self.a1 * self.y1 - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

pub fn stinger_duration(intensity: f32) -> f32 {
    0.45 + intensity * 0.45
}

/// Synthesized scare: a filtered noise burst over a sawtooth gliding down to 110 Hz,
/// enveloped and soft-limited.
pub fn render_stinger<R: Rng + ?Sized>(intensity: f32, sample_rate: u32, rng: &mut R) -> Vec<f32> {
    let rate = sample_rate as f32;
    let duration = stinger_duration(intensity);
    let len = (rate * duration) as usize;
    if len == 0 {
        return Vec::new();
    }

    let mut highpass = Biquad::highpass(STINGER_HIGHPASS_HZ, 1.0, rate);
    let mut bandpass = Biquad::bandpass(1200.0 + intensity * 900.0, STINGER_BANDPASS_Q, rate);
    let start_hz = 520.0 + intensity * 420.0;
    let peak = (0.35 + intensity * 0.75).min(1.0);
    let mut phase = 0.0f32;

    (0..len)
        .map(|i| {
            let t = i as f32 / rate;
            let progress = i as f32 / len as f32;

            let noise = (rng.random::<f32>() * 2.0 - 1.0) * (1.0 - progress).powi(2);
            let noise = bandpass.process(highpass.process(noise));

            let freq = start_hz * (STINGER_GLIDE_END_HZ / start_hz).powf(t / duration);
            phase = (phase + freq / rate).fract();
            let saw = 2.0 * phase - 1.0;

            let out = (noise + saw) * envelope(t, STINGER_ATTACK, duration, peak);
            soft_limit(out)
        })
        .collect()
}

/// Smooth saturation standing in for a dynamics compressor. Output stays within (-1, 1).
pub fn soft_limit(sample: f32) -> f32 {
    sample.tanh()
}

/// Two seconds of quiet white noise, looped by the mixer under everything else.
pub fn render_ambient_bed<R: Rng + ?Sized>(sample_rate: u32, rng: &mut R) -> Vec<f32> {
    let len = (sample_rate as f32 * AMBIENT_SECONDS) as usize;
    (0..len)
        .map(|_| (rng.random::<f32>() * 2.0 - 1.0) * AMBIENT_AMPLITUDE)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_reaches_peak_after_attack() {
        assert!((envelope(0.015, 0.015, 1.0, 0.8) - 0.8).abs() < 1e-6);
        assert!(envelope(0.0075, 0.015, 1.0, 0.8) < 0.8);
    }

    #[test]
    fn test_envelope_decays_to_silence() {
        assert!((envelope(1.0, 0.015, 1.0, 0.8) - SILENCE).abs() < 1e-6);
        assert!(envelope(0.5, 0.015, 1.0, 0.8) < 0.8);
    }

    #[test]
    fn test_biquad_highpass_blocks_dc() {
        let mut filter = Biquad::highpass(700.0, 1.0, 44_100.0);
        let mut last = 1.0;
        for _ in 0..4096 {
            last = filter.process(1.0);
        }
        assert!(last.abs() < 1e-3);
    }
}
