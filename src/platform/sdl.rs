//! SDL2 audio devices: microphone capture, mixed playback, and WAV decoding.

use sdl2::audio::{AudioCVT, AudioCallback, AudioDevice, AudioFormat, AudioSpecDesired, AudioSpecWAV};
use sdl2::rwops::RWops;
use sdl2::AudioSubsystem;
use tracing::{debug, info};

use crate::audio::loader::{SoundClip, SoundDecoder};
use crate::audio::microphone::{MicrophoneBackend, SampleBuffer};
use crate::audio::mixer::MixerHandle;
use crate::error::AudioError;

/// Samples per device callback. Small enough that the analyser window stays fresh.
const DEVICE_BUFFER_SAMPLES: u16 = 1024;

pub struct CaptureCallback {
    buffer: SampleBuffer,
}

impl AudioCallback for CaptureCallback {
    type Channel = f32;

    fn callback(&mut self, input: &mut [f32]) {
        self.buffer.push(input);
    }
}

/// Default capture device, opened on first request and kept open afterwards.
pub struct SdlMicrophone {
    audio: AudioSubsystem,
    sample_rate: u32,
    device: Option<AudioDevice<CaptureCallback>>,
}

impl SdlMicrophone {
    pub fn new(audio: AudioSubsystem, sample_rate: u32) -> Self {
        Self {
            audio,
            sample_rate,
            device: None,
        }
    }
}

impl MicrophoneBackend for SdlMicrophone {
    fn open(&mut self) -> Result<SampleBuffer, AudioError> {
        let buffer = SampleBuffer::new();
        let desired = AudioSpecDesired {
            freq: Some(self.sample_rate as i32),
            channels: Some(1),
            samples: Some(DEVICE_BUFFER_SAMPLES),
        };

        let device = self
            .audio
            .open_capture(None, &desired, |spec| {
                info!(freq = spec.freq, channels = spec.channels, "Capture device opened");
                CaptureCallback { buffer: buffer.clone() }
            })
            .map_err(AudioError::PermissionOrDevice)?;
        device.resume();

        self.device = Some(device);
        Ok(buffer)
    }
}

pub struct PlaybackCallback {
    mixer: MixerHandle,
}

impl AudioCallback for PlaybackCallback {
    type Channel = f32;

    fn callback(&mut self, out: &mut [f32]) {
        self.mixer.mix(out);
    }
}

/// Opens the default output device in mono and returns the mixer feeding it.
///
/// The mixer runs at whatever rate the device settled on, which may differ from the one asked for.
pub fn open_playback(
    audio: &AudioSubsystem,
    sample_rate: u32,
) -> Result<(AudioDevice<PlaybackCallback>, MixerHandle), AudioError> {
    let desired = AudioSpecDesired {
        freq: Some(sample_rate as i32),
        channels: Some(1),
        samples: Some(DEVICE_BUFFER_SAMPLES),
    };

    let mut handle = None;
    let device = audio
        .open_playback(None, &desired, |spec| {
            info!(freq = spec.freq, channels = spec.channels, "Playback device opened");
            let mixer = MixerHandle::new(spec.freq.max(1) as u32);
            handle = Some(mixer.clone());
            PlaybackCallback { mixer }
        })
        .map_err(AudioError::Backend)?;

    let mixer = handle.ok_or_else(|| AudioError::Backend("playback device produced no mixer".to_string()))?;
    device.resume();
    Ok((device, mixer))
}

/// Decodes WAV files and converts them to mono `f32` at the output rate.
///
/// Other containers are rejected, so the loader moves on to the next extension.
#[derive(Debug, Clone, Copy)]
pub struct WavDecoder {
    sample_rate: u32,
}

impl WavDecoder {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

impl SoundDecoder for WavDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<SoundClip, AudioError> {
        let mut rwops = RWops::from_bytes(bytes).map_err(AudioError::Decode)?;
        let wav = AudioSpecWAV::load_wav_rw(&mut rwops).map_err(AudioError::Decode)?;

        let target = AudioFormat::f32_sys();
        let cvt = AudioCVT::new(wav.format, wav.channels, wav.freq, target, 1, self.sample_rate as i32)
            .map_err(AudioError::Decode)?;
        let converted = cvt.convert(wav.buffer().to_vec());

        let samples: Vec<f32> = converted
            .chunks_exact(4)
            .map(|chunk| f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        debug!(
            source_rate = wav.freq,
            source_channels = wav.channels,
            samples = samples.len(),
            "Decoded WAV"
        );
        Ok(SoundClip::new(samples, self.sample_rate))
    }
}
