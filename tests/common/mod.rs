#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use rand::RngCore;
use shutup::audio::loader::{SoundClip, SoundDecoder};
use shutup::audio::{AudioSink, MicrophoneBackend, SampleBuffer};
use shutup::clock::ManualClock;
use shutup::error::{AudioError, GameError};
use shutup::events::{EventBus, EventKind, GameEvent};
use shutup::game::ui::{ButtonWiring, OverlayMode, UiAction, UiController};
use strum::IntoEnumIterator;

/// Every event emitted on a bus, in order.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<GameEvent>>>,
}

impl EventLog {
    pub fn attach(bus: &EventBus) -> Self {
        let log = Self::default();
        for kind in EventKind::iter() {
            let events = Rc::clone(&log.events);
            bus.on(kind, move |event| events.borrow_mut().push(event.clone()));
        }
        log
    }

    pub fn all(&self) -> Vec<GameEvent> {
        self.events.borrow().clone()
    }

    pub fn of(&self, kind: EventKind) -> Vec<GameEvent> {
        self.events.borrow().iter().filter(|e| e.kind() == kind).cloned().collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.borrow().iter().filter(|e| e.kind() == kind).count()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

/// Microphone that hands out a buffer the test keeps a clone of.
pub struct FakeMicrophone {
    buffer: SampleBuffer,
    fail: bool,
    opens: Rc<RefCell<u32>>,
}

impl FakeMicrophone {
    pub fn new(buffer: SampleBuffer) -> Self {
        Self {
            buffer,
            fail: false,
            opens: Rc::default(),
        }
    }

    pub fn denied() -> Self {
        Self {
            buffer: SampleBuffer::new(),
            fail: true,
            opens: Rc::default(),
        }
    }

    pub fn opens(&self) -> Rc<RefCell<u32>> {
        Rc::clone(&self.opens)
    }
}

impl MicrophoneBackend for FakeMicrophone {
    fn open(&mut self) -> Result<SampleBuffer, AudioError> {
        *self.opens.borrow_mut() += 1;
        if self.fail {
            return Err(AudioError::PermissionOrDevice("permission denied".to_string()));
        }
        Ok(self.buffer.clone())
    }
}

/// Sink that records what would have been played.
#[derive(Default)]
pub struct RecordingSink {
    pub played: RefCell<Vec<Vec<f32>>>,
    pub loops: RefCell<Vec<(usize, f32)>>,
    pub gains: RefCell<Vec<f32>>,
}

impl AudioSink for RecordingSink {
    fn sample_rate(&self) -> u32 {
        8_000
    }

    fn play(&self, samples: Vec<f32>) {
        self.played.borrow_mut().push(samples);
    }

    fn start_loop(&self, samples: Vec<f32>, gain: f32) {
        self.loops.borrow_mut().push((samples.len(), gain));
    }

    fn set_loop_gain(&self, gain: f32) {
        self.gains.borrow_mut().push(gain);
    }
}

/// Decoder that treats every byte as one sample.
pub struct ByteDecoder;

impl SoundDecoder for ByteDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<SoundClip, AudioError> {
        if bytes.is_empty() {
            return Err(AudioError::Decode("empty file".to_string()));
        }
        Ok(SoundClip::new(bytes.iter().map(|b| *b as f32 / 255.0).collect(), 8_000))
    }
}

/// Always yields zero: every roll hits and every range picks its low end.
pub struct ZeroRng;

impl RngCore for ZeroRng {
    fn next_u32(&mut self) -> u32 {
        0
    }

    fn next_u64(&mut self) -> u64 {
        0
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        dest.fill(0);
    }
}

/// Always yields all ones: every roll misses.
pub struct MaxRng;

impl RngCore for MaxRng {
    fn next_u32(&mut self) -> u32 {
        u32::MAX
    }

    fn next_u64(&mut self) -> u64 {
        u64::MAX
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        dest.fill(u8::MAX);
    }
}

/// UI that remembers every overlay change and reported error.
#[derive(Clone, Default)]
pub struct RecordingUi {
    pub overlays: Rc<RefCell<Vec<OverlayMode>>>,
    pub errors: Rc<RefCell<Vec<String>>>,
    pub wiring: Rc<RefCell<Option<ButtonWiring>>>,
}

impl RecordingUi {
    pub fn press(&self, action: UiAction) {
        if let Some(wiring) = self.wiring.borrow().as_ref() {
            wiring.press(action);
        }
    }

    pub fn overlays(&self) -> Vec<OverlayMode> {
        self.overlays.borrow().clone()
    }

    pub fn last_overlay(&self) -> Option<OverlayMode> {
        self.overlays.borrow().last().copied()
    }
}

impl UiController for RecordingUi {
    fn set_overlay_mode(&mut self, mode: OverlayMode) {
        self.overlays.borrow_mut().push(mode);
    }

    fn wire_buttons(&mut self, wiring: ButtonWiring) {
        *self.wiring.borrow_mut() = Some(wiring);
    }

    fn report_error(&mut self, error: &GameError) {
        self.errors.borrow_mut().push(error.to_string());
    }
}

pub fn manual_clock() -> Rc<ManualClock> {
    Rc::new(ManualClock::new(Duration::from_secs(100)))
}

pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
}
