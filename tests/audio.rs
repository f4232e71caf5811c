use std::rc::Rc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use shutup::audio::analysis::{rms, threshold_from_samples, CalibrationStats};
use shutup::audio::microphone::NoMicrophone;
use shutup::audio::{AudioAnalysis, SampleBuffer};
use shutup::clock::ManualClock;
use shutup::constants::THRESHOLD_STORAGE_KEY;
use shutup::error::AudioError;
use shutup::events::{EventBus, EventKind, GameEvent, GameOverReason};
use shutup::storage::{KeyValueStore, MemoryStore};
use shutup::tasks::{TaskQueue, TaskResult};
use speculoos::prelude::*;

mod common;
use common::{approx_eq, manual_clock, EventLog, FakeMicrophone};

struct Rig {
    bus: EventBus,
    log: EventLog,
    clock: Rc<ManualClock>,
    buffer: SampleBuffer,
    store: MemoryStore,
    audio: AudioAnalysis,
}

fn rig(store: MemoryStore) -> Rig {
    let bus = EventBus::new();
    let log = EventLog::attach(&bus);
    let clock = manual_clock();
    let buffer = SampleBuffer::new();
    let audio = AudioAnalysis::new(
        bus.clone(),
        Box::new(FakeMicrophone::new(buffer.clone())),
        Box::new(store.clone()),
        clock.clone(),
    );
    Rig {
        bus,
        log,
        clock,
        buffer,
        store,
        audio,
    }
}

fn calibrated(threshold: f32) -> Rig {
    rig(MemoryStore::with_entry(THRESHOLD_STORAGE_KEY, &threshold.to_string()))
}

#[test]
fn test_level_is_rms_of_window() {
    let mut rig = rig(MemoryStore::default());
    rig.audio.connect_microphone().unwrap();

    let samples: [f32; 5] = [0.1, -0.2, 0.3, -0.4, 0.05];
    rig.buffer.push(&samples);
    rig.audio.update();

    assert_eq!(rig.log.of(EventKind::MicLevel), vec![GameEvent::MicLevel { rms: rms(&samples) }]);
}

#[test]
fn test_update_before_connect_is_silent() {
    let mut rig = calibrated(0.1);
    rig.log.clear();
    rig.audio.set_in_game(true);
    rig.audio.update();
    assert_that(&rig.log.all()).is_empty();
}

#[test]
fn test_window_keeps_only_latest_samples() {
    let buffer = SampleBuffer::new();
    buffer.fill(1.0);
    buffer.fill(0.5);
    assert_eq!(buffer.len(), shutup::constants::ANALYSER_SIZE);
    assert!(approx_eq(buffer.rms(), 0.5));
}

#[test]
fn test_noise_above_threshold_ends_run() {
    let mut rig = calibrated(0.1);
    rig.audio.connect_microphone().unwrap();
    rig.audio.set_in_game(true);
    rig.buffer.fill(0.3);
    rig.log.clear();

    rig.audio.update();

    let events = rig.log.all();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].kind(), EventKind::MicLevel);
    match &events[1] {
        GameEvent::NoiseDetected { rms, threshold } => {
            assert!(approx_eq(*rms, 0.3));
            assert_eq!(*threshold, 0.1);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(
        events[2],
        GameEvent::GameOver {
            reason: GameOverReason::Noise
        }
    );
}

#[test]
fn test_noise_ignored_outside_a_run() {
    let mut rig = calibrated(0.1);
    rig.audio.connect_microphone().unwrap();
    rig.buffer.fill(0.9);
    rig.audio.update();

    assert_eq!(rig.log.count(EventKind::MicLevel), 1);
    assert_eq!(rig.log.count(EventKind::GameOver), 0);
}

#[test]
fn test_level_equal_to_threshold_is_tolerated() {
    let mut rig = calibrated(0.5);
    rig.audio.connect_microphone().unwrap();
    rig.audio.set_in_game(true);
    rig.buffer.fill(0.5);
    rig.audio.update();
    assert_eq!(rig.log.count(EventKind::GameOver), 0);
}

#[test]
fn test_boost_tightens_then_expires() {
    let mut rig = calibrated(0.2);
    rig.audio.connect_microphone().unwrap();
    rig.audio.set_in_game(true);
    rig.buffer.fill(0.15);

    rig.audio.apply_temporary_threshold_multiplier(0.7, Duration::from_millis(2500));
    assert!(approx_eq(rig.audio.effective_threshold().unwrap(), 0.14));

    rig.clock.advance(Duration::from_millis(2501));
    rig.audio.update();
    assert_eq!(rig.log.count(EventKind::GameOver), 0);
    assert!(!rig.audio.threshold_boost().is_active());

    rig.audio.apply_temporary_threshold_multiplier(0.7, Duration::from_millis(2500));
    rig.audio.update();
    assert_eq!(rig.log.count(EventKind::GameOver), 1);
}

#[test]
fn test_boost_multiplier_is_clamped() {
    let rig = calibrated(0.2);
    rig.audio.apply_temporary_threshold_multiplier(0.1, Duration::from_secs(1));
    assert_eq!(rig.audio.threshold_boost().multiplier(), 0.5);
    rig.audio.apply_temporary_threshold_multiplier(5.0, Duration::from_secs(1));
    assert_eq!(rig.audio.threshold_boost().multiplier(), 2.0);
}

#[test]
fn test_stored_threshold_is_restored_and_announced() {
    let rig = calibrated(0.07);
    assert_eq!(rig.audio.threshold(), Some(0.07));
    assert_eq!(rig.log.of(EventKind::MicCalibrated), vec![GameEvent::MicCalibrated { threshold: 0.07 }]);
}

#[test]
fn test_no_stored_threshold_means_uncalibrated() {
    let audio = AudioAnalysis::new(
        EventBus::new(),
        Box::new(NoMicrophone),
        Box::new(MemoryStore::default()),
        manual_clock(),
    );
    assert_eq!(audio.threshold(), None);
    assert_eq!(audio.effective_threshold(), None);
}

#[test]
fn test_invalid_stored_threshold_is_ignored() {
    for saved in ["", "abc", "-0.5", "0", "NaN", "inf"] {
        let rig = rig(MemoryStore::with_entry(THRESHOLD_STORAGE_KEY, saved));
        assert_eq!(rig.audio.threshold(), None, "stored value {saved:?}");
    }
}

#[test]
fn test_calibration_formula() {
    let samples: [f32; 4] = [0.01, 0.02, 0.015, 0.30];
    let stats = CalibrationStats::from_samples(&samples);
    let mean: f32 = (0.01 + 0.02 + 0.015 + 0.30) / 4.0;
    let variance = samples.iter().map(|v: &f32| (v - mean).powi(2)).sum::<f32>() / 4.0;
    let expected = (0.30f32 * 1.6).max(mean + 6.0 * variance.sqrt()).max(0.02);

    assert!(approx_eq(stats.mean, mean));
    assert_eq!(stats.peak, 0.30);
    assert!(approx_eq(stats.threshold(), expected));
    assert!(stats.threshold() > 0.48, "sigma term dominates for a single spike");
}

#[test]
fn test_silent_calibration_hits_floor() {
    assert_eq!(threshold_from_samples(&[0.0; 60]), 0.02);
    assert_eq!(threshold_from_samples(&[0.001, 0.001, 0.001]), 0.02);
}

#[test]
fn test_finish_calibration_persists_and_announces() {
    let mut rig = rig(MemoryStore::default());
    let threshold = rig.audio.finish_calibration(&[0.05, 0.05, 0.05]);

    assert!(approx_eq(threshold, 0.08));
    assert_eq!(rig.audio.threshold(), Some(threshold));
    assert_eq!(rig.store.get(THRESHOLD_STORAGE_KEY), Some(threshold.to_string()));
    assert_eq!(rig.log.of(EventKind::MicCalibrated), vec![GameEvent::MicCalibrated { threshold }]);
}

#[test]
fn test_connect_failure_is_reported() {
    let bus = EventBus::new();
    let mut audio = AudioAnalysis::new(
        bus,
        Box::new(FakeMicrophone::denied()),
        Box::new(MemoryStore::default()),
        manual_clock(),
    );

    let result = audio.connect_microphone();
    assert!(matches!(result, Err(AudioError::PermissionOrDevice(_))));
    assert!(!audio.is_connected());
}

#[test]
fn test_connect_is_idempotent() {
    let buffer = SampleBuffer::new();
    let microphone = FakeMicrophone::new(buffer);
    let opens = microphone.opens();
    let mut audio = AudioAnalysis::new(
        EventBus::new(),
        Box::new(microphone),
        Box::new(MemoryStore::default()),
        manual_clock(),
    );

    audio.connect_microphone().unwrap();
    audio.connect_microphone().unwrap();
    assert_eq!(*opens.borrow(), 1);
}

#[test]
fn test_calibrate_without_runtime_fails() {
    let mut rig = rig(MemoryStore::default());
    let result = rig.audio.calibrate(3.0);
    assert!(matches!(result, Err(AudioError::Backend(_))));
    assert!(!rig.audio.is_calibrating());
    assert!(rig.audio.is_connected(), "calibration connects first");
}

#[tokio::test(start_paused = true)]
async fn test_calibration_samples_in_background() {
    let mut queue = TaskQueue::new(tokio::runtime::Handle::current());
    let mut rig = rig(MemoryStore::default());
    rig.audio = AudioAnalysis::new(
        rig.bus.clone(),
        Box::new(FakeMicrophone::new(rig.buffer.clone())),
        Box::new(rig.store.clone()),
        rig.clock.clone(),
    )
    .with_spawner(queue.spawner());

    rig.buffer.fill(0.05);
    rig.audio.calibrate(0.12).unwrap();
    assert!(rig.audio.is_calibrating());

    // A second request while sampling is ignored.
    rig.audio.calibrate(0.12).unwrap();

    let samples = match queue.recv().await {
        Some(TaskResult::CalibrationSampled { samples }) => samples,
        other => panic!("unexpected task result {other:?}"),
    };
    assert_eq!(samples.len(), 3);
    assert!(samples.iter().all(|s| approx_eq(*s, 0.05)));
    assert!(queue.drain().is_empty());

    let threshold = rig.audio.finish_calibration(&samples);
    assert!(approx_eq(threshold, 0.08));
    assert!(!rig.audio.is_calibrating());
}
