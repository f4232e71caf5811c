use pretty_assertions::assert_eq;
use shutup::events::{EventBus, EventKind, GameEvent, GameOverReason};
use shutup::systems::Timer;

mod common;
use common::EventLog;

fn timer(seconds: u32) -> (Timer, EventLog) {
    let bus = EventBus::new();
    let log = EventLog::attach(&bus);
    (Timer::new(bus, seconds), log)
}

#[test]
fn test_reset_announces_full_tape() {
    let (mut timer, log) = timer(1080);
    timer.reset();
    assert_eq!(
        log.all(),
        vec![GameEvent::TimerChanged {
            time_left_seconds: 1080.0
        }]
    );
}

#[test]
fn test_only_ticks_while_moving() {
    let (mut timer, log) = timer(10);
    timer.update(1.0, false);
    assert_eq!(timer.time_left(), 10.0);
    assert!(log.all().is_empty());

    timer.update(0.25, true);
    assert_eq!(timer.time_left(), 9.75);
    assert_eq!(timer.elapsed(), 0.25);
}

#[test]
fn test_emits_once_per_whole_second() {
    let (mut timer, log) = timer(3);
    for _ in 0..8 {
        timer.update(0.25, true);
    }

    // 3.0 -> 1.0 crosses two whole-second boundaries.
    assert_eq!(
        log.of(EventKind::TimerChanged),
        vec![
            GameEvent::TimerChanged { time_left_seconds: 3.0 },
            GameEvent::TimerChanged { time_left_seconds: 2.0 },
        ]
    );
}

#[test]
fn test_reaching_zero_ends_run_once() {
    let (mut timer, log) = timer(1);
    timer.update(0.75, true);
    timer.update(0.75, true);
    timer.update(0.75, true);

    assert_eq!(timer.time_left(), 0.0);
    assert!(timer.is_ended());
    assert_eq!(
        log.of(EventKind::GameOver),
        vec![GameEvent::GameOver {
            reason: GameOverReason::Other
        }]
    );
    // 0.25 -> 0.0 stays within the same whole second.
    assert_eq!(
        log.of(EventKind::TimerChanged),
        vec![GameEvent::TimerChanged { time_left_seconds: 1.0 }]
    );
}

#[test]
fn test_reset_revives_ended_timer() {
    let (mut timer, log) = timer(1);
    timer.update(2.0, true);
    assert!(timer.is_ended());

    timer.reset();
    assert!(!timer.is_ended());
    assert_eq!(timer.time_left(), 1.0);

    timer.update(1.0, true);
    assert_eq!(log.count(EventKind::GameOver), 2);
}
