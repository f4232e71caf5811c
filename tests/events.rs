use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use shutup::events::{EventBus, EventKind, GameEvent, GameOverReason};
use speculoos::prelude::*;

#[test]
fn test_handlers_run_in_registration_order() {
    let bus = EventBus::new();
    let order = Rc::new(RefCell::new(Vec::new()));

    for label in ["first", "second", "third"] {
        let order = Rc::clone(&order);
        bus.on(EventKind::TimerChanged, move |_| order.borrow_mut().push(label));
    }

    bus.emit(GameEvent::TimerChanged { time_left_seconds: 10.0 });
    assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
}

#[test]
fn test_handlers_only_see_their_kind() {
    let bus = EventBus::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    bus.on(EventKind::GameOver, move |event| sink.borrow_mut().push(event.clone()));

    bus.emit(GameEvent::MicLevel { rms: 0.2 });
    bus.emit(GameEvent::GameOver {
        reason: GameOverReason::Noise,
    });

    assert_eq!(
        *seen.borrow(),
        vec![GameEvent::GameOver {
            reason: GameOverReason::Noise
        }]
    );
}

#[test]
fn test_emit_without_subscribers_is_a_no_op() {
    let bus = EventBus::new();
    bus.emit(GameEvent::GameWin { time_spent_seconds: 3 });
    assert_that(&bus.subscriber_count(EventKind::GameWin)).is_equal_to(0);
}

#[test]
fn test_unsubscribe_removes_handler() {
    let bus = EventBus::new();
    let calls = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&calls);
    let subscription = bus.on(EventKind::MicLevel, move |_| *counter.borrow_mut() += 1);

    bus.emit(GameEvent::MicLevel { rms: 0.1 });
    subscription.unsubscribe();
    bus.emit(GameEvent::MicLevel { rms: 0.1 });

    assert_eq!(*calls.borrow(), 1);
    assert_eq!(bus.subscriber_count(EventKind::MicLevel), 0);
}

#[test]
fn test_unsubscribe_during_emit_keeps_current_delivery() {
    let bus = EventBus::new();
    let calls = Rc::new(RefCell::new(Vec::new()));
    let pending: Rc<RefCell<Option<shutup::events::Subscription>>> = Rc::default();

    let log = Rc::clone(&calls);
    let slot = Rc::clone(&pending);
    bus.on(EventKind::ScareTriggered, move |_| {
        log.borrow_mut().push("remover");
        if let Some(subscription) = slot.borrow_mut().take() {
            subscription.unsubscribe();
        }
    });

    let log = Rc::clone(&calls);
    let second = bus.on(EventKind::ScareTriggered, move |_| log.borrow_mut().push("removed"));
    *pending.borrow_mut() = Some(second);

    let scare = GameEvent::ScareTriggered {
        id: "screamer_1".to_string(),
        intensity: 0.4,
    };
    bus.emit(scare.clone());
    bus.emit(scare);

    // The snapshot taken for the first emission still delivers to the removed handler.
    assert_eq!(*calls.borrow(), vec!["remover", "removed", "remover"]);
}

#[test]
fn test_nested_emit_runs_immediately() {
    let bus = EventBus::new();
    let order = Rc::new(RefCell::new(Vec::new()));

    let inner_bus = bus.clone();
    let log = Rc::clone(&order);
    bus.on(EventKind::NoiseDetected, move |_| {
        log.borrow_mut().push("noise:start");
        inner_bus.emit(GameEvent::GameOver {
            reason: GameOverReason::Noise,
        });
        log.borrow_mut().push("noise:end");
    });

    let log = Rc::clone(&order);
    bus.on(EventKind::GameOver, move |_| log.borrow_mut().push("game_over"));

    bus.emit(GameEvent::NoiseDetected { rms: 0.5, threshold: 0.1 });
    assert_eq!(*order.borrow(), vec!["noise:start", "game_over", "noise:end"]);
}

#[test]
fn test_kind_names() {
    assert_eq!(EventKind::MicLevel.to_string(), "MIC_LEVEL");
    assert_eq!(EventKind::GameWin.as_ref(), "GAME_WIN");
    assert_eq!(GameOverReason::Noise.to_string(), "noise");
    assert_eq!(
        GameEvent::PlayerMovement {
            is_moving: true,
            speed: 1.0
        }
        .kind(),
        EventKind::PlayerMovement
    );
}
