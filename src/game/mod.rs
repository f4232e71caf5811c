//! The orchestrator: owns every system, runs the frame loop, and routes input.
//!
//! Systems never call each other. They publish on the shared [`EventBus`], and the few
//! cross-cutting reactions live here as bus handlers: the panic boost after a scare, and
//! the end-of-run transitions. End-of-run events are queued and applied after the emitting
//! system returns, still within the same frame.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info, trace, warn};

use crate::audio::ambient::AmbientBed;
use crate::audio::loader::{NoDecoder, SoundBank, SoundDecoder};
use crate::audio::microphone::NoMicrophone;
use crate::audio::screamer::ScreamerPlayer;
use crate::audio::{AudioAnalysis, AudioSink, MicrophoneBackend, MixerHandle};
use crate::clock::{Clock, MonotonicClock};
use crate::config::Config;
use crate::constants::{
    AMBIENT_GAME_OVER_LEVEL, AMBIENT_PLAY_LEVEL, AMBIENT_PRE_PLAY_LEVEL, AMBIENT_WIN_LEVEL, MAX_FRAME_DELTA,
    PANIC_DURATION, PANIC_INTENSITY_FACTOR, PANIC_MAX_TIGHTENING,
};
use crate::error::GameError;
use crate::events::{EventBus, EventKind, GameEvent, Subscription};
use crate::input::GameCommand;
use crate::storage::{KeyValueStore, MemoryStore};
use crate::systems::{Flashlight, MovementTracker, ScareScheduler, Timer};
use crate::tasks::{TaskQueue, TaskResult};

use self::state::{FlowState, GameSystems, ScareRng, StateContext, StateManager};
use self::ui::{ButtonWiring, OverlayMode, UiAction, UiController};
use self::world::World;

pub mod state;
pub mod ui;
pub mod world;

/// Threshold multiplier applied for a short while after a scare of `intensity`.
pub fn panic_multiplier(intensity: f32) -> f32 {
    1.0 - PANIC_MAX_TIGHTENING.min(intensity * PANIC_INTENSITY_FACTOR)
}

/// End-of-run event waiting to be applied by the frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlowSignal {
    GameOver,
    Win,
}

/// Everything the game needs from the outside world.
pub struct GameDeps {
    pub bus: EventBus,
    pub clock: Rc<dyn Clock>,
    pub microphone: Box<dyn MicrophoneBackend>,
    pub store: Box<dyn KeyValueStore>,
    pub sink: Rc<dyn AudioSink>,
    pub decoder: Arc<dyn SoundDecoder>,
    /// Runtime for calibration and sound loading. Without one, calibration is unavailable
    /// and every scare uses the synthesized stinger.
    pub tasks: Option<TaskQueue>,
    pub rng: ScareRng,
}

impl GameDeps {
    /// No devices, in-memory storage, and a silent mixer. Picks up the current tokio runtime
    /// if there is one.
    pub fn headless(seed: u64) -> Self {
        Self {
            bus: EventBus::new(),
            clock: Rc::new(MonotonicClock::default()),
            microphone: Box::new(NoMicrophone),
            store: Box::new(MemoryStore::default()),
            sink: Rc::new(MixerHandle::new(crate::constants::DEFAULT_SAMPLE_RATE)),
            decoder: Arc::new(NoDecoder),
            tasks: TaskQueue::current(),
            rng: Box::new(SmallRng::seed_from_u64(seed)),
        }
    }
}

pub struct Game<W: World, U: UiController> {
    bus: EventBus,
    clock: Rc<dyn Clock>,
    systems: GameSystems,
    world: W,
    ui: U,
    ambient: AmbientBed,
    states: StateManager,
    tasks: Option<TaskQueue>,
    actions: UnboundedReceiver<UiAction>,
    signals: Rc<RefCell<VecDeque<FlowSignal>>>,
    subscriptions: Vec<Subscription>,
    paused: bool,
    run_started_at: Option<Duration>,
    calibration_seconds: f32,
}

impl<W: World, U: UiController> Game<W, U> {
    pub fn new(config: &Config, mut world: W, mut ui: U, deps: GameDeps) -> Self {
        let GameDeps {
            bus,
            clock,
            microphone,
            store,
            sink,
            decoder,
            tasks,
            mut rng,
        } = deps;

        let sound_seed = rng.next_u64();
        let spawner = tasks.as_ref().map(TaskQueue::spawner);

        let mut audio = AudioAnalysis::new(bus.clone(), microphone, store, Rc::clone(&clock));
        if let Some(spawner) = &spawner {
            audio = audio.with_spawner(spawner.clone());
        }

        let bank = SoundBank::new(config.asset_dir.clone(), decoder, spawner);
        let screamer = ScreamerPlayer::new(bank, Rc::clone(&sink), sound_seed);

        let mut systems = GameSystems {
            audio,
            timer: Timer::new(bus.clone(), config.timer_seconds),
            movement: MovementTracker::new(bus.clone(), config.movement_threshold),
            scares: ScareScheduler::new(bus.clone(), Rc::clone(&clock), rng, Box::new(screamer)),
            flashlight: Flashlight::new(bus.clone()),
        };
        let ambient = AmbientBed::new(sink, sound_seed.rotate_left(17));

        let signals = Rc::new(RefCell::new(VecDeque::new()));
        let subscriptions = Self::subscribe(&bus, &systems, &signals);

        let (sender, actions) = mpsc::unbounded_channel();
        ui.wire_buttons(ButtonWiring::new(sender));

        let states = StateManager::new(
            FlowState::Menu,
            &mut StateContext {
                systems: &mut systems,
                world: &mut world,
                ui: &mut ui,
            },
        );

        Self {
            bus,
            clock,
            systems,
            world,
            ui,
            ambient,
            states,
            tasks,
            actions,
            signals,
            subscriptions,
            paused: false,
            run_started_at: None,
            calibration_seconds: config.calibration_seconds,
        }
    }

    fn subscribe(
        bus: &EventBus,
        systems: &GameSystems,
        signals: &Rc<RefCell<VecDeque<FlowSignal>>>,
    ) -> Vec<Subscription> {
        let boost = systems.audio.threshold_boost();
        let panic = bus.on(EventKind::ScareTriggered, move |event| {
            if let GameEvent::ScareTriggered { intensity, .. } = event {
                boost.apply(panic_multiplier(*intensity), PANIC_DURATION);
            }
        });

        let queue = Rc::clone(signals);
        let game_over = bus.on(EventKind::GameOver, move |_| {
            queue.borrow_mut().push_back(FlowSignal::GameOver);
        });

        let queue = Rc::clone(signals);
        let win = bus.on(EventKind::GameWin, move |_| {
            queue.borrow_mut().push_back(FlowSignal::Win);
        });

        vec![panic, game_over, win]
    }

    /// Advances one frame of `dt` seconds (clamped to 50 ms).
    pub fn frame(&mut self, dt: f32) {
        let dt = dt.clamp(0.0, MAX_FRAME_DELTA);

        self.drain_actions();
        if self.paused {
            return;
        }
        self.drain_tasks();

        if self.state() == FlowState::Play && self.world.player_position().z >= self.world.goal_distance() {
            let time_spent_seconds = self.time_spent_seconds();
            self.bus.emit(GameEvent::GameWin { time_spent_seconds });
        }
        self.apply_signals();

        self.states.update(
            dt,
            &mut StateContext {
                systems: &mut self.systems,
                world: &mut self.world,
                ui: &mut self.ui,
            },
        );
        self.apply_signals();
    }

    /// Handles a keyboard command.
    pub fn handle_command(&mut self, command: GameCommand) {
        let playing = self.state() == FlowState::Play;
        match command {
            GameCommand::ToggleFlashlight if playing => {
                self.systems.flashlight.toggle();
            }
            GameCommand::TogglePause if playing => self.set_paused(!self.paused),
            GameCommand::Pause if playing && !self.paused => self.set_paused(true),
            GameCommand::Rewind => self.rewind(),
            _ => trace!(%command, state = %self.state(), "Command ignored"),
        }
    }

    /// Handles a menu button press. Start is refused until the microphone is connected and a
    /// threshold is known.
    pub fn handle_action(&mut self, action: UiAction) {
        debug!(%action, "UI action");
        match action {
            UiAction::ConnectMic => {
                self.ambient.start();
                self.ambient.set_level(AMBIENT_PRE_PLAY_LEVEL);
                if let Err(error) = self.systems.audio.connect_microphone() {
                    self.ui.report_error(&GameError::from(error));
                }
            }
            UiAction::Calibrate => {
                if let Err(error) = self.systems.audio.calibrate(self.calibration_seconds) {
                    warn!(%error, "Calibration could not start");
                    self.ui.report_error(&GameError::from(error));
                }
            }
            UiAction::Start => {
                if self.state() != FlowState::Menu {
                    debug!(state = %self.state(), "Start ignored outside the menu");
                    return;
                }
                let connected = self.systems.audio.is_connected();
                let calibrated = self.systems.audio.threshold().is_some();
                if !connected || !calibrated {
                    warn!(connected, calibrated, "Start refused");
                    self.ui.report_error(&GameError::InvalidState(
                        "connect and calibrate the microphone before starting".to_string(),
                    ));
                    return;
                }
                self.ambient.start();
                self.ambient.set_level(AMBIENT_PLAY_LEVEL);
                self.paused = false;
                self.run_started_at = Some(self.clock.now());
                self.transition(FlowState::Play);
            }
            UiAction::Resume => self.set_paused(false),
            UiAction::Restart => self.rewind(),
        }
    }

    /// Rewinds in place during a run, or starts a fresh run after one ended. Ignored in the menu.
    pub fn rewind(&mut self) {
        match self.state() {
            FlowState::Play => {
                info!("Rewinding tape");
                self.systems.rewind(&mut self.world);
            }
            FlowState::GameOver | FlowState::Win => {
                self.paused = false;
                self.run_started_at = Some(self.clock.now());
                self.transition(FlowState::Play);
            }
            FlowState::Menu => trace!("Rewind ignored in menu"),
        }
    }

    fn set_paused(&mut self, paused: bool) {
        if paused == self.paused {
            return;
        }
        self.paused = paused;
        info!(paused, "Pause toggled");
        self.ui
            .set_overlay_mode(if paused { OverlayMode::Pause } else { OverlayMode::Hidden });
    }

    fn transition(&mut self, next: FlowState) {
        self.states.transition(
            next,
            &mut StateContext {
                systems: &mut self.systems,
                world: &mut self.world,
                ui: &mut self.ui,
            },
        );
    }

    fn drain_actions(&mut self) {
        while let Ok(action) = self.actions.try_recv() {
            self.handle_action(action);
        }
    }

    fn drain_tasks(&mut self) {
        let Some(tasks) = &mut self.tasks else {
            return;
        };
        for result in tasks.drain() {
            match result {
                TaskResult::CalibrationSampled { samples } => {
                    self.systems.audio.finish_calibration(&samples);
                }
                TaskResult::SoundLoaded { id, clip } => self.systems.scares.sound_loaded(id, clip),
            }
        }
    }

    fn apply_signals(&mut self) {
        loop {
            let Some(signal) = self.signals.borrow_mut().pop_front() else {
                break;
            };
            if self.state() != FlowState::Play {
                trace!(?signal, state = %self.state(), "Flow signal ignored");
                continue;
            }
            match signal {
                FlowSignal::GameOver => {
                    self.ambient.set_level(AMBIENT_GAME_OVER_LEVEL);
                    self.transition(FlowState::GameOver);
                }
                FlowSignal::Win => {
                    self.ambient.set_level(AMBIENT_WIN_LEVEL);
                    self.transition(FlowState::Win);
                }
            }
        }
    }

    /// Whole seconds since the run started, rounded.
    fn time_spent_seconds(&self) -> u64 {
        match self.run_started_at {
            Some(started) => self.clock.now().saturating_sub(started).as_secs_f32().round() as u64,
            None => 0,
        }
    }

    pub fn state(&self) -> FlowState {
        self.states.current()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn systems(&self) -> &GameSystems {
        &self.systems
    }

    pub fn systems_mut(&mut self) -> &mut GameSystems {
        &mut self.systems
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut U {
        &mut self.ui
    }

    pub fn ambient(&self) -> &AmbientBed {
        &self.ambient
    }

    pub fn run_started_at(&self) -> Option<Duration> {
        self.run_started_at
    }
}

impl<W: World, U: UiController> Drop for Game<W, U> {
    fn drop(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe();
        }
    }
}
