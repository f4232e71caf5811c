//! The high-level flow of a session: menu, a run, and the two ways a run ends.

use rand::RngCore;
use strum_macros::{AsRefStr, Display};
use tracing::{debug, info};

use crate::audio::AudioAnalysis;
use crate::game::ui::{OverlayMode, UiController};
use crate::game::world::World;
use crate::systems::{Flashlight, MovementTracker, ScareScheduler, Timer};

/// Random source driving scare placement and rolls.
pub type ScareRng = Box<dyn RngCore>;

/// The gameplay systems advanced by the play state.
pub struct GameSystems {
    pub audio: AudioAnalysis,
    pub timer: Timer,
    pub movement: MovementTracker,
    pub scares: ScareScheduler<ScareRng>,
    pub flashlight: Flashlight,
}

impl GameSystems {
    /// Puts the player back at spawn and every system at its fresh-run values.
    pub fn rewind(&mut self, world: &mut dyn World) {
        world.reset_to_spawn();
        self.timer.reset();
        self.movement.reset(world.player_position());
        self.scares.reset();
        self.flashlight.reset();
        self.audio.threshold_boost().clear();
    }

    /// One play tick. Movement must be current before the timer decides whether to tick, and
    /// scares run before the timer so a scare's panic boost applies this frame.
    fn tick(&mut self, dt: f32, world: &dyn World) {
        let position = world.player_position();
        self.audio.update();
        self.movement.update(dt, position);
        self.scares.update(position);
        self.flashlight.update(dt);
        self.timer.update(dt, self.movement.is_moving());
    }
}

/// What a state's hooks operate on.
pub struct StateContext<'a> {
    pub systems: &'a mut GameSystems,
    pub world: &'a mut dyn World,
    pub ui: &'a mut dyn UiController,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum FlowState {
    Menu,
    Play,
    GameOver,
    Win,
}

impl FlowState {
    pub fn overlay(self) -> OverlayMode {
        match self {
            FlowState::Menu => OverlayMode::Menu,
            FlowState::Play => OverlayMode::Hidden,
            FlowState::GameOver => OverlayMode::GameOver,
            FlowState::Win => OverlayMode::Win,
        }
    }

    fn enter(self, previous: Option<FlowState>, ctx: &mut StateContext<'_>) {
        debug!(state = %self, ?previous, "Entering state");
        match self {
            FlowState::Play => {
                ctx.systems.audio.set_in_game(true);
                ctx.systems.rewind(ctx.world);
            }
            FlowState::Menu | FlowState::GameOver | FlowState::Win => {
                ctx.systems.audio.set_in_game(false);
            }
        }
        ctx.ui.set_overlay_mode(self.overlay());
    }

    fn exit(self, next: FlowState, ctx: &mut StateContext<'_>) {
        debug!(state = %self, %next, "Leaving state");
        if self == FlowState::Play {
            ctx.systems.audio.set_in_game(false);
        }
    }

    fn update(self, dt: f32, ctx: &mut StateContext<'_>) {
        match self {
            FlowState::Play => ctx.systems.tick(dt, ctx.world),
            // Keeps the mic meter alive behind the overlay.
            FlowState::Menu | FlowState::GameOver | FlowState::Win => ctx.systems.audio.update(),
        }
    }
}

/// Holds the active [`FlowState`] and runs the hooks on every change.
#[derive(Debug)]
pub struct StateManager {
    current: FlowState,
}

impl StateManager {
    /// Starts in `initial`, running its `enter` hook.
    pub fn new(initial: FlowState, ctx: &mut StateContext<'_>) -> Self {
        initial.enter(None, ctx);
        Self { current: initial }
    }

    pub fn current(&self) -> FlowState {
        self.current
    }

    /// Runs `exit` on the current state, then `enter` on `next`. Both always run, even when
    /// `next` is the current state.
    pub fn transition(&mut self, next: FlowState, ctx: &mut StateContext<'_>) {
        let previous = self.current;
        info!(from = %previous, to = %next, "State transition");
        previous.exit(next, ctx);
        self.current = next;
        next.enter(Some(previous), ctx);
    }

    pub fn update(&mut self, dt: f32, ctx: &mut StateContext<'_>) {
        self.current.update(dt, ctx);
    }
}
