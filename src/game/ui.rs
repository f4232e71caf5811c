//! The boundary to whatever presents the game: overlay modes, menu buttons, and the HUD
//! model fed from the event bus.

use std::cell::RefCell;
use std::rc::Rc;

use strum_macros::{AsRefStr, Display};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::error::GameError;
use crate::events::{EventBus, EventKind, GameEvent, GameOverReason, Subscription};

/// What the overlay shows on top of the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum OverlayMode {
    Menu,
    /// No overlay, only the HUD.
    Hidden,
    Pause,
    GameOver,
    Win,
}

/// A menu button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum UiAction {
    ConnectMic,
    Calibrate,
    Start,
    Resume,
    Restart,
}

/// Handed to the UI at startup; every button press goes through it.
#[derive(Debug, Clone)]
pub struct ButtonWiring {
    sender: UnboundedSender<UiAction>,
}

impl ButtonWiring {
    pub fn new(sender: UnboundedSender<UiAction>) -> Self {
        Self { sender }
    }

    pub fn press(&self, action: UiAction) {
        if self.sender.send(action).is_err() {
            warn!(%action, "Button pressed after the game shut down");
        }
    }
}

pub trait UiController {
    /// Called on every flow transition, and on pause/resume.
    fn set_overlay_mode(&mut self, mode: OverlayMode);

    /// Called once at startup.
    fn wire_buttons(&mut self, wiring: ButtonWiring);

    /// A button's operation failed. Presenting it is up to the UI.
    fn report_error(&mut self, error: &GameError) {
        let _ = error;
    }
}

/// Renders seconds as `MM:SS`. Negative input shows as zero.
pub fn format_timestamp(seconds: f32) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Everything the HUD displays, as last reported on the bus.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HudState {
    pub mic_level: f32,
    pub threshold: Option<f32>,
    pub time_left_seconds: Option<f32>,
    pub battery_percent: Option<f32>,
    pub flashlight_on: bool,
    pub last_scare: Option<String>,
    pub game_over_reason: Option<GameOverReason>,
}

/// Bus subscriber that keeps a [`HudState`] current.
pub struct Hud {
    state: Rc<RefCell<HudState>>,
    subscriptions: Vec<Subscription>,
}

impl Hud {
    pub fn attach(bus: &EventBus) -> Self {
        let state = Rc::new(RefCell::new(HudState::default()));
        let kinds = [
            EventKind::MicLevel,
            EventKind::MicCalibrated,
            EventKind::TimerChanged,
            EventKind::BatteryChanged,
            EventKind::FlashlightChanged,
            EventKind::ScareTriggered,
            EventKind::GameOver,
        ];

        let subscriptions = kinds
            .into_iter()
            .map(|kind| {
                let state = Rc::clone(&state);
                bus.on(kind, move |event| Self::apply(&mut state.borrow_mut(), event))
            })
            .collect();

        Self { state, subscriptions }
    }

    fn apply(state: &mut HudState, event: &GameEvent) {
        match event {
            GameEvent::MicLevel { rms } => state.mic_level = *rms,
            GameEvent::MicCalibrated { threshold } => state.threshold = Some(*threshold),
            GameEvent::TimerChanged { time_left_seconds } => state.time_left_seconds = Some(*time_left_seconds),
            GameEvent::BatteryChanged { percent } => state.battery_percent = Some(percent.clamp(0.0, 100.0)),
            GameEvent::FlashlightChanged { is_on } => state.flashlight_on = *is_on,
            GameEvent::ScareTriggered { id, .. } => state.last_scare = Some(id.clone()),
            GameEvent::GameOver { reason } => state.game_over_reason = Some(*reason),
            _ => {}
        }
    }

    pub fn state(&self) -> HudState {
        self.state.borrow().clone()
    }

    /// Mic level as a fraction of the threshold, clamped to [0, 1]. Zero until calibrated.
    pub fn mic_meter(&self) -> f32 {
        let state = self.state.borrow();
        match state.threshold {
            Some(threshold) if threshold > 0.0 => (state.mic_level / threshold).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    /// One-line summary, used as the window title.
    pub fn status_line(&self) -> String {
        let state = self.state.borrow();
        let tape = state
            .time_left_seconds
            .map(format_timestamp)
            .unwrap_or_else(|| "--:--".to_string());
        let battery = state.battery_percent.map(|p| p.round() as u32).unwrap_or(100);
        let light = if state.flashlight_on { "ON" } else { "OFF" };
        drop(state);
        format!(
            "SHUT UP! | REC {tape} | MIC {:>3}% | LIGHT {light} {battery}%",
            (self.mic_meter() * 100.0).round() as u32
        )
    }

    /// Stops listening to the bus.
    pub fn detach(self) {
        for subscription in self.subscriptions {
            subscription.unsubscribe();
        }
    }
}

/// [`UiController`] for the desktop build: the overlay is reported through logs and the
/// HUD through the window title. Keyboard shortcuts stand in for the menu buttons.
pub struct LogOverlay {
    hud: Hud,
    mode: OverlayMode,
    wiring: Option<ButtonWiring>,
}

impl LogOverlay {
    pub fn new(hud: Hud) -> Self {
        Self {
            hud,
            mode: OverlayMode::Menu,
            wiring: None,
        }
    }

    pub fn hud(&self) -> &Hud {
        &self.hud
    }

    pub fn mode(&self) -> OverlayMode {
        self.mode
    }

    /// The action behind the overlay's main button in the current mode.
    pub fn primary_action(&self) -> Option<UiAction> {
        match self.mode {
            OverlayMode::Menu => Some(UiAction::Start),
            OverlayMode::Pause => Some(UiAction::Resume),
            OverlayMode::GameOver | OverlayMode::Win => Some(UiAction::Restart),
            OverlayMode::Hidden => None,
        }
    }

    pub fn press(&self, action: UiAction) {
        match &self.wiring {
            Some(wiring) => wiring.press(action),
            None => debug!(%action, "Buttons not wired yet"),
        }
    }

    fn headline(&self) -> &'static str {
        match self.mode {
            OverlayMode::Menu => "Stay silent. Connect the mic (M), calibrate (C), then press Enter.",
            OverlayMode::Hidden => "",
            OverlayMode::Pause => "Paused. Press P or Enter to continue.",
            OverlayMode::GameOver => match self.hud.state().game_over_reason {
                Some(GameOverReason::Noise) => "Noise detected. Signal lost. Press R to rewind.",
                _ => "Tape ended. Press R to rewind and try again.",
            },
            OverlayMode::Win => "Recording complete. Press R to go again.",
        }
    }
}

impl UiController for LogOverlay {
    fn set_overlay_mode(&mut self, mode: OverlayMode) {
        self.mode = mode;
        if mode == OverlayMode::Hidden {
            debug!("Overlay hidden");
        } else {
            info!(%mode, "{}", self.headline());
        }
    }

    fn wire_buttons(&mut self, wiring: ButtonWiring) {
        self.wiring = Some(wiring);
    }

    fn report_error(&mut self, error: &GameError) {
        warn!(%error, "Action failed");
    }
}
