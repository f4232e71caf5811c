//! Keyboard commands and their default bindings.

use strum_macros::Display;

use crate::game::ui::UiAction;

/// An in-game command. Each is honored only in the states where it makes sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum GameCommand {
    /// Play only.
    ToggleFlashlight,
    /// Play only.
    TogglePause,
    /// Play only, and only when not already paused.
    Pause,
    /// In place during a run; a fresh run from the end screens; ignored in the menu.
    Rewind,
}

/// Everything a key press can mean to the desktop loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Command(GameCommand),
    Button(UiAction),
    /// Whatever the overlay's main button does in its current mode.
    PrimaryButton,
    MuteAudio,
    Exit,
}

#[cfg(feature = "sdl")]
pub use self::bindings::{walk_vector, Bindings};

#[cfg(feature = "sdl")]
mod bindings {
    use std::collections::HashMap;

    use glam::Vec2;
    use sdl2::keyboard::{KeyboardState, Keycode, Scancode};

    use super::{GameCommand, InputAction};
    use crate::game::ui::UiAction;

    #[derive(Debug, Clone)]
    pub struct Bindings {
        key_bindings: HashMap<Keycode, InputAction>,
    }

    impl Default for Bindings {
        fn default() -> Self {
            let mut key_bindings = HashMap::new();

            // Game actions
            key_bindings.insert(Keycode::F, InputAction::Command(GameCommand::ToggleFlashlight));
            key_bindings.insert(Keycode::P, InputAction::Command(GameCommand::TogglePause));
            key_bindings.insert(Keycode::Escape, InputAction::Command(GameCommand::Pause));
            key_bindings.insert(Keycode::R, InputAction::Command(GameCommand::Rewind));

            // Menu buttons
            key_bindings.insert(Keycode::M, InputAction::Button(UiAction::ConnectMic));
            key_bindings.insert(Keycode::C, InputAction::Button(UiAction::Calibrate));
            key_bindings.insert(Keycode::Return, InputAction::PrimaryButton);

            key_bindings.insert(Keycode::N, InputAction::MuteAudio);
            key_bindings.insert(Keycode::Q, InputAction::Exit);

            Self { key_bindings }
        }
    }

    impl Bindings {
        pub fn get(&self, key: Keycode) -> Option<InputAction> {
            self.key_bindings.get(&key).copied()
        }
    }

    /// Held movement keys as a strafe/forward vector. WASD and the arrow keys both work.
    pub fn walk_vector(keyboard: &KeyboardState) -> Vec2 {
        let held = |a: Scancode, b: Scancode| keyboard.is_scancode_pressed(a) || keyboard.is_scancode_pressed(b);
        let mut input = Vec2::ZERO;
        if held(Scancode::W, Scancode::Up) {
            input.y += 1.0;
        }
        if held(Scancode::S, Scancode::Down) {
            input.y -= 1.0;
        }
        if held(Scancode::D, Scancode::Right) {
            input.x += 1.0;
        }
        if held(Scancode::A, Scancode::Left) {
            input.x -= 1.0;
        }
        input
    }
}
