/// Platform-agnostic input handling
use serde::{Deserialize, Serialize};

/// Platform-independent input events, delivered to the walkthrough by the host.
///
/// Key events carry the physical key code (`"KeyW"`, `"ArrowUp"`, `"Space"`),
/// so bindings follow key position rather than keyboard layout.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    // Keyboard events
    KeyDown(String),
    KeyUp(String),

    // Relative pointer motion
    MouseMove { dx: f32, dy: f32 },

    // Window events
    FocusLost,
    VisibilityChanged { visible: bool },
    PointerLockChanged { locked: bool },
    Resized { width: u32, height: u32 },
}

/// What a bound key does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Forward,
    Backward,
    Left,
    Right,
    Jump,
    Release,
}

/// Key mapping configuration; each action accepts several physical codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub forward: Vec<String>,
    pub backward: Vec<String>,
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub jump: Vec<String>,
    pub release: Vec<String>,
}

fn codes(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: codes(&["KeyW", "ArrowUp"]),
            backward: codes(&["KeyS", "ArrowDown"]),
            left: codes(&["KeyA", "ArrowLeft"]),
            right: codes(&["KeyD", "ArrowRight"]),
            jump: codes(&["Space"]),
            release: codes(&["Escape"]),
        }
    }
}

impl KeyBindings {
    /// Resolve a physical key code; unbound codes map to `None`.
    pub fn action_for(&self, code: &str) -> Option<Action> {
        let table = [
            (&self.forward, Action::Forward),
            (&self.backward, Action::Backward),
            (&self.left, Action::Left),
            (&self.right, Action::Right),
            (&self.jump, Action::Jump),
            (&self.release, Action::Release),
        ];
        table
            .into_iter()
            .find(|(list, _)| list.iter().any(|c| c == code))
            .map(|(_, action)| action)
    }
}

/// Held movement keys plus the jump state machine.
///
/// `can_jump` is the only state shared with the integrator: a jump request
/// clears it, landing on the floor sets it again.
#[derive(Debug, Clone)]
pub struct InputState {
    bindings: KeyBindings,
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    can_jump: bool,
    jump_requested: bool,
    jump_held: bool,
}

impl InputState {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            bindings,
            forward: false,
            backward: false,
            left: false,
            right: false,
            can_jump: false,
            jump_requested: false,
            jump_held: false,
        }
    }

    /// Handle a key press. Returns the bound action, `None` for unbound keys.
    pub fn on_key_down(&mut self, code: &str) -> Option<Action> {
        let action = self.bindings.action_for(code)?;
        self.press(action);
        Some(action)
    }

    pub fn on_key_up(&mut self, code: &str) -> Option<Action> {
        let action = self.bindings.action_for(code)?;
        self.release(action);
        Some(action)
    }

    pub fn press(&mut self, action: Action) {
        match action {
            Action::Forward => self.forward = true,
            Action::Backward => self.backward = true,
            Action::Left => self.left = true,
            Action::Right => self.right = true,
            Action::Jump => {
                // Key auto-repeat re-sends key-down while held
                if !self.jump_held && self.can_jump {
                    self.jump_requested = true;
                    self.can_jump = false;
                    tracing::debug!("jump requested");
                }
                self.jump_held = true;
            }
            Action::Release => {}
        }
    }

    pub fn release(&mut self, action: Action) {
        match action {
            Action::Forward => self.forward = false,
            Action::Backward => self.backward = false,
            Action::Left => self.left = false,
            Action::Right => self.right = false,
            Action::Jump => self.jump_held = false,
            Action::Release => {}
        }
    }

    /// Drop held keys and any pending jump, e.g. on focus loss.
    pub fn clear_keys(&mut self) {
        self.forward = false;
        self.backward = false;
        self.left = false;
        self.right = false;
        self.jump_held = false;
        self.jump_requested = false;
    }

    /// Unnormalized (side, forward) intent, each component in {-1, 0, 1}.
    pub fn raw_direction(&self) -> (f32, f32) {
        let side = f32::from(u8::from(self.right)) - f32::from(u8::from(self.left));
        let forward = f32::from(u8::from(self.forward)) - f32::from(u8::from(self.backward));
        (side, forward)
    }

    pub fn moving_longitudinal(&self) -> bool {
        self.forward || self.backward
    }

    pub fn moving_lateral(&self) -> bool {
        self.left || self.right
    }

    pub fn can_jump(&self) -> bool {
        self.can_jump
    }

    pub fn set_can_jump(&mut self, can_jump: bool) {
        self.can_jump = can_jump;
    }

    pub fn jump_pending(&self) -> bool {
        self.jump_requested
    }

    /// Consume the jump request, if any.
    pub fn take_jump_request(&mut self) -> bool {
        std::mem::take(&mut self.jump_requested)
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new(KeyBindings::default())
    }
}

pub mod wasm {
    use super::*;
    use web_sys::{KeyboardEvent, MouseEvent};

    pub fn keyboard_event_to_input(e: &KeyboardEvent, is_down: bool) -> InputEvent {
        let code = e.code();
        if is_down {
            InputEvent::KeyDown(code)
        } else {
            InputEvent::KeyUp(code)
        }
    }

    pub fn mouse_move_to_input(e: &MouseEvent) -> InputEvent {
        InputEvent::MouseMove {
            dx: e.movement_x() as f32,
            dy: e.movement_y() as f32,
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub mod native {
    use winit::keyboard::KeyCode;

    /// Web-style code string for a winit physical key.
    pub fn key_code_name(code: KeyCode) -> String {
        // winit names its variants after the UI Events `code` values
        format!("{code:?}")
    }
}
