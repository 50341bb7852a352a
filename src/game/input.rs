//! Input sampling: key state to debounced intent

use std::collections::HashSet;

use crate::ws::protocol::InputIntent;

/// Two key codes bound to each direction
pub const LEFT_KEYS: [&str; 2] = ["ArrowLeft", "KeyA"];
pub const RIGHT_KEYS: [&str; 2] = ["ArrowRight", "KeyD"];
pub const UP_KEYS: [&str; 2] = ["ArrowUp", "KeyW"];
pub const DOWN_KEYS: [&str; 2] = ["ArrowDown", "KeyS"];
pub const SHOOT_KEY: &str = "Space";

/// Key code has a binding
pub fn is_bound(code: &str) -> bool {
    code == SHOOT_KEY
        || [LEFT_KEYS, RIGHT_KEYS, UP_KEYS, DOWN_KEYS]
            .iter()
            .flatten()
            .any(|key| *key == code)
}

/// Set of currently held key codes
#[derive(Debug, Clone, Default)]
pub struct KeyState {
    pressed: HashSet<String>,
}

impl KeyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, code: &str) {
        self.pressed.insert(code.to_string());
    }

    pub fn release(&mut self, code: &str) {
        self.pressed.remove(code);
    }

    pub fn clear(&mut self) {
        self.pressed.clear();
    }

    pub fn is_pressed(&self, code: &str) -> bool {
        self.pressed.contains(code)
    }

    fn any(&self, codes: &[&str]) -> bool {
        codes.iter().any(|c| self.is_pressed(c))
    }

    /// Current intent from held keys
    pub fn intent(&self) -> InputIntent {
        InputIntent {
            left: self.any(&LEFT_KEYS),
            right: self.any(&RIGHT_KEYS),
            up: self.any(&UP_KEYS),
            down: self.any(&DOWN_KEYS),
            shoot: self.is_pressed(SHOOT_KEY),
        }
    }
}

/// Emits intent only when it changes
#[derive(Debug, Clone, Default)]
pub struct InputSampler {
    last_sent: Option<InputIntent>,
}

impl InputSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the intent to send, or `None` if nothing changed since the
    /// last emission. The first sample after a reset always emits.
    pub fn sample(&mut self, keys: &KeyState) -> Option<InputIntent> {
        let intent = keys.intent();
        if self.last_sent == Some(intent) {
            return None;
        }
        self.last_sent = Some(intent);
        Some(intent)
    }

    /// Last intent handed to the transport
    pub fn last_sent(&self) -> InputIntent {
        self.last_sent.unwrap_or_default()
    }

    pub fn reset(&mut self) {
        self.last_sent = None;
    }
}
