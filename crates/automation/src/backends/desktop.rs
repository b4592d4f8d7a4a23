//! OS keyboard and pointer access through [`enigo`].

use enigo::{Direction, Enigo, Key, Keyboard, Mouse, Settings};
use rxentry_core::keys::KeyName;

use crate::injector::{BackendError, InputBackend};

/// Injects real keystrokes into the focused application.
pub struct DesktopBackend {
    enigo: Enigo,
}

impl DesktopBackend {
    pub fn new() -> Result<Self, BackendError> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| BackendError(format!("failed to open input connection: {e}")))?;
        tracing::info!("Desktop input backend ready");
        Ok(Self { enigo })
    }

    fn click(&mut self, key: Key) -> Result<(), BackendError> {
        self.enigo
            .key(key, Direction::Click)
            .map_err(|e| BackendError(e.to_string()))
    }
}

impl InputBackend for DesktopBackend {
    fn type_text(&mut self, text: &str) -> Result<(), BackendError> {
        self.enigo
            .text(text)
            .map_err(|e| BackendError(e.to_string()))
    }

    fn press_key(&mut self, key: KeyName) -> Result<(), BackendError> {
        match key {
            KeyName::Ctrl(c) => {
                self.enigo
                    .key(Key::Control, Direction::Press)
                    .map_err(|e| BackendError(e.to_string()))?;
                let clicked = self.click(Key::Unicode(c));
                // Always release the modifier, even if the click failed.
                self.enigo
                    .key(Key::Control, Direction::Release)
                    .map_err(|e| BackendError(e.to_string()))?;
                clicked
            }
            other => self.click(map_key(other)?),
        }
    }

    fn pointer_position(&self) -> Option<(i32, i32)> {
        self.enigo.location().ok()
    }
}

fn map_key(key: KeyName) -> Result<Key, BackendError> {
    let mapped = match key {
        KeyName::Enter => Key::Return,
        KeyName::Tab => Key::Tab,
        KeyName::Escape => Key::Escape,
        KeyName::Function(1) => Key::F1,
        KeyName::Function(2) => Key::F2,
        KeyName::Function(3) => Key::F3,
        KeyName::Function(4) => Key::F4,
        KeyName::Function(5) => Key::F5,
        KeyName::Function(6) => Key::F6,
        KeyName::Function(7) => Key::F7,
        KeyName::Function(8) => Key::F8,
        KeyName::Function(9) => Key::F9,
        KeyName::Function(10) => Key::F10,
        KeyName::Function(11) => Key::F11,
        KeyName::Function(12) => Key::F12,
        other => return Err(BackendError(format!("key '{other}' is not supported"))),
    };
    Ok(mapped)
}
