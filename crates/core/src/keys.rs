//! Symbolic key names understood by the input injector.
//!
//! The prescription software is driven with a small vocabulary: a field
//! separator (`enter` or `tab`) and a submit key (`f4`, `ctrl+s`, ...).
//! Names are parsed case-insensitively from configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A single key (or modifier chord) the injector can press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum KeyName {
    Enter,
    Tab,
    Escape,
    /// Function key `F1` through `F12`.
    Function(u8),
    /// `ctrl+<char>` chord, lowercase ASCII.
    Ctrl(char),
}

impl FromStr for KeyName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "enter" | "return" => return Ok(Self::Enter),
            "tab" => return Ok(Self::Tab),
            "esc" | "escape" => return Ok(Self::Escape),
            _ => {}
        }

        if let Some(rest) = normalized.strip_prefix("ctrl+") {
            let mut chars = rest.chars();
            return match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphanumeric() => Ok(Self::Ctrl(c)),
                _ => Err(CoreError::Validation(format!(
                    "Invalid key chord '{s}'. Expected ctrl+<letter or digit>"
                ))),
            };
        }

        if let Some(n) = normalized.strip_prefix('f') {
            if let Ok(n) = n.parse::<u8>() {
                if (1..=12).contains(&n) {
                    return Ok(Self::Function(n));
                }
            }
        }

        Err(CoreError::Validation(format!(
            "Unknown key '{s}'. Must be one of: enter, tab, escape, f1-f12, ctrl+<key>"
        )))
    }
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enter => f.write_str("enter"),
            Self::Tab => f.write_str("tab"),
            Self::Escape => f.write_str("escape"),
            Self::Function(n) => write!(f, "f{n}"),
            Self::Ctrl(c) => write!(f, "ctrl+{c}"),
        }
    }
}

impl TryFrom<String> for KeyName {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeyName> for String {
    fn from(key: KeyName) -> Self {
        key.to_string()
    }
}
