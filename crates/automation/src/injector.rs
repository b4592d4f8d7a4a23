//! Keystroke injection with a fail-safe check before every event.
//!
//! [`InputBackend`] is the raw capability (the OS keyboard, or a dry-run
//! journal). [`InputInjector`] wraps it, refuses to inject once the
//! fail-safe has fired, and pauses briefly after each event so the target
//! application can keep up.

use std::time::Duration;

use rxentry_core::keys::KeyName;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::failsafe::{AbortSignal, FailSafe, UserAbort};

/// One injected input event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum InputEvent {
    Text(String),
    Key(KeyName),
}

/// Failure reported by an input backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Input backend failure: {0}")]
pub struct BackendError(pub String);

/// Errors from [`InputInjector`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InjectError {
    #[error(transparent)]
    UserAbort(#[from] UserAbort),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Raw keyboard/pointer capability.
pub trait InputBackend {
    /// Type `text` into whatever currently holds keyboard focus.
    fn type_text(&mut self, text: &str) -> Result<(), BackendError>;

    /// Press and release a single key or chord.
    fn press_key(&mut self, key: KeyName) -> Result<(), BackendError>;

    /// Current pointer position, or `None` if the backend cannot tell.
    fn pointer_position(&self) -> Option<(i32, i32)>;
}

impl<B: InputBackend + ?Sized> InputBackend for Box<B> {
    fn type_text(&mut self, text: &str) -> Result<(), BackendError> {
        (**self).type_text(text)
    }

    fn press_key(&mut self, key: KeyName) -> Result<(), BackendError> {
        (**self).press_key(key)
    }

    fn pointer_position(&self) -> Option<(i32, i32)> {
        (**self).pointer_position()
    }
}

/// Fail-safe guarded wrapper around an [`InputBackend`].
pub struct InputInjector<B> {
    backend: B,
    failsafe: FailSafe,
    action_pause: Duration,
    sent: usize,
}

impl<B: InputBackend> InputInjector<B> {
    /// * `action_pause` - sleep after every injected event.
    pub fn new(backend: B, failsafe: FailSafe, action_pause: Duration) -> Self {
        Self {
            backend,
            failsafe,
            action_pause,
            sent: 0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn failsafe(&self) -> &FailSafe {
        &self.failsafe
    }

    /// Events delivered to the backend over the injector's lifetime.
    pub fn events_sent(&self) -> usize {
        self.sent
    }

    /// Replace the fail-safe token, keeping the gesture setting. Used when
    /// a new run starts.
    pub fn rearm(&mut self, token: CancellationToken) {
        self.failsafe = FailSafe::new(token, self.failsafe.gesture_enabled());
    }

    pub async fn type_text(&mut self, text: &str) -> Result<(), InjectError> {
        self.check_abort()?;
        self.backend.type_text(text)?;
        self.sent += 1;
        tracing::debug!(chars = text.chars().count(), "Typed text");
        self.pause().await;
        Ok(())
    }

    pub async fn press_key(&mut self, key: KeyName) -> Result<(), InjectError> {
        self.check_abort()?;
        self.backend.press_key(key)?;
        self.sent += 1;
        tracing::debug!(%key, "Pressed key");
        self.pause().await;
        Ok(())
    }

    async fn pause(&self) {
        if !self.action_pause.is_zero() {
            tokio::time::sleep(self.action_pause).await;
        }
    }
}

impl<B: InputBackend> AbortSignal for InputInjector<B> {
    fn check_abort(&self) -> Result<(), UserAbort> {
        self.failsafe.inspect(self.backend.pointer_position())
    }

    fn cancellation(&self) -> &CancellationToken {
        self.failsafe.token()
    }
}
