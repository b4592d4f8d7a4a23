use rxentry_core::keys::KeyName;

use crate::injector::{BackendError, InputBackend, InputEvent};

/// Backend that records events and logs them instead of injecting.
///
/// Reports no pointer position, so only the cancellation token can abort
/// a dry run.
#[derive(Debug, Default)]
pub struct DryRunBackend {
    journal: Vec<InputEvent>,
}

impl DryRunBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event "injected" so far, in order.
    pub fn journal(&self) -> &[InputEvent] {
        &self.journal
    }
}

impl InputBackend for DryRunBackend {
    fn type_text(&mut self, text: &str) -> Result<(), BackendError> {
        tracing::info!(text, "[dry run] type");
        self.journal.push(InputEvent::Text(text.to_string()));
        Ok(())
    }

    fn press_key(&mut self, key: KeyName) -> Result<(), BackendError> {
        tracing::info!(%key, "[dry run] press");
        self.journal.push(InputEvent::Key(key));
        Ok(())
    }

    fn pointer_position(&self) -> Option<(i32, i32)> {
        None
    }
}
