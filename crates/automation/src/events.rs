//! Progress events emitted by the orchestrator.
//!
//! Broadcast over a [`tokio::sync::broadcast`] channel; the CLI renders
//! them, tests assert on them. Sending never blocks and a run does not
//! care whether anyone is listening.

use serde::Serialize;

use crate::workflow::Phase;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// The run moved into a new phase.
    PhaseStarted { phase: Phase },

    /// A provider session is available; `started` is true when this run
    /// created it.
    SessionReady { session_id: String, started: bool },

    DrugsFetched { count: usize },

    /// Seconds left before drug entry begins.
    Countdown { remaining_secs: u32 },

    /// Drug `index` (1-based) of `total` has been typed and its field
    /// separator pressed.
    DrugEntered {
        index: usize,
        total: usize,
        drug: String,
    },

    SendRequested,

    SubmitPressed { key: String },

    SignatureOpened { url: Option<String> },

    /// A non-fatal problem; the run continues.
    Warning { message: String },

    /// The run reached a terminal phase.
    Finished { phase: Phase, drugs_entered: usize },
}
