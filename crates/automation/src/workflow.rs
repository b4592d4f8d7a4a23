//! The prescription entry state machine.
//!
//! ```text
//! Idle -> Connecting -> FetchingDrugs -> EnteringDrugs -> Submitting
//!      -> AwaitingSignature -> Completing -> Completed
//! ```
//!
//! Every non-terminal phase has one success edge to the next phase and
//! one failure edge to `Failed` or `Aborted`. Two failures are downgraded
//! to warnings because the local automation has already happened by then:
//! the e-signature hand-off and the provider `complete` call.
//!
//! Keystrokes cannot be taken back. Once `EnteringDrugs` starts, every
//! report carries the number of drugs that were actually typed, and
//! every later phase checks the fail-safe before its side effect.

use std::fmt;

use chrono::{DateTime, Utc};
use rxentry_core::config::{AutomationConfig, SoftwareConfig, TimingConfig};
use rxentry_core::types::{CompletionSummary, DrugEntry};
use rxentry_provider::{ProviderError, SessionProvider};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::events::WorkflowEvent;
use crate::failsafe::{AbortSignal, FailSafe, UserAbort};
use crate::injector::{BackendError, InjectError, InputBackend, InputInjector};
use crate::signature::{HandoffError, SignatureHandoff};
use crate::timer::StepTimer;

/// Broadcast channel capacity for progress events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Patient description used when a run has to start its own session.
pub const DEFAULT_PATIENT_INFO: &str = "Automated prescription entry";

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Connecting,
    FetchingDrugs,
    EnteringDrugs,
    Submitting,
    AwaitingSignature,
    Completing,
    Completed,
    Aborted,
    Failed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::FetchingDrugs => "fetching_drugs",
            Self::EnteringDrugs => "entering_drugs",
            Self::Submitting => "submitting",
            Self::AwaitingSignature => "awaiting_signature",
            Self::Completing => "completing",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted | Self::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Errors and warnings
// ---------------------------------------------------------------------------

/// Why a run ended in `Failed`.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Provider has no drugs to enter")]
    NoDrugsFetched,

    #[error("{count} drugs exceed the per-session limit of {limit}")]
    TooManyDrugs { count: usize, limit: usize },

    #[error(transparent)]
    Input(#[from] BackendError),

    #[error(transparent)]
    Handoff(#[from] HandoffError),
}

impl WorkflowError {
    /// Expected, user-actionable conditions rather than faults.
    pub fn is_informational(&self) -> bool {
        matches!(
            self,
            Self::NoDrugsFetched | Self::Provider(ProviderError::NoDrugs)
        )
    }
}

/// Outcome of a single step: the operator aborted, or the step failed.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error(transparent)]
    Aborted(#[from] UserAbort),

    #[error(transparent)]
    Failed(#[from] WorkflowError),
}

impl From<InjectError> for StepError {
    fn from(e: InjectError) -> Self {
        match e {
            InjectError::UserAbort(abort) => Self::Aborted(abort),
            InjectError::Backend(backend) => Self::Failed(WorkflowError::Input(backend)),
        }
    }
}

impl From<ProviderError> for StepError {
    fn from(e: ProviderError) -> Self {
        Self::Failed(WorkflowError::Provider(e))
    }
}

impl From<HandoffError> for StepError {
    fn from(e: HandoffError) -> Self {
        Self::Failed(WorkflowError::Handoff(e))
    }
}

/// Drug entry stopped before the list was exhausted.
#[derive(Debug, thiserror::Error)]
#[error("Drug entry stopped after {entered} drug(s): {cause}")]
pub struct EntryInterrupted {
    /// Drugs fully entered (text typed and separator pressed).
    pub entered: usize,
    pub cause: StepError,
}

/// Non-fatal problems attached to a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum RunWarning {
    /// The e-signature page could not be opened.
    SignatureHandoff(String),
    /// The provider was not told the session is complete.
    Completion(String),
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SignatureHandoff(msg) => write!(f, "could not open e-signature page: {msg}"),
            Self::Completion(msg) => write!(f, "could not complete provider session: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What is known about the target application after a run.
///
/// Injection is open-loop: nothing confirms the prescription software
/// accepted the keystrokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verification {
    /// No keystrokes were sent.
    NotAttempted,
    /// Keystrokes were sent; acceptance is unknown.
    Unverified,
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed {
        warnings: Vec<RunWarning>,
        summary: Option<CompletionSummary>,
    },
    /// The fail-safe fired during `phase`.
    Aborted { phase: Phase },
    Failed { phase: Phase, error: WorkflowError },
}

/// Final account of one run.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub session_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub drugs_total: usize,
    pub drugs_entered: usize,
    /// True if any input event reached the backend during the run, even
    /// one belonging to a drug that was not fully entered.
    pub input_sent: bool,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn terminal_phase(&self) -> Phase {
        match self.outcome {
            RunOutcome::Completed { .. } => Phase::Completed,
            RunOutcome::Aborted { .. } => Phase::Aborted,
            RunOutcome::Failed { .. } => Phase::Failed,
        }
    }

    pub fn verification(&self) -> Verification {
        if self.input_sent || self.drugs_entered > 0 {
            Verification::Unverified
        } else {
            Verification::NotAttempted
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, RunOutcome::Completed { .. })
    }
}

/// Inputs for one full run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Used only if the provider has no active session.
    pub patient_info: String,
    /// E-signature URL; falls back to the configured default.
    pub esign_url: Option<String>,
}

impl Default for RunRequest {
    fn default() -> Self {
        Self {
            patient_info: DEFAULT_PATIENT_INFO.to_string(),
            esign_url: None,
        }
    }
}

/// Mutable state of the run in progress. Dropped when the report is built.
struct WorkflowRun {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    phase: Phase,
    patient_info: String,
    esign_url: Option<String>,
    session_id: Option<String>,
    drugs: Vec<DrugEntry>,
    drugs_entered: usize,
    /// Injector event count when the run started.
    events_at_start: usize,
    warnings: Vec<RunWarning>,
    summary: Option<CompletionSummary>,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Drives one provider and one input backend through the workflow.
///
/// Runs are strictly sequential: every network call, wait and keystroke
/// finishes before the next one starts.
pub struct WorkflowOrchestrator<P, B, H> {
    provider: P,
    injector: InputInjector<B>,
    handoff: H,
    timer: StepTimer,
    timing: TimingConfig,
    software: SoftwareConfig,
    max_drugs: usize,
    default_esign_url: Option<String>,
    /// Parent of every run's fail-safe token; cancelling it aborts the
    /// current run and any later one.
    shutdown: CancellationToken,
    events: broadcast::Sender<WorkflowEvent>,
}

impl<P, B, H> WorkflowOrchestrator<P, B, H>
where
    P: SessionProvider,
    B: InputBackend,
    H: SignatureHandoff,
{
    pub fn new(provider: P, backend: B, handoff: H, config: &AutomationConfig) -> Self {
        let shutdown = CancellationToken::new();
        let failsafe = FailSafe::new(shutdown.child_token(), config.safety.failsafe_enabled);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            provider,
            injector: InputInjector::new(backend, failsafe, config.safety.action_pause),
            handoff,
            timer: StepTimer::new(config.development.simulate_delays),
            timing: config.timing.clone(),
            software: config.software.clone(),
            max_drugs: config.safety.max_drugs_per_session,
            default_esign_url: config.signature.default_url.clone(),
            shutdown,
            events,
        }
    }

    pub fn with_timer(mut self, timer: StepTimer) -> Self {
        self.timer = timer;
        self
    }

    /// Subscribe to progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    /// Token that aborts the current run (and every later one) when
    /// cancelled, e.g. from a Ctrl-C handler.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn injector(&self) -> &InputInjector<B> {
        &self.injector
    }

    /// Give the fail-safe a fresh token. An abort ends a run for good;
    /// the next run or step starts clean.
    pub fn rearm(&mut self) {
        self.injector.rearm(self.shutdown.child_token());
    }

    // ---- full run ----

    /// Execute the whole workflow and report how it ended.
    pub async fn run(&mut self, request: RunRequest) -> RunReport {
        let run_id = Uuid::now_v7();
        let span = tracing::info_span!("workflow_run", %run_id);
        self.run_inner(run_id, request).instrument(span).await
    }

    async fn run_inner(&mut self, run_id: Uuid, request: RunRequest) -> RunReport {
        self.rearm();

        let mut run = WorkflowRun {
            run_id,
            started_at: Utc::now(),
            phase: Phase::Idle,
            patient_info: request.patient_info,
            esign_url: request.esign_url.or_else(|| self.default_esign_url.clone()),
            session_id: None,
            drugs: Vec::new(),
            drugs_entered: 0,
            events_at_start: self.injector.events_sent(),
            warnings: Vec::new(),
            summary: None,
        };

        self.transition(&mut run, Phase::Connecting);
        match self.connect(&run.patient_info).await {
            Ok(session_id) => run.session_id = Some(session_id),
            Err(e) => return self.stop(run, e.into()),
        }

        self.transition(&mut run, Phase::FetchingDrugs);
        match self.fetch_drugs().await {
            Ok(drugs) => run.drugs = drugs,
            Err(e) => return self.stop(run, e.into()),
        }

        self.transition(&mut run, Phase::EnteringDrugs);
        match self.enter_drugs(&run.drugs).await {
            Ok(entered) => run.drugs_entered = entered,
            Err(interrupted) => {
                run.drugs_entered = interrupted.entered;
                return self.stop(run, interrupted.cause);
            }
        }

        self.transition(&mut run, Phase::Submitting);
        if let Err(e) = self.submit().await {
            return self.stop(run, e);
        }

        self.transition(&mut run, Phase::AwaitingSignature);
        match self.open_signature(run.esign_url.as_deref()).await {
            Ok(()) => {}
            Err(StepError::Aborted(abort)) => return self.stop(run, abort.into()),
            Err(StepError::Failed(e)) => self.warn(&mut run, RunWarning::SignatureHandoff(e.to_string())),
        }

        self.transition(&mut run, Phase::Completing);
        if let Err(abort) = self.injector.check_abort() {
            return self.stop(run, abort.into());
        }
        match self.complete().await {
            Ok(summary) => run.summary = Some(summary),
            Err(e) => self.warn(&mut run, RunWarning::Completion(e.to_string())),
        }

        let outcome = RunOutcome::Completed {
            warnings: std::mem::take(&mut run.warnings),
            summary: run.summary.take(),
        };
        self.finish(run, outcome)
    }

    // ---- individual steps ----

    /// Make sure the provider has an active session, starting one with
    /// `patient_info` if needed. Returns the session id.
    pub async fn connect(&self, patient_info: &str) -> Result<String, WorkflowError> {
        if let Some(session) = self.provider.get_status().await? {
            if session.is_active() {
                tracing::info!(
                    session_id = %session.session_id,
                    drug_count = session.drug_count,
                    "Using active prescription session",
                );
                tracing::debug!(patient = %session.patient_info, "Session patient");
                self.emit(WorkflowEvent::SessionReady {
                    session_id: session.session_id.clone(),
                    started: false,
                });
                return Ok(session.session_id);
            }
        }

        tracing::info!("No active prescription session, starting one");
        let session_id = self.provider.start_session(patient_info).await?;
        self.emit(WorkflowEvent::SessionReady {
            session_id: session_id.clone(),
            started: true,
        });
        Ok(session_id)
    }

    /// Fetch the drug list, refusing empty lists and lists over the
    /// per-session safety limit.
    pub async fn fetch_drugs(&self) -> Result<Vec<DrugEntry>, WorkflowError> {
        let drugs = self.provider.get_pending_drugs().await?;
        tracing::info!(count = drugs.len(), "Fetched pending drugs");
        for (i, drug) in drugs.iter().enumerate() {
            tracing::debug!(index = i + 1, %drug, "Pending drug");
        }

        if drugs.is_empty() {
            return Err(WorkflowError::NoDrugsFetched);
        }
        if drugs.len() > self.max_drugs {
            return Err(WorkflowError::TooManyDrugs {
                count: drugs.len(),
                limit: self.max_drugs,
            });
        }

        self.emit(WorkflowEvent::DrugsFetched { count: drugs.len() });
        Ok(drugs)
    }

    /// Count down, then type each drug followed by the field separator.
    ///
    /// Returns the number of drugs entered. On interruption, the count of
    /// drugs already entered is carried in the error; they stay entered.
    pub async fn enter_drugs(&mut self, drugs: &[DrugEntry]) -> Result<usize, EntryInterrupted> {
        let total = drugs.len();
        tracing::info!(
            total,
            countdown_secs = self.timing.countdown_secs,
            "Focus the prescription application; drug entry starts after the countdown",
        );

        let events = self.events.clone();
        self.timer
            .countdown(self.timing.countdown_secs, &self.injector, |remaining| {
                tracing::info!(remaining_secs = remaining, "Drug entry countdown");
                let _ = events.send(WorkflowEvent::Countdown {
                    remaining_secs: remaining,
                });
            })
            .await
            .map_err(|abort| EntryInterrupted {
                entered: 0,
                cause: abort.into(),
            })?;

        let mut entered = 0;
        for drug in drugs {
            self.enter_one(drug)
                .await
                .map_err(|cause| EntryInterrupted { entered, cause })?;
            entered += 1;

            tracing::info!(index = entered, total, %drug, "Entered drug");
            self.emit(WorkflowEvent::DrugEntered {
                index: entered,
                total,
                drug: drug.to_string(),
            });

            self.timer
                .wait(self.timing.paste_delay, &self.injector)
                .await
                .map_err(|abort| EntryInterrupted {
                    entered,
                    cause: abort.into(),
                })?;
        }

        Ok(entered)
    }

    async fn enter_one(&mut self, drug: &DrugEntry) -> Result<(), StepError> {
        self.timer
            .wait(self.timing.field_focus_delay, &self.injector)
            .await?;
        self.injector.type_text(drug.as_str()).await?;
        self.injector.press_key(self.software.field_separator).await?;
        Ok(())
    }

    /// Ask the provider to send, then press the submit key.
    ///
    /// The submit key is only pressed once the provider has accepted the
    /// send request.
    pub async fn submit(&mut self) -> Result<(), StepError> {
        self.injector.check_abort()?;

        let ack = self.provider.request_send().await?;
        tracing::info!(
            message = ack.message.as_deref().unwrap_or_default(),
            "Provider accepted send request",
        );
        self.emit(WorkflowEvent::SendRequested);

        let key = self.software.submit_key;
        tracing::info!(
            %key,
            delay_ms = self.timing.submit_delay.as_millis() as u64,
            "Waiting before submit key",
        );
        self.timer
            .wait(self.timing.submit_delay, &self.injector)
            .await?;
        self.injector.press_key(key).await?;

        tracing::info!(%key, software = %self.software.name, "Submit key pressed");
        self.emit(WorkflowEvent::SubmitPressed {
            key: key.to_string(),
        });
        Ok(())
    }

    /// Open the e-signature page after the configured browser delay.
    pub async fn open_signature(&self, url: Option<&str>) -> Result<(), StepError> {
        self.injector.check_abort()?;
        self.timer
            .wait(self.timing.browser_delay, &self.injector)
            .await?;
        self.handoff.open(url).await?;

        tracing::info!("E-signature page opened; complete the signature manually");
        self.emit(WorkflowEvent::SignatureOpened {
            url: url.map(str::to_string),
        });
        Ok(())
    }

    /// Tell the provider the session is finished.
    pub async fn complete(&self) -> Result<CompletionSummary, ProviderError> {
        let summary = self.provider.complete_session().await?;
        tracing::info!(
            drug_count = summary.drug_count,
            duration_ms = summary.duration_ms,
            message = summary.message.as_deref().unwrap_or_default(),
            "Provider session completed",
        );
        Ok(summary)
    }

    // ---- private helpers ----

    fn emit(&self, event: WorkflowEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn transition(&self, run: &mut WorkflowRun, phase: Phase) {
        run.phase = phase;
        tracing::info!(%phase, "Phase started");
        self.emit(WorkflowEvent::PhaseStarted { phase });
    }

    fn warn(&self, run: &mut WorkflowRun, warning: RunWarning) {
        tracing::warn!(phase = %run.phase, warning = %warning, "Continuing despite warning");
        self.emit(WorkflowEvent::Warning {
            message: warning.to_string(),
        });
        run.warnings.push(warning);
    }

    fn stop(&self, run: WorkflowRun, cause: StepError) -> RunReport {
        let phase = run.phase;
        let outcome = match cause {
            StepError::Aborted(_) => RunOutcome::Aborted { phase },
            StepError::Failed(error) => RunOutcome::Failed { phase, error },
        };
        self.finish(run, outcome)
    }

    fn finish(&self, run: WorkflowRun, outcome: RunOutcome) -> RunReport {
        let drugs_entered = run.drugs_entered;

        match &outcome {
            RunOutcome::Completed { warnings, .. } => tracing::info!(
                drugs_entered,
                warnings = warnings.len(),
                "Workflow completed; entries were typed without confirmation from the target application",
            ),
            RunOutcome::Aborted { phase } => tracing::warn!(
                %phase,
                drugs_entered,
                "Workflow aborted by fail-safe; drugs already entered remain in the target application",
            ),
            RunOutcome::Failed { phase, error } if error.is_informational() => tracing::info!(
                %phase,
                drugs_entered,
                reason = %error,
                "Workflow stopped",
            ),
            RunOutcome::Failed { phase, error } => tracing::error!(
                %phase,
                drugs_entered,
                error = %error,
                "Workflow failed",
            ),
        }

        let report = RunReport {
            run_id: run.run_id,
            session_id: run.session_id,
            started_at: run.started_at,
            finished_at: Utc::now(),
            drugs_total: run.drugs.len(),
            drugs_entered,
            input_sent: self.injector.events_sent() > run.events_at_start,
            outcome,
        };

        self.emit(WorkflowEvent::Finished {
            phase: report.terminal_phase(),
            drugs_entered,
        });
        report
    }
}
