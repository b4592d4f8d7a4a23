//! Wiring between the user-facing actions and the orchestrator.

use rxentry_automation::backends::DryRunBackend;
use rxentry_automation::events::WorkflowEvent;
use rxentry_automation::injector::{BackendError, InputBackend};
use rxentry_automation::signature::SignatureHandoff;
use rxentry_automation::workflow::{
    EntryInterrupted, Phase, RunRequest, StepError, WorkflowError, WorkflowOrchestrator,
};
use rxentry_core::config::AutomationConfig;
use rxentry_core::error::CoreError;
use rxentry_provider::{ProviderError, SessionProvider};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::render;

/// Errors surfaced to the operator.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] CoreError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Step(#[from] StepError),

    #[error(transparent)]
    Entry(#[from] EntryInterrupted),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("No keyboard backend in this build; rebuild with --features desktop or pass --dry-run")]
    NoInputBackend,

    #[error("Workflow ended in phase '{0}'")]
    Incomplete(Phase),
}

/// Something the operator can ask for, from a subcommand or the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    TestConnection,
    ListDrugs,
    RunWorkflow,
    EnterDrugs,
    Submit,
    OpenSignature,
    Complete,
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Self::TestConnection => "Test connection to provider",
            Self::ListDrugs => "Get prescription drugs",
            Self::RunWorkflow => "Run complete workflow",
            Self::EnterDrugs => "Drug entry only",
            Self::Submit => "Send prescription (submit key)",
            Self::OpenSignature => "Open browser for e-signature",
            Self::Complete => "Complete provider session",
        }
    }
}

/// Choose the input backend for this process.
pub fn select_backend(config: &AutomationConfig) -> Result<Box<dyn InputBackend>, ClientError> {
    if config.development.dry_run {
        tracing::info!("Dry run: keystrokes are logged, not injected");
        return Ok(Box::new(DryRunBackend::new()));
    }
    desktop_backend()
}

#[cfg(feature = "desktop")]
fn desktop_backend() -> Result<Box<dyn InputBackend>, ClientError> {
    let backend = rxentry_automation::backends::DesktopBackend::new()?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "desktop"))]
fn desktop_backend() -> Result<Box<dyn InputBackend>, ClientError> {
    Err(ClientError::NoInputBackend)
}

/// An orchestrator plus the per-invocation request.
pub struct App<P, B, H> {
    orchestrator: WorkflowOrchestrator<P, B, H>,
    request: RunRequest,
}

impl<P, B, H> App<P, B, H>
where
    P: SessionProvider,
    B: InputBackend,
    H: SignatureHandoff,
{
    pub fn new(orchestrator: WorkflowOrchestrator<P, B, H>, request: RunRequest) -> Self {
        Self {
            orchestrator,
            request,
        }
    }

    pub fn orchestrator(&self) -> &WorkflowOrchestrator<P, B, H> {
        &self.orchestrator
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.orchestrator.subscribe()
    }

    /// Process-wide shutdown token, cancelled on Ctrl-C.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.orchestrator.shutdown_token()
    }

    pub async fn perform(&mut self, action: Action) -> Result<(), ClientError> {
        tracing::debug!(?action, "Performing action");

        match action {
            Action::TestConnection => {
                let status = self.orchestrator.provider().server_status().await?;
                render::print_lines(&render::server_status_lines(&status));
            }
            Action::ListDrugs => {
                let drugs = self.orchestrator.provider().get_pending_drugs().await?;
                render::print_lines(&render::drug_list_lines(&drugs));
            }
            Action::RunWorkflow => {
                let report = self.orchestrator.run(self.request.clone()).await;
                // Let the progress printer catch up before the summary.
                tokio::task::yield_now().await;
                render::print_lines(&render::report_lines(&report));
                if !report.is_completed() {
                    return Err(ClientError::Incomplete(report.terminal_phase()));
                }
            }
            Action::EnterDrugs => {
                self.orchestrator.rearm();
                let drugs = self.orchestrator.fetch_drugs().await?;
                let entered = self.orchestrator.enter_drugs(&drugs).await?;
                println!("Entered {entered} of {} drug(s)", drugs.len());
            }
            Action::Submit => {
                self.orchestrator.rearm();
                self.orchestrator.submit().await?;
                println!("Prescription sent");
            }
            Action::OpenSignature => {
                self.orchestrator.rearm();
                self.orchestrator
                    .open_signature(self.request.esign_url.as_deref())
                    .await?;
                println!("Complete the e-signature in your browser");
            }
            Action::Complete => {
                let summary = self.orchestrator.complete().await?;
                println!("{}", render::completion_line(&summary));
            }
        }
        Ok(())
    }
}
