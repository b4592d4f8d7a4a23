//! Plain-text output for the terminal.
//!
//! Everything is built as lines first so it can be asserted on without
//! capturing stdout.

use rxentry_automation::events::WorkflowEvent;
use rxentry_automation::workflow::{RunOutcome, RunReport, Verification};
use rxentry_core::types::{CompletionSummary, DrugEntry, ServerStatus};
use tokio::sync::broadcast;

pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

/// Print progress events until the orchestrator goes away.
pub async fn follow_events(mut rx: broadcast::Receiver<WorkflowEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                if let Some(line) = event_line(&event) {
                    println!("{line}");
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Progress output fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// One line per event worth showing; phase changes are left to the logs.
pub fn event_line(event: &WorkflowEvent) -> Option<String> {
    let line = match event {
        WorkflowEvent::PhaseStarted { .. } => return None,
        WorkflowEvent::SessionReady { session_id, started } => {
            if *started {
                format!("Started prescription session {session_id}")
            } else {
                format!("Using prescription session {session_id}")
            }
        }
        WorkflowEvent::DrugsFetched { count } => format!("{count} drug(s) to enter"),
        WorkflowEvent::Countdown { remaining_secs } => {
            format!("Starting in {remaining_secs}... (move the mouse to the top-left corner to abort)")
        }
        WorkflowEvent::DrugEntered { index, total, drug } => {
            format!("  [{index}/{total}] {drug}")
        }
        WorkflowEvent::SendRequested => "Send requested".to_string(),
        WorkflowEvent::SubmitPressed { key } => format!("Pressed {key}"),
        WorkflowEvent::SignatureOpened { url } => {
            format!("Opened {}", url.as_deref().unwrap_or("a blank browser page"))
        }
        WorkflowEvent::Warning { message } => format!("Warning: {message}"),
        WorkflowEvent::Finished { .. } => return None,
    };
    Some(line)
}

pub fn report_lines(report: &RunReport) -> Vec<String> {
    let mut lines = Vec::new();

    match &report.outcome {
        RunOutcome::Completed { warnings, summary } => {
            lines.push(format!(
                "Workflow completed: {} of {} drug(s) entered",
                report.drugs_entered, report.drugs_total
            ));
            if let Some(summary) = summary {
                lines.push(completion_line(summary));
            }
            lines.extend(warnings.iter().map(|w| format!("Warning: {w}")));
        }
        RunOutcome::Aborted { phase } => {
            lines.push(format!(
                "Workflow aborted during {phase}: {} of {} drug(s) entered",
                report.drugs_entered, report.drugs_total
            ));
        }
        RunOutcome::Failed { phase, error } => {
            lines.push(format!("Workflow stopped during {phase}: {error}"));
            if report.drugs_entered > 0 {
                lines.push(format!(
                    "{} of {} drug(s) were entered before stopping",
                    report.drugs_entered, report.drugs_total
                ));
            }
        }
    }

    if report.verification() == Verification::Unverified {
        lines.push(
            "Entries were typed but not verified; check the prescription software".to_string(),
        );
    }
    lines
}

pub fn server_status_lines(status: &ServerStatus) -> Vec<String> {
    let mut lines = vec![format!(
        "Provider {} on port {}",
        status.server, status.port
    )];
    match &status.session {
        Some(session) => lines.push(format!(
            "Session {} for {} ({} drug(s), {:?})",
            session.session_id, session.patient_info, session.drug_count, session.status
        )),
        None => lines.push("No active session".to_string()),
    }
    lines
}

pub fn drug_list_lines(drugs: &[DrugEntry]) -> Vec<String> {
    if drugs.is_empty() {
        return vec!["No drugs pending".to_string()];
    }
    let mut lines = vec![format!("{} drug(s) pending:", drugs.len())];
    lines.extend(
        drugs
            .iter()
            .enumerate()
            .map(|(i, drug)| format!("  {}. {drug}", i + 1)),
    );
    lines
}

pub fn completion_line(summary: &CompletionSummary) -> String {
    format!(
        "Session completed: {} drug(s) in {:.1}s",
        summary.drug_count,
        summary.duration_ms as f64 / 1000.0
    )
}
