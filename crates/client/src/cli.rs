//! Command-line arguments.

use clap::{Parser, Subcommand};
use rxentry_automation::workflow::DEFAULT_PATIENT_INFO;
use rxentry_core::config::{AutomationConfig, TimingConfig, TimingPreset, DEFAULT_PROVIDER_PORT};

use crate::app::Action;

#[derive(Debug, Parser)]
#[command(name = "rxentry")]
#[command(about = "Enter scanned prescription drugs into local prescription software")]
#[command(version)]
pub struct Cli {
    /// Provider host name, IP address or base URL
    #[arg(env = "PROVIDER_HOST")]
    pub host: String,

    /// Provider port (ignored when HOST is a full URL)
    #[arg(long, env = "PROVIDER_PORT", default_value_t = DEFAULT_PROVIDER_PORT)]
    pub port: u16,

    /// E-signature portal opened after submitting
    #[arg(long)]
    pub esign_url: Option<String>,

    /// Patient description used if a new provider session must be started
    #[arg(long, default_value = DEFAULT_PATIENT_INFO)]
    pub patient: String,

    /// Timing preset: default, fast, slow or debug
    #[arg(long)]
    pub preset: Option<TimingPreset>,

    /// Log keystrokes instead of injecting them
    #[arg(long)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Check that the provider is reachable
    Status,
    /// List the drugs waiting on the provider
    Drugs,
    /// Run the complete workflow
    Run,
    /// Enter the pending drugs only
    Enter,
    /// Request send and press the submit key
    Submit,
    /// Open the e-signature page
    Sign,
    /// Mark the provider session complete
    Complete,
}

impl Command {
    pub fn action(self) -> Action {
        match self {
            Self::Status => Action::TestConnection,
            Self::Drugs => Action::ListDrugs,
            Self::Run => Action::RunWorkflow,
            Self::Enter => Action::EnterDrugs,
            Self::Submit => Action::Submit,
            Self::Sign => Action::OpenSignature,
            Self::Complete => Action::Complete,
        }
    }
}

impl Cli {
    /// Apply command-line overrides on top of the environment config.
    pub fn apply(&self, config: &mut AutomationConfig) {
        if let Some(preset) = self.preset {
            config.timing = TimingConfig {
                countdown_secs: config.timing.countdown_secs,
                ..preset.timing()
            };
        }
        if self.dry_run {
            config.development.dry_run = true;
        }
        if let Some(url) = &self.esign_url {
            config.signature.default_url = Some(url.clone());
        }
    }
}
