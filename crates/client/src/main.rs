//! `rxentry` -- types a provider's scanned drug list into the local
//! prescription software, submits it and opens the e-signature page.
//!
//! # Environment variables
//!
//! | Variable        | Required | Default | Description                          |
//! |-----------------|----------|---------|--------------------------------------|
//! | `PROVIDER_HOST` | no       | --      | Provider host, if not given as an argument |
//! | `PROVIDER_PORT` | no       | `8080`  | Provider port                        |
//! | `RUST_LOG`      | no       | `info`  | Log filter                           |
//!
//! Timing, key and safety settings are read by
//! [`AutomationConfig::from_env`].

use std::process::ExitCode;

use clap::Parser;
use rxentry_automation::signature::BrowserLauncher;
use rxentry_automation::workflow::{RunRequest, WorkflowOrchestrator};
use rxentry_client::app::{self, App, ClientError};
use rxentry_client::cli::Cli;
use rxentry_client::{menu, render};
use rxentry_core::config::{provider_base_url, AutomationConfig};
use rxentry_provider::RemoteSessionClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "rxentry_client=info,rxentry_automation=info,rxentry_provider=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Everything is sequential; one thread is all the workflow uses.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(cli));
    // A stdin read may still be parked on a blocking thread after Ctrl-C.
    runtime.shutdown_background();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "rxentry failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), ClientError> {
    let mut config = AutomationConfig::from_env()?;
    cli.apply(&mut config);

    let base_url = provider_base_url(&cli.host, cli.port);
    tracing::info!(
        provider = %base_url,
        software = %config.software.name,
        dry_run = config.development.dry_run,
        failsafe = config.safety.failsafe_enabled,
        "Starting rxentry",
    );

    let provider = RemoteSessionClient::new(base_url, &config.network)?;
    let backend = app::select_backend(&config)?;
    let launcher = BrowserLauncher::new(config.signature.browser_path.clone());
    let orchestrator = WorkflowOrchestrator::new(provider, backend, launcher, &config);

    let shutdown = orchestrator.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Ctrl-C received, stopping automation");
            shutdown.cancel();
        }
    });

    let request = RunRequest {
        patient_info: cli.patient.clone(),
        esign_url: config.signature.default_url.clone(),
    };
    let mut app = App::new(orchestrator, request);
    tokio::spawn(render::follow_events(app.subscribe()));

    match cli.command {
        Some(command) => app.perform(command.action()).await,
        None => {
            if let Err(e) = menu::run(&mut app).await {
                tracing::error!(error = %e, "Menu input failed");
            }
            Ok(())
        }
    }
}
