mod analysis;
mod cli;
mod config;
mod errors;
mod llm_client;
mod resume;

use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::error::ErrorKind;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::models::AnalysisOutcome;
use crate::analysis::pipeline;
use crate::cli::Cli;
use crate::config::Config;
use crate::errors::AnalysisError;

/// Written verbatim if the real outcome cannot be serialized.
const FALLBACK_ERROR_JSON: &str = r#"{
  "status": "error",
  "code": "SERIALIZATION_FAILURE",
  "message": "Failed to serialize final result to JSON."
}"#;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            init_logging("info", None);
            let rendered = e.to_string();
            let message = rendered.trim().trim_start_matches("error: ");
            let usage = AnalysisError::Usage(message.to_string());
            return emit(&AnalysisOutcome::Error(usage.into()));
        }
    };

    // Load configuration before logging so the log file and level are known
    let config = Config::load(&cli);
    match &config {
        Ok(config) => init_logging(&config.rust_log, config.log_file.as_deref()),
        Err(_) => init_logging("info", None),
    }

    info!("Starting skillmatch v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "CV path: '{}', skills: '{}'",
        cli.resume.display(),
        cli.skills
    );

    let result = match config {
        Ok(config) => pipeline::run(&cli.resume, &cli.skills, &config).await,
        Err(e) => Err(AnalysisError::from(e)),
    };

    let outcome = AnalysisOutcome::from(result);
    info!(
        "Analysis finished with status {}",
        if outcome.is_success() { "success" } else { "error" }
    );
    emit(&outcome)
}

/// Prints the outcome as the only thing on stdout and maps it to the exit code.
fn emit(outcome: &AnalysisOutcome) -> ExitCode {
    match outcome.to_json() {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!("FATAL: failed to serialize final result: {e}");
            println!("{FALLBACK_ERROR_JSON}");
            return ExitCode::FAILURE;
        }
    }

    if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Structured logging to stderr, plus an append-only log file when one is configured.
/// Nothing here ever writes to stdout.
fn init_logging(rust_log: &str, log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), rust_log))
    });

    let mut file_error = None;
    let file_layer = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            ),
            Err(e) => {
                file_error = Some(format!("{}: {e}", path.display()));
                None
            }
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    if let Some(err) = file_error {
        warn!("Could not open log file, logging to stderr only: {err}");
    }
}
