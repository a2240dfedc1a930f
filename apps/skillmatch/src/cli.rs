use std::path::PathBuf;

use clap::Parser;

use crate::config::BackendKind;

/// Compares a resume against a set of required skills using an LLM and prints a JSON verdict.
///
/// Only the JSON verdict is written to stdout; logs go to stderr and the optional log file.
#[derive(Debug, Parser)]
#[command(name = "skillmatch", version)]
pub struct Cli {
    /// Resume file (.txt or .pdf)
    pub resume: PathBuf,

    /// Required skills: path to a JSON file, or inline JSON text
    pub skills: String,

    /// LLM backend to query [env: LLM_BACKEND]
    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,

    /// Model name [env: LLM_MODEL]
    #[arg(long)]
    pub model: Option<String>,

    /// Base URL of the backend API [env: LLM_BASE_URL]
    #[arg(long)]
    pub base_url: Option<String>,

    /// Request timeout in seconds [env: LLM_TIMEOUT_SECS]
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Maximum resume characters sent to the model [env: CV_MAX_CHARS]
    #[arg(long)]
    pub max_chars: Option<usize>,

    /// Also ask the model for strengths and weaknesses
    #[arg(long)]
    pub insights: bool,

    /// Append logs to this file in addition to stderr [env: SKILLMATCH_LOG_FILE]
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
