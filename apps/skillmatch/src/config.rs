use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;

use crate::cli::Cli;

pub const DEFAULT_HOSTED_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_HOSTED_MODEL: &str = "llama3-70b-8192";
pub const DEFAULT_LOCAL_URL: &str = "http://localhost:11434";
pub const DEFAULT_LOCAL_MODEL: &str = "llama3.2";
pub const DEFAULT_MAX_CV_CHARS: usize = 15_000;
const MAX_TIMEOUT_SECS: u64 = 600;

/// Which kind of LLM server answers the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// OpenAI-compatible hosted chat-completions API (Groq by default)
    Hosted,
    /// Ollama-style local inference server
    Local,
}

impl BackendKind {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hosted" => Ok(BackendKind::Hosted),
            "local" => Ok(BackendKind::Local),
            other => bail!("LLM_BACKEND must be 'hosted' or 'local', got '{other}'"),
        }
    }

    fn default_base_url(self) -> &'static str {
        match self {
            BackendKind::Hosted => DEFAULT_HOSTED_URL,
            BackendKind::Local => DEFAULT_LOCAL_URL,
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            BackendKind::Hosted => DEFAULT_HOSTED_MODEL,
            BackendKind::Local => DEFAULT_LOCAL_MODEL,
        }
    }

    /// Local models on CPU are slow; give them more room.
    fn default_timeout_secs(self) -> u64 {
        match self {
            BackendKind::Hosted => 120,
            BackendKind::Local => 180,
        }
    }
}

/// Run configuration: environment (and `.env`) first, command-line flags on top.
/// The API key is never defaulted; the hosted backend refuses to start without one.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendKind,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_cv_chars: usize,
    pub insights: bool,
    pub log_file: Option<PathBuf>,
    pub rust_log: String,
}

impl Config {
    pub fn load(cli: &Cli) -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::resolve(cli, |key| std::env::var(key).ok())
    }

    /// Merges flags over values produced by `lookup`. Split out so tests need not touch the
    /// process environment.
    pub fn resolve(cli: &Cli, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = match cli.backend {
            Some(kind) => kind,
            None => env("LLM_BACKEND")
                .map(|v| BackendKind::parse(&v))
                .transpose()?
                .unwrap_or(BackendKind::Hosted),
        };

        let base_url = cli
            .base_url
            .clone()
            .or_else(|| env("LLM_BASE_URL"))
            .unwrap_or_else(|| backend.default_base_url().to_string());

        let model = cli
            .model
            .clone()
            .or_else(|| env("LLM_MODEL"))
            .unwrap_or_else(|| backend.default_model().to_string());

        let timeout_secs = match cli.timeout_secs {
            Some(secs) => secs,
            None => env("LLM_TIMEOUT_SECS")
                .map(|v| {
                    v.trim()
                        .parse::<u64>()
                        .context("LLM_TIMEOUT_SECS must be a whole number of seconds")
                })
                .transpose()?
                .unwrap_or_else(|| backend.default_timeout_secs()),
        };
        if !(1..=MAX_TIMEOUT_SECS).contains(&timeout_secs) {
            bail!("Timeout must be between 1 and {MAX_TIMEOUT_SECS} seconds, got {timeout_secs}");
        }

        let max_cv_chars = match cli.max_chars {
            Some(n) => n,
            None => env("CV_MAX_CHARS")
                .map(|v| {
                    v.trim()
                        .parse::<usize>()
                        .context("CV_MAX_CHARS must be a positive integer")
                })
                .transpose()?
                .unwrap_or(DEFAULT_MAX_CV_CHARS),
        };
        if max_cv_chars == 0 {
            bail!("Maximum resume characters must be at least 1");
        }

        Ok(Config {
            backend,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key: env("GROQ_API_KEY").map(|k| k.trim().to_string()),
            timeout: Duration::from_secs(timeout_secs),
            max_cv_chars,
            insights: cli.insights,
            log_file: cli
                .log_file
                .clone()
                .or_else(|| env("SKILLMATCH_LOG_FILE").map(PathBuf::from)),
            rust_log: env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}
