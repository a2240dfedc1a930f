//! Analysis pipeline — one resume against one skill set, one model call.
//!
//! Flow: check inputs → load skills → extract resume text → build prompt →
//!       LLM call → sanitize reply → `AnalysisResult`.
//!
//! Input problems are reported before any backend is built, so a bad file never costs a
//! network round trip and never needs an API key.

use std::path::Path;

use tracing::{info, warn};

use crate::analysis::models::AnalysisResult;
use crate::analysis::prompts::{
    BASE_OUTPUT_KEYS, INSIGHT_INSTRUCTIONS, INSIGHT_OUTPUT_KEYS, SKILL_ANALYSIS_PROMPT_TEMPLATE,
};
use crate::analysis::sanitizer::sanitize;
use crate::config::Config;
use crate::errors::AnalysisError;
use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, TRUNCATION_NOTE};
use crate::llm_client::{build_backend, CompletionBackend};
use crate::resume::extract::{check_resume_path, extract_resume_text};
use crate::resume::skills::RequiredSkills;

/// Everything the model call needs, already validated.
#[derive(Debug, Clone)]
pub struct AnalysisInput {
    pub resume_text: String,
    pub skills: RequiredSkills,
}

#[derive(Debug, Clone, Copy)]
pub struct PromptOptions {
    pub max_cv_chars: usize,
    pub insights: bool,
}

impl From<&Config> for PromptOptions {
    fn from(config: &Config) -> Self {
        PromptOptions {
            max_cv_chars: config.max_cv_chars,
            insights: config.insights,
        }
    }
}

/// Runs the whole pipeline for the files named on the command line.
pub async fn run(
    resume: &Path,
    skills_source: &str,
    config: &Config,
) -> Result<AnalysisResult, AnalysisError> {
    let input = load_inputs(resume, skills_source)?;
    let options = PromptOptions::from(config);

    if input.skills.is_empty() {
        warn!("No valid required skills provided; returning empty result without calling the LLM");
        return Ok(AnalysisResult::empty(options.insights));
    }

    let backend = build_backend(config)?;
    analyze(&input, backend.as_ref(), options).await
}

/// Validates both inputs and extracts the resume text.
/// Existence of both files is checked before either is parsed.
pub fn load_inputs(resume: &Path, skills_source: &str) -> Result<AnalysisInput, AnalysisError> {
    check_resume_path(resume)?;
    let skills = RequiredSkills::load(skills_source)?;
    let resume_text = extract_resume_text(resume)?;

    Ok(AnalysisInput {
        resume_text,
        skills,
    })
}

/// Sends the prompt to `backend` and sanitizes the reply.
pub async fn analyze(
    input: &AnalysisInput,
    backend: &dyn CompletionBackend,
    options: PromptOptions,
) -> Result<AnalysisResult, AnalysisError> {
    let prompt = build_prompt(input, options)?;

    info!(
        "Sending request to {}. Required skills count: {}",
        backend.describe(),
        input.skills.len()
    );
    let raw = backend.complete(&prompt, JSON_ONLY_SYSTEM).await?;
    info!("Received response from LLM ({} chars)", raw.chars().count());

    sanitize(&raw, &input.skills, options.insights).map_err(|source| AnalysisError::Reply {
        source,
        raw_response: raw,
    })
}

pub fn build_prompt(input: &AnalysisInput, options: PromptOptions) -> Result<String, AnalysisError> {
    let skills: Vec<&str> = input.skills.iter().collect();
    let skills_json = serde_json::to_string_pretty(&skills)?;

    let (extra_instructions, insight_keys) = if options.insights {
        (INSIGHT_INSTRUCTIONS, INSIGHT_OUTPUT_KEYS)
    } else {
        ("", "")
    };
    let output_keys = format!("{BASE_OUTPUT_KEYS}{insight_keys}");

    // CV text goes in last so braces inside it are never read as placeholders
    Ok(SKILL_ANALYSIS_PROMPT_TEMPLATE
        .replace("{extra_instructions}", extra_instructions)
        .replace("{output_keys}", &output_keys)
        .replace("{skills_json}", &skills_json)
        .replace("{cv_text}", &truncate_cv(&input.resume_text, options.max_cv_chars)))
}

/// Cuts `text` to `max_chars` characters, marking the cut.
fn truncate_cv(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => {
            warn!("CV text truncated to {max_chars} characters for the prompt");
            format!("{}{TRUNCATION_NOTE}", &text[..idx])
        }
        None => text.to_string(),
    }
}
