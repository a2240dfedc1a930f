//! Response sanitizer — turns an untrusted model reply into a bounded `AnalysisResult`.
//!
//! Single pass: `ExtractJson → ParseJson → CoerceFields → ReconcileScore`.
//! The first three stages can fail; reconciliation always produces a score.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::analysis::models::AnalysisResult;
use crate::resume::skills::RequiredSkills;

pub mod coercer;
pub mod extractor;
pub mod reconciler;

use coercer::coerce_fields;
use extractor::extract_json_object;
use reconciler::reconcile_score;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ExtractJson,
    ParseJson,
    CoerceFields,
}

#[derive(Debug, Error)]
pub enum SanitizeError {
    #[error("Could not find a JSON object in the LLM response")]
    NoJsonObject,

    #[error("Could not find JSON object boundaries in the LLM response")]
    InvertedSpan,

    #[error("LLM response substring was not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("LLM response JSON must be an object, got {0}")]
    NotAnObject(&'static str),
}

impl SanitizeError {
    pub fn stage(&self) -> Stage {
        match self {
            SanitizeError::NoJsonObject | SanitizeError::InvertedSpan => Stage::ExtractJson,
            SanitizeError::InvalidJson(_) => Stage::ParseJson,
            SanitizeError::NotAnObject(_) => Stage::CoerceFields,
        }
    }

    pub fn code(&self) -> &'static str {
        match self.stage() {
            Stage::ExtractJson => "EXTRACTION_ERROR",
            Stage::ParseJson => "INVALID_JSON",
            Stage::CoerceFields => "SCHEMA_ERROR",
        }
    }
}

/// Sanitizes `raw` against `required`. Pure apart from logging, so the same input always
/// yields the same result.
pub fn sanitize(
    raw: &str,
    required: &RequiredSkills,
    insights: bool,
) -> Result<AnalysisResult, SanitizeError> {
    let candidate = extract_json_object(raw)?;
    debug!("Extracted {} byte JSON candidate from LLM reply", candidate.len());

    let parsed: Value = serde_json::from_str(candidate)?;
    let fields = coerce_fields(parsed, required, insights)?;

    let match_score = reconcile_score(
        fields.reported_score.as_ref(),
        fields.matched_skills.len(),
        required.len(),
    );

    info!(
        "Sanitized LLM reply: {}/{} skills matched, score {}",
        fields.matched_skills.len(),
        required.len(),
        match_score
    );

    Ok(AnalysisResult {
        matched_skills: fields.matched_skills,
        missing_skills: fields.missing_skills,
        match_score,
        strengths: fields.strengths,
        weaknesses: fields.weaknesses,
    })
}
