use serde::Serialize;

use crate::errors::AnalysisError;

/// Sanitized verdict for one resume against one required-skill set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    /// Always within 0..=100.
    pub match_score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strengths: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weaknesses: Option<Vec<String>>,
}

impl AnalysisResult {
    /// Result for an empty required-skill set: nothing to match, score 0.
    pub fn empty(insights: bool) -> Self {
        let insight_list = insights.then(Vec::new);
        AnalysisResult {
            matched_skills: vec![],
            missing_skills: vec![],
            match_score: 0,
            strengths: insight_list.clone(),
            weaknesses: insight_list,
        }
    }
}

/// Error shape written to stdout when a run fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

/// The single JSON document a run emits, tagged by `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AnalysisOutcome {
    Success(AnalysisResult),
    Error(ErrorRecord),
}

impl AnalysisOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisOutcome::Success(_))
    }

    /// Pretty JSON for stdout.
    pub fn to_json(&self) -> Result<String, AnalysisError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl From<Result<AnalysisResult, AnalysisError>> for AnalysisOutcome {
    fn from(result: Result<AnalysisResult, AnalysisError>) -> Self {
        match result {
            Ok(r) => AnalysisOutcome::Success(r),
            Err(e) => AnalysisOutcome::Error(e.into()),
        }
    }
}
