use thiserror::Error;

use crate::analysis::models::ErrorRecord;
use crate::analysis::sanitizer::SanitizeError;
use crate::llm_client::LlmError;

/// Every way a single analysis run can fail.
/// Converted into an `ErrorRecord` at the top level so stdout always carries valid JSON.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input not found: {0}")]
    InputNotFound(String),

    #[error("Unsupported file type: {0}. Only PDF and TXT are supported.")]
    UnsupportedFormat(String),

    #[error("Invalid required skills: {0}")]
    InvalidSkills(String),

    #[error("Text extraction failed: {0}")]
    ExtractionFailure(String),

    #[error("LLM backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("LLM backend did not answer within {0} seconds")]
    BackendTimeout(u64),

    #[error("LLM returned an empty reply")]
    EmptyReply,

    #[error("{source}")]
    Reply {
        source: SanitizeError,
        raw_response: String,
    },

    #[error("Failed to serialize result: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AnalysisError {
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::Usage(_) => "USAGE",
            AnalysisError::Config(_) => "CONFIG_ERROR",
            AnalysisError::InputNotFound(_) => "INPUT_NOT_FOUND",
            AnalysisError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            AnalysisError::InvalidSkills(_) => "INVALID_SKILLS",
            AnalysisError::ExtractionFailure(_) => "EXTRACTION_FAILURE",
            AnalysisError::BackendUnavailable(_) => "BACKEND_UNAVAILABLE",
            AnalysisError::BackendTimeout(_) => "BACKEND_TIMEOUT",
            AnalysisError::EmptyReply => "EMPTY_REPLY",
            AnalysisError::Reply { source, .. } => source.code(),
            AnalysisError::Serialization(_) => "SERIALIZATION_FAILURE",
        }
    }

    /// The unparsed model output, when the failure happened after the model answered.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            AnalysisError::Reply { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for AnalysisError {
    fn from(e: anyhow::Error) -> Self {
        // `{:#}` keeps the context chain on one line
        AnalysisError::Config(format!("{e:#}"))
    }
}

impl From<LlmError> for AnalysisError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Timeout { secs } => AnalysisError::BackendTimeout(secs),
            LlmError::EmptyContent => AnalysisError::EmptyReply,
            LlmError::MissingApiKey(key) => AnalysisError::Config(format!(
                "Required environment variable '{key}' is not set"
            )),
            other => AnalysisError::BackendUnavailable(other.to_string()),
        }
    }
}

impl From<AnalysisError> for ErrorRecord {
    fn from(e: AnalysisError) -> Self {
        match &e {
            AnalysisError::Reply { source, .. } => {
                tracing::error!("Sanitizing LLM reply failed at {:?}: {source}", source.stage());
            }
            AnalysisError::BackendUnavailable(msg) => tracing::error!("LLM error: {msg}"),
            other => tracing::error!("Analysis failed: {other}"),
        }

        ErrorRecord {
            code: e.code().to_string(),
            message: e.to_string(),
            raw_response: e.raw_response().map(String::from),
        }
    }
}
