use std::collections::BTreeSet;
use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use crate::errors::AnalysisError;

/// The caller's required skills. Only names matter; any per-skill metadata
/// (weights, percentages) in the source document is ignored.
///
/// Names are trimmed, blank names dropped, and duplicates collapse. Matching is
/// case-sensitive, so "Go" and "go" are two different skills.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredSkills(BTreeSet<String>);

impl RequiredSkills {
    /// Loads skills from `source`: a path to a JSON file, or inline JSON text.
    pub fn load(source: &str) -> Result<Self, AnalysisError> {
        let path = Path::new(source);
        let (text, origin) = if path.is_file() {
            let text = std::fs::read_to_string(path).map_err(|e| {
                AnalysisError::InvalidSkills(format!("could not read {}: {e}", path.display()))
            })?;
            (text, path.display().to_string())
        } else if looks_like_inline_json(source) {
            (source.to_string(), "inline argument".to_string())
        } else {
            return Err(AnalysisError::InputNotFound(format!(
                "Skills file not found: {source}"
            )));
        };

        let value: Value = serde_json::from_str(&text).map_err(|e| {
            AnalysisError::InvalidSkills(format!("{origin} is not valid JSON: {e}"))
        })?;

        let skills = Self::from_value(&value)?;
        info!("Loaded {} required skills from {origin}", skills.len());
        Ok(skills)
    }

    /// Accepts an object (keys are skill names) or an array of strings.
    pub fn from_value(value: &Value) -> Result<Self, AnalysisError> {
        let names: Vec<&str> = match value {
            Value::Object(map) => map.keys().map(String::as_str).collect(),
            Value::Array(items) => items
                .iter()
                .filter_map(|item| match item.as_str() {
                    Some(name) => Some(name),
                    None => {
                        warn!("Ignoring non-string entry in required skills: {item}");
                        None
                    }
                })
                .collect(),
            other => {
                return Err(AnalysisError::InvalidSkills(format!(
                    "expected a JSON object of skills, got {}",
                    json_kind(other)
                )))
            }
        };

        Ok(names.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Skill names in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<'a> FromIterator<&'a str> for RequiredSkills {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        RequiredSkills(
            iter.into_iter()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect(),
        )
    }
}

fn looks_like_inline_json(source: &str) -> bool {
    matches!(source.trim_start().chars().next(), Some('{') | Some('['))
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
