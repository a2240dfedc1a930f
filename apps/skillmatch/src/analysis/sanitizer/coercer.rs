use std::collections::BTreeSet;

use serde_json::{Map, Value};
use tracing::warn;

use super::SanitizeError;
use crate::resume::skills::{json_kind, RequiredSkills};

const MATCHED_KEY: &str = "matched_skills";
const MISSING_KEY: &str = "missing_skills";
pub const SCORE_KEY: &str = "match_score";
const STRENGTHS_KEY: &str = "strengths";
const WEAKNESSES_KEY: &str = "weaknesses";

/// Object fields that may name a skill inside a `matched_skills` entry.
const SKILL_NAME_FIELDS: &[&str] = &["skill", "name"];

/// Typed fields pulled out of the model's JSON object. The score is left raw for the
/// reconciler.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercedFields {
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub reported_score: Option<Value>,
    pub strengths: Option<Vec<String>>,
    pub weaknesses: Option<Vec<String>>,
}

/// Coerces the parsed reply into typed fields.
///
/// Only a non-object top level is fatal. Malformed entries are dropped with a warning and
/// malformed fields fall back to empty defaults.
pub fn coerce_fields(
    value: Value,
    required: &RequiredSkills,
    insights: bool,
) -> Result<CoercedFields, SanitizeError> {
    let mut map = match value {
        Value::Object(map) => map,
        other => return Err(SanitizeError::NotAnObject(json_kind(&other))),
    };

    let matched = coerce_matched(map.remove(MATCHED_KEY), required);
    let missing = reconcile_missing(map.remove(MISSING_KEY), &matched, required);
    let reported_score = map.remove(SCORE_KEY);

    let (strengths, weaknesses) = if insights {
        (
            Some(coerce_text_list(map.remove(STRENGTHS_KEY), STRENGTHS_KEY)),
            Some(coerce_text_list(map.remove(WEAKNESSES_KEY), WEAKNESSES_KEY)),
        )
    } else {
        (None, None)
    };

    log_unexpected_keys(&map);

    Ok(CoercedFields {
        matched_skills: matched.into_iter().collect(),
        missing_skills: missing.into_iter().collect(),
        reported_score,
        strengths,
        weaknesses,
    })
}

fn coerce_matched(raw: Option<Value>, required: &RequiredSkills) -> BTreeSet<String> {
    let items = match raw {
        Some(Value::Array(items)) => items,
        Some(other) => {
            warn!("'{MATCHED_KEY}' is {} instead of a list; treating as empty", json_kind(&other));
            return BTreeSet::new();
        }
        None => {
            warn!("'{MATCHED_KEY}' missing from LLM JSON; treating as empty");
            return BTreeSet::new();
        }
    };

    let mut matched = BTreeSet::new();
    for item in &items {
        let Some(name) = skill_name(item) else {
            warn!("Ignoring unexpected item in {MATCHED_KEY}: {item}");
            continue;
        };
        if required.contains(name) {
            matched.insert(name.to_string());
        } else {
            warn!("Ignoring matched skill '{name}' that is not in the required set");
        }
    }
    matched
}

/// Reads a skill name from a string entry or from `{"skill": "..."}` / `{"name": "..."}`.
fn skill_name(item: &Value) -> Option<&str> {
    let name = match item {
        Value::String(s) => s.as_str(),
        Value::Object(obj) => SKILL_NAME_FIELDS
            .iter()
            .find_map(|field| obj.get(*field).and_then(Value::as_str))?,
        _ => return None,
    };
    let name = name.trim();
    (!name.is_empty()).then_some(name)
}

/// The final missing list is always required − matched. The reported list is only used to
/// flag disagreement with the model.
fn reconcile_missing(
    raw: Option<Value>,
    matched: &BTreeSet<String>,
    required: &RequiredSkills,
) -> BTreeSet<String> {
    let computed: BTreeSet<String> = required
        .iter()
        .filter(|name| !matched.contains(*name))
        .map(String::from)
        .collect();

    let reported: BTreeSet<String> = match raw {
        Some(Value::Array(items)) if items.iter().all(Value::is_string) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Some(other) => {
            warn!("'{MISSING_KEY}' is not a list of strings ({other}); computing it instead");
            return computed;
        }
        None => {
            warn!("'{MISSING_KEY}' missing from LLM JSON; computing it instead");
            return computed;
        }
    };

    for name in reported.difference(&computed) {
        warn!("Dropping reported missing skill '{name}' (not required, or already matched)");
    }
    for name in computed.difference(&reported) {
        warn!("Adding required skill '{name}' the model left out of both lists");
    }

    computed
}

/// Coerces a list of free-text strings, keeping order and dropping blanks and repeats.
/// A bare string counts as a one-item list.
fn coerce_text_list(raw: Option<Value>, key: &str) -> Vec<String> {
    let items = match raw {
        Some(Value::Array(items)) => items,
        Some(Value::String(s)) => vec![Value::String(s)],
        Some(other) => {
            warn!("'{key}' is {} instead of a list; treating as empty", json_kind(&other));
            return vec![];
        }
        None => {
            warn!("'{key}' missing from LLM JSON; treating as empty");
            return vec![];
        }
    };

    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in &items {
        match item.as_str().map(str::trim) {
            Some("") => {}
            Some(text) => {
                if !out.iter().any(|existing| existing == text) {
                    out.push(text.to_string());
                }
            }
            None => warn!("Ignoring non-string item in {key}: {item}"),
        }
    }
    out
}

fn log_unexpected_keys(remaining: &Map<String, Value>) {
    if !remaining.is_empty() {
        let keys: Vec<&str> = remaining.keys().map(String::as_str).collect();
        warn!("LLM response contained unexpected extra keys (ignored): {keys:?}");
    }
}
