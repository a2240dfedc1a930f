use serde_json::Value;
use tracing::{info, warn};

const MAX_SCORE: f64 = 100.0;

/// Final 0–100 score. Never fails.
///
/// An empty required set always scores 0. Otherwise a numeric (or numeric-string) report
/// is rounded and clamped, and anything else is replaced by `round(100 × matched / required)`.
pub fn reconcile_score(reported: Option<&Value>, matched_count: usize, required_count: usize) -> u8 {
    if required_count == 0 {
        return 0;
    }
    match reported.and_then(reported_number) {
        Some(score) => clamp_score(score),
        None => {
            let score = recompute_score(matched_count, required_count);
            info!("Using recalculated match_score: {score}");
            score
        }
    }
}

pub fn recompute_score(matched_count: usize, required_count: usize) -> u8 {
    if required_count == 0 {
        return 0;
    }
    clamp_score(MAX_SCORE * matched_count as f64 / required_count as f64)
}

fn reported_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(n) => Some(n),
            Err(_) => {
                warn!("Could not convert string match_score '{s}' to a number; recalculating");
                None
            }
        },
        Value::Null => {
            warn!("LLM 'match_score' is null; recalculating");
            None
        }
        other => {
            warn!("LLM 'match_score' ({other}) is not numeric; recalculating");
            None
        }
    };

    number.filter(|n| {
        let finite = n.is_finite();
        if !finite {
            warn!("LLM 'match_score' {n} is not finite; recalculating");
        }
        finite
    })
}

/// Rounds half to even, then clamps into 0..=100.
fn clamp_score(score: f64) -> u8 {
    score.round_ties_even().clamp(0.0, MAX_SCORE) as u8
}
