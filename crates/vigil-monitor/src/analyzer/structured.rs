//! Structured stage: locate an embedded JSON object and complete it.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use vigil_core::{clamp_score, RiskBand, RiskScores};

use super::parse::{
    default_list, ParseMethod, ParsedAnalysis, DEFAULT_BAND, DEFAULT_OBSERVATION,
    DEFAULT_RECOMMENDATION, DEFAULT_RED_FLAG, DEFAULT_SCORE,
};

static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```").expect("valid fence regex"));

const FACIAL_KEYS: &[&str] = &["facial_expression_score", "facial_expression"];
const EYE_KEYS: &[&str] = &["eye_movement_score", "eye_movement"];
const BEHAVIORAL_KEYS: &[&str] = &["behavioral_score", "behavior_score", "behavioral"];
const AUTHENTICITY_KEYS: &[&str] = &[
    "authenticity_confidence",
    "authenticity_confidence_score",
    "authenticity_score",
];
const BAND_KEYS: &[&str] = &["fraud_risk", "fraud_risk_level", "risk_level"];

/// Find the first decodable JSON object in `raw`.
///
/// Fenced code blocks are tried first, then the span from the first `{` to
/// the last `}`. Anything that decodes to a non-object is ignored.
#[must_use]
pub fn extract_block(raw: &str) -> Option<Map<String, Value>> {
    let fenced = FENCED_BLOCK
        .captures_iter(raw)
        .filter_map(|c| c.get(1).map(|m| m.as_str().trim()));

    let braces = match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => Some(&raw[start..=end]),
        _ => None,
    };

    fenced.chain(braces).find_map(|candidate| {
        match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        }
    })
}

/// Fill every missing field with its documented default and clamp scores.
#[must_use]
pub fn complete(block: &Map<String, Value>) -> ParsedAnalysis {
    let scores = RiskScores {
        facial_expression: score_field(block, FACIAL_KEYS),
        eye_movement: score_field(block, EYE_KEYS),
        behavioral: score_field(block, BEHAVIORAL_KEYS),
        authenticity_confidence: score_field(block, AUTHENTICITY_KEYS),
    }
    .clamped();

    let fraud_risk = first_present(block, BAND_KEYS)
        .and_then(Value::as_str)
        .and_then(RiskBand::parse_lenient)
        .unwrap_or(DEFAULT_BAND);

    ParsedAnalysis {
        scores,
        fraud_risk,
        red_flags: list_field(block, "red_flags").unwrap_or_else(|| default_list(DEFAULT_RED_FLAG)),
        observations: list_field(block, "observations")
            .unwrap_or_else(|| default_list(DEFAULT_OBSERVATION)),
        recommendations: list_field(block, "recommendations")
            .unwrap_or_else(|| default_list(DEFAULT_RECOMMENDATION)),
        method: ParseMethod::Structured,
    }
}

fn first_present<'a>(block: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|k| block.get(*k))
        .filter(|v| !v.is_null())
}

fn score_field(block: &Map<String, Value>, keys: &[&str]) -> f64 {
    first_present(block, keys)
        .and_then(as_score)
        .map_or(DEFAULT_SCORE, clamp_score)
}

/// Numbers, or strings such as `"82"` / `"82.5%"`.
fn as_score(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn list_field(block: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    match block.get(key)? {
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
        ),
        Value::String(s) => Some(vec![s.clone()]),
        _ => None,
    }
}
