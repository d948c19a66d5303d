//! Lenient stage: scrape numbers out of a free-text answer.
//!
//! Heuristic by nature. Every numeric token in `[0, 100]` is treated as a
//! score, the mean becomes all four scores, and the band follows
//! [`RiskBand::from_score`].

use once_cell::sync::Lazy;
use regex::Regex;
use vigil_core::{RiskBand, RiskScores};

use super::parse::{
    default_list, ParseMethod, ParsedAnalysis, DEFAULT_OBSERVATION, DEFAULT_RECOMMENDATION,
    DEFAULT_RED_FLAG, DEFAULT_SCORE,
};

// A minus is a sign only at the start or after a separator; in "85-90" or
// "score-40" it joins two words and the number stays positive.
static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^\w.-])(-\d+(?:\.\d+)?)|(\d+(?:\.\d+)?)").expect("valid number regex")
});

/// Longest excerpt of the raw answer kept as an observation
const EXCERPT_CHARS: usize = 200;

/// Numeric tokens of `raw` that fall inside `[0, 100]`, in order.
#[must_use]
pub fn score_tokens(raw: &str) -> Vec<f64> {
    NUMBER
        .captures_iter(raw)
        .filter_map(|c| c.get(1).or_else(|| c.get(2))?.as_str().parse::<f64>().ok())
        .filter(|n| (0.0..=100.0).contains(n))
        .collect()
}

/// Mean of the in-range tokens rounded to two decimals, or the default.
#[must_use]
pub fn average_score(raw: &str) -> f64 {
    let tokens = score_tokens(raw);
    if tokens.is_empty() {
        return DEFAULT_SCORE;
    }
    let mean = tokens.iter().sum::<f64>() / tokens.len() as f64;
    (mean * 100.0).round() / 100.0
}

/// Build an analysis from free text. Never fails.
#[must_use]
pub fn scrape(raw: &str) -> ParsedAnalysis {
    let average = average_score(raw);
    let text = raw.trim();

    let observations = if text.is_empty() {
        default_list(DEFAULT_OBSERVATION)
    } else {
        let excerpt: String = text.chars().take(EXCERPT_CHARS).collect();
        vec![format!("Unstructured analysis: {excerpt}")]
    };

    ParsedAnalysis {
        scores: RiskScores::uniform(average),
        fraud_risk: RiskBand::from_score(average),
        red_flags: default_list(DEFAULT_RED_FLAG),
        observations,
        recommendations: default_list(DEFAULT_RECOMMENDATION),
        method: ParseMethod::Lenient,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_filtered_to_range() {
        let tokens = score_tokens("scores: 85, 40.5 and 92; year 2024, -3 offset");
        assert_eq!(tokens, vec![85.0, 40.5, 92.0]);
    }

    #[test]
    fn test_negative_tokens_are_out_of_range() {
        assert!(score_tokens("deviation -3 and -90").is_empty());
        assert_eq!(score_tokens("-7"), Vec::<f64>::new());

        let parsed = scrape("eye -50, face 80");
        assert!((parsed.scores.eye_movement - 80.0).abs() < 1e-9);
        assert_eq!(parsed.fraud_risk, RiskBand::Low);
    }

    #[test]
    fn test_joining_dash_is_not_a_sign() {
        assert_eq!(score_tokens("confidence 85-90"), vec![85.0, 90.0]);
        assert_eq!(score_tokens("score-40, (-5)"), vec![40.0]);
        assert_eq!(score_tokens("1,2 and 3"), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_mean_of_three_tokens() {
        let parsed = scrape("facial 85 / eye 40 / behavior 92");
        assert!((parsed.scores.facial_expression - 72.33).abs() < 1e-9);
        assert!((parsed.scores.eye_movement - 72.33).abs() < 1e-9);
        assert!((parsed.scores.behavioral - 72.33).abs() < 1e-9);
        assert!((parsed.scores.authenticity_confidence - 72.33).abs() < 1e-9);
        assert_eq!(parsed.fraud_risk, RiskBand::Low);
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(scrape("70").fraud_risk, RiskBand::Medium);
        assert_eq!(scrape("70.01").fraud_risk, RiskBand::Low);
        assert_eq!(scrape("40").fraud_risk, RiskBand::Medium);
        assert_eq!(scrape("39.9").fraud_risk, RiskBand::High);
    }

    #[test]
    fn test_no_tokens_uses_default() {
        let parsed = scrape("The candidate seems calm.");
        assert_eq!(parsed.scores, RiskScores::uniform(DEFAULT_SCORE));
        assert_eq!(parsed.fraud_risk, RiskBand::Low);
        assert!(parsed.observations[0].starts_with("Unstructured analysis: The candidate"));
    }

    #[test]
    fn test_excerpt_is_bounded() {
        let long = "x".repeat(1000);
        let parsed = scrape(&long);
        let prefix = "Unstructured analysis: ".len();
        assert_eq!(parsed.observations[0].len(), prefix + EXCERPT_CHARS);
    }
}
