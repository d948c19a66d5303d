//! Response parsing chain: structured decode, then lenient scraping.

use serde::Serialize;
use vigil_core::{RiskBand, RiskScores};

use super::{lenient, structured};

/// Score used for any missing numeric field
pub const DEFAULT_SCORE: f64 = 75.0;

/// Band used when a structured answer omits it
pub const DEFAULT_BAND: RiskBand = RiskBand::Low;

pub(crate) const DEFAULT_RED_FLAG: &str = "none_detected";
pub(crate) const DEFAULT_OBSERVATION: &str = "No notable behavior observed";
pub(crate) const DEFAULT_RECOMMENDATION: &str = "Continue standard monitoring";

/// Which stage of the chain produced a [`ParsedAnalysis`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMethod {
    /// An embedded JSON object was decoded and completed
    Structured,
    /// Numbers were scraped from free text
    Lenient,
}

/// Analysis fields recovered from a raw model answer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedAnalysis {
    /// Clamped scores
    pub scores: RiskScores,
    /// Risk band
    pub fraud_risk: RiskBand,
    /// Red-flag tags
    pub red_flags: Vec<String>,
    /// Observations
    pub observations: Vec<String>,
    /// Recommendations
    pub recommendations: Vec<String>,
    /// Stage that produced the fields
    pub method: ParseMethod,
}

/// Run the raw answer through the fallback chain. Never fails.
#[must_use]
pub fn parse_response(raw: &str) -> ParsedAnalysis {
    structured::extract_block(raw).map_or_else(
        || lenient::scrape(raw),
        |block| structured::complete(&block),
    )
}

pub(crate) fn default_list(entry: &str) -> Vec<String> {
    vec![entry.to_string()]
}
