use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SessionId;

/// Lowest valid score
pub const MIN_SCORE: f64 = 0.0;

/// Highest valid score
pub const MAX_SCORE: f64 = 100.0;

/// Red flag carried by every failure record
pub const ANALYSIS_ERROR_FLAG: &str = "analysis_error";

/// Clamp a score into `[0, 100]`. NaN collapses to 0.
#[must_use]
pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        MIN_SCORE
    } else {
        value.clamp(MIN_SCORE, MAX_SCORE)
    }
}

/// Coarse fraud-risk classification of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskBand {
    /// Nothing suspicious
    Low,
    /// Some signals worth a second look
    Medium,
    /// Strong integrity concerns
    High,
    /// No usable signal (failure path)
    Unknown,
}

impl RiskBand {
    /// Band for an aggregate score.
    ///
    /// `> 70` is Low, `40..=70` is Medium, `< 40` is High.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score > 70.0 {
            Self::Low
        } else if score >= 40.0 {
            Self::Medium
        } else {
            Self::High
        }
    }

    /// Case-insensitive parse of a band name as emitted by the model
    #[must_use]
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "moderate" => Some(Self::Medium),
            "high" => Some(Self::High),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for RiskBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Where an analysis record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Parsed from a real analysis service response
    Normal,
    /// Fixed stand-in produced while the service is disabled
    Mock,
    /// Produced by a failure path
    Error,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Mock => write!(f, "mock"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// The four behavioral scores of one frame, each in `[0, 100]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskScores {
    /// Facial expression naturalness
    #[serde(rename = "facial_expression_score")]
    pub facial_expression: f64,

    /// Eye movement / gaze consistency
    #[serde(rename = "eye_movement_score")]
    pub eye_movement: f64,

    /// Overall behavioral consistency
    #[serde(rename = "behavioral_score")]
    pub behavioral: f64,

    /// Confidence that the candidate is authentic
    pub authenticity_confidence: f64,
}

impl RiskScores {
    /// All four scores set to the same value (clamped)
    #[must_use]
    pub fn uniform(value: f64) -> Self {
        let v = clamp_score(value);
        Self {
            facial_expression: v,
            eye_movement: v,
            behavioral: v,
            authenticity_confidence: v,
        }
    }

    /// Copy with every score clamped into `[0, 100]`
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            facial_expression: clamp_score(self.facial_expression),
            eye_movement: clamp_score(self.eye_movement),
            behavioral: clamp_score(self.behavioral),
            authenticity_confidence: clamp_score(self.authenticity_confidence),
        }
    }

    /// Mean of the four scores
    #[must_use]
    pub fn average(&self) -> f64 {
        (self.facial_expression + self.eye_movement + self.behavioral + self.authenticity_confidence)
            / 4.0
    }

    /// Returns true if every score lies in `[0, 100]`
    #[must_use]
    pub fn in_range(&self) -> bool {
        [
            self.facial_expression,
            self.eye_movement,
            self.behavioral,
            self.authenticity_confidence,
        ]
        .iter()
        .all(|s| (MIN_SCORE..=MAX_SCORE).contains(s))
    }
}

/// Normalized risk record for one analyzed frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Session the frame belongs to
    pub session_id: SessionId,

    /// When the record was produced
    pub timestamp: DateTime<Utc>,

    /// Behavioral scores
    #[serde(flatten)]
    pub scores: RiskScores,

    /// Fraud-risk band
    pub fraud_risk: RiskBand,

    /// Short machine-friendly tags of suspicious signals
    #[serde(default)]
    pub red_flags: Vec<String>,

    /// Free-text observations about the frame
    #[serde(default)]
    pub observations: Vec<String>,

    /// Free-text recommendations for the reviewer
    #[serde(default)]
    pub recommendations: Vec<String>,

    /// Which path produced the record
    pub provenance: Provenance,
}

impl AnalysisResult {
    /// Fixed stand-in used when the analysis service is unavailable
    #[must_use]
    pub fn mock(session_id: SessionId, timestamp: DateTime<Utc>) -> Self {
        Self {
            session_id,
            timestamp,
            scores: RiskScores {
                facial_expression: 85.0,
                eye_movement: 80.0,
                behavioral: 82.0,
                authenticity_confidence: 88.0,
            },
            fraud_risk: RiskBand::Low,
            red_flags: Vec::new(),
            observations: vec!["Analysis service not configured; mock scores returned".to_string()],
            recommendations: vec!["Configure the analysis service for live scoring".to_string()],
            provenance: Provenance::Mock,
        }
    }

    /// Degraded record for a failed analysis
    #[must_use]
    pub fn failure(session_id: SessionId, timestamp: DateTime<Utc>, reason: &str) -> Self {
        Self {
            session_id,
            timestamp,
            scores: RiskScores::uniform(0.0),
            fraud_risk: RiskBand::Unknown,
            red_flags: vec![ANALYSIS_ERROR_FLAG.to_string()],
            observations: vec![format!("Analysis failed: {reason}")],
            recommendations: vec!["Review this frame manually".to_string()],
            provenance: Provenance::Error,
        }
    }

    /// Returns true if the record came from a degraded path
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.provenance != Provenance::Normal
    }
}
