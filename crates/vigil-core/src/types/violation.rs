use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::SessionId;

/// How serious a security violation is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Suspicious but possibly innocent
    Warning,
    /// Clear integrity breach
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = crate::VigilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "warning" | "warn" => Ok(Self::Warning),
            "critical" => Ok(Self::Critical),
            other => Err(crate::VigilError::Config(format!("unknown severity: {other}"))),
        }
    }
}

/// A discrete security event reported by the candidate's client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityViolation {
    /// Generated id
    pub id: Uuid,

    /// Session the event belongs to
    pub session_id: SessionId,

    /// Free-form type tag, e.g. `tab_switch`
    #[serde(rename = "type")]
    pub violation_type: String,

    /// Severity
    pub severity: Severity,

    /// Human readable description
    pub description: String,

    /// When the event was recorded
    pub timestamp: DateTime<Utc>,
}

/// A page of violations for one session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationPage {
    /// Total violations recorded for the session
    pub total: usize,

    /// Offset of the first item
    pub offset: usize,

    /// Violations in this page, oldest first
    pub items: Vec<SecurityViolation>,

    /// Total `warning` violations for the session
    pub warning_count: usize,

    /// Total `critical` violations for the session
    pub critical_count: usize,
}

impl ViolationPage {
    /// Returns true if more violations follow this page
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.offset + self.items.len() < self.total
    }
}
