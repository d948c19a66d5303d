use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AnalysisResult, Recording, RecordingKind, SessionId, SessionIdentity, ViolationPage};

/// Point-in-time view of everything known about a session.
///
/// Computed on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringSnapshot {
    /// Session described
    pub session_id: SessionId,

    /// Whether a reviewer is currently connected
    pub is_live: bool,

    /// When the session was first seen
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    /// Whether the interview has been marked ended
    #[serde(default)]
    pub ended: bool,

    /// Interview and candidate, when bound
    #[serde(default)]
    pub identity: Option<SessionIdentity>,

    /// Most recent recording per capture kind
    #[serde(default)]
    pub recordings: BTreeMap<RecordingKind, Recording>,

    /// Violations (full list or the requested page)
    pub violations: ViolationPage,

    /// Latest risk record for the session, if any is still buffered
    #[serde(default)]
    pub latest_analysis: Option<AnalysisResult>,

    /// Risk records for the session still held in history
    #[serde(default)]
    pub analysis_count: usize,

    /// When the snapshot was computed
    pub generated_at: DateTime<Utc>,
}
