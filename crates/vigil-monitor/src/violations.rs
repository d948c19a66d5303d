//! Append-only security violation log.

use chrono::Utc;
use tracing::warn;
use uuid::Uuid;
use vigil_core::{SecurityViolation, SessionId, Severity, ViolationPage};

use crate::shard::ShardedMap;

/// Violations per session, in the order they were recorded
#[derive(Default)]
pub struct ViolationLog {
    entries: ShardedMap<SessionId, Vec<SecurityViolation>>,
}

impl ViolationLog {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation and return it with its generated id
    pub fn record(
        &self,
        session_id: &SessionId,
        violation_type: impl Into<String>,
        severity: Severity,
        description: impl Into<String>,
    ) -> SecurityViolation {
        let violation = SecurityViolation {
            id: Uuid::new_v4(),
            session_id: session_id.clone(),
            violation_type: violation_type.into(),
            severity,
            description: description.into(),
            timestamp: Utc::now(),
        };

        warn!(
            session = %session_id,
            violation = %violation.violation_type,
            severity = %severity,
            "security violation"
        );

        self.entries
            .shard(session_id)
            .write()
            .entry(session_id.clone())
            .or_default()
            .push(violation.clone());
        violation
    }

    /// Every violation of the session, oldest first
    #[must_use]
    pub fn list_for(&self, session_id: &SessionId) -> Vec<SecurityViolation> {
        self.entries
            .shard(session_id)
            .read()
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of violations recorded for the session
    #[must_use]
    pub fn count_for(&self, session_id: &SessionId) -> usize {
        self.entries
            .shard(session_id)
            .read()
            .get(session_id)
            .map_or(0, Vec::len)
    }

    /// A page of violations plus per-severity totals.
    ///
    /// `limit` of `None` returns everything from `offset` on.
    #[must_use]
    pub fn page(&self, session_id: &SessionId, offset: usize, limit: Option<usize>) -> ViolationPage {
        let shard = self.entries.shard(session_id).read();
        let Some(all) = shard.get(session_id) else {
            return ViolationPage {
                offset,
                ..ViolationPage::default()
            };
        };

        let critical_count = all
            .iter()
            .filter(|v| v.severity == Severity::Critical)
            .count();
        let items = all
            .iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        ViolationPage {
            total: all.len(),
            offset,
            items,
            warning_count: all.len() - critical_count,
            critical_count,
        }
    }
}

impl std::fmt::Debug for ViolationLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViolationLog")
            .field("sessions", &self.entries.len())
            .finish()
    }
}
