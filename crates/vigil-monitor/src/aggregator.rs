//! Monitoring aggregator: per-session snapshots and reviewer push.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use vigil_core::{MonitoringSnapshot, PushMessage, SessionId, SessionIdentity};

use crate::history::HistoryBuffer;
use crate::recording::RecordingManager;
use crate::registry::SessionRegistry;
use crate::shard::ShardedMap;
use crate::violations::ViolationLog;

/// Which slice of the violation log a snapshot carries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotOptions {
    /// Skip this many violations
    pub violation_offset: usize,

    /// Return at most this many violations (`None` = all)
    pub violation_limit: Option<usize>,
}

impl SnapshotOptions {
    /// Request one page of violations
    #[must_use]
    pub const fn page(offset: usize, limit: usize) -> Self {
        Self {
            violation_offset: offset,
            violation_limit: Some(limit),
        }
    }
}

#[derive(Debug, Clone)]
struct SessionMeta {
    created_at: DateTime<Utc>,
    identity: Option<SessionIdentity>,
    ended_at: Option<DateTime<Utc>>,
}

impl SessionMeta {
    fn new() -> Self {
        Self {
            created_at: Utc::now(),
            identity: None,
            ended_at: None,
        }
    }
}

/// Joins registry, recordings, violations and history into one view
pub struct MonitoringAggregator {
    registry: Arc<SessionRegistry>,
    history: Arc<HistoryBuffer>,
    recordings: Arc<RecordingManager>,
    violations: Arc<ViolationLog>,
    sessions: ShardedMap<SessionId, SessionMeta>,
}

impl MonitoringAggregator {
    /// Build an aggregator over the shared components
    #[must_use]
    pub fn new(
        registry: Arc<SessionRegistry>,
        history: Arc<HistoryBuffer>,
        recordings: Arc<RecordingManager>,
        violations: Arc<ViolationLog>,
    ) -> Self {
        Self {
            registry,
            history,
            recordings,
            violations,
            sessions: ShardedMap::new(),
        }
    }

    /// Note that `session_id` exists; the first call fixes its creation time
    pub fn touch(&self, session_id: &SessionId) {
        if self.sessions.shard(session_id).read().contains_key(session_id) {
            return;
        }
        self.sessions
            .shard(session_id)
            .write()
            .entry(session_id.clone())
            .or_insert_with(SessionMeta::new);
    }

    /// Bind the session to its interview and candidate
    pub fn bind_identity(&self, session_id: &SessionId, identity: SessionIdentity) {
        info!(
            session = %session_id,
            interview = %identity.interview_id,
            candidate = %identity.candidate,
            "session bound"
        );
        self.sessions
            .shard(session_id)
            .write()
            .entry(session_id.clone())
            .or_insert_with(SessionMeta::new)
            .identity = Some(identity);
    }

    /// Mark the interview ended. Returns false if it already was.
    pub fn mark_ended(&self, session_id: &SessionId) -> bool {
        let mut shard = self.sessions.shard(session_id).write();
        let meta = shard
            .entry(session_id.clone())
            .or_insert_with(SessionMeta::new);
        if meta.ended_at.is_some() {
            return false;
        }
        meta.ended_at = Some(Utc::now());
        drop(shard);
        info!(session = %session_id, "interview ended");
        true
    }

    /// Returns true once the interview ended and no reviewer remains
    #[must_use]
    pub fn is_finished(&self, session_id: &SessionId) -> bool {
        let ended = self
            .sessions
            .shard(session_id)
            .read()
            .get(session_id)
            .is_some_and(|m| m.ended_at.is_some());
        ended && !self.registry.is_live(session_id)
    }

    /// Deliver a push message to the session's reviewer, if connected
    pub fn publish(&self, session_id: &SessionId, message: PushMessage) -> bool {
        self.registry.push(session_id, message)
    }

    /// Compute a fresh snapshot of the session
    #[must_use]
    pub fn snapshot(&self, session_id: &SessionId, options: SnapshotOptions) -> MonitoringSnapshot {
        let meta = self.sessions.shard(session_id).read().get(session_id).cloned();

        MonitoringSnapshot {
            session_id: session_id.clone(),
            is_live: self.registry.is_live(session_id),
            created_at: meta.as_ref().map(|m| m.created_at),
            ended: meta.as_ref().is_some_and(|m| m.ended_at.is_some()),
            identity: meta.and_then(|m| m.identity),
            recordings: self.recordings.recordings_of(session_id),
            violations: self.violations.page(
                session_id,
                options.violation_offset,
                options.violation_limit,
            ),
            latest_analysis: self.history.latest_for(session_id),
            analysis_count: self.history.count_for(session_id),
            generated_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for MonitoringAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitoringAggregator")
            .field("sessions", &self.sessions.len())
            .field("live", &self.registry.live_count())
            .finish_non_exhaustive()
    }
}
