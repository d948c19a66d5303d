//! The [`Monitor`] facade: one entry point per monitoring operation.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use uuid::Uuid;
use vigil_core::{
    AnalysisResult, AnalysisService, ChunkRef, MonitoringSnapshot, PushMessage, RecordingKind,
    RecordingStatus, RecordingStatusUpdate, Result, SecurityViolation, SessionId,
    SessionIdentity, Severity,
};

use crate::aggregator::{MonitoringAggregator, SnapshotOptions};
use crate::analyzer::FrameAnalyzer;
use crate::config::{MonitorConfig, StorageBackend};
use crate::history::{HistoryBuffer, DEFAULT_HISTORY_CAPACITY};
use crate::recording::RecordingManager;
use crate::registry::{ReviewerChannel, SessionRegistry};
use crate::storage::{ChunkStorage, FsChunkStorage, MemoryChunkStorage};
use crate::violations::ViolationLog;

/// Live monitoring of interview sessions.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct Monitor {
    registry: Arc<SessionRegistry>,
    history: Arc<HistoryBuffer>,
    analyzer: FrameAnalyzer,
    recordings: Arc<RecordingManager>,
    violations: Arc<ViolationLog>,
    aggregator: MonitoringAggregator,
}

impl Monitor {
    /// Start building a monitor
    #[must_use]
    pub fn builder() -> MonitorBuilder {
        MonitorBuilder::new()
    }

    /// Build a monitor from configuration
    pub fn from_config(config: &MonitorConfig) -> Result<Self> {
        let storage: Arc<dyn ChunkStorage> = match config.storage.backend {
            StorageBackend::Filesystem => Arc::new(FsChunkStorage::new(config.storage.root())),
            StorageBackend::Memory => Arc::new(MemoryChunkStorage::new()),
        };

        let mut builder = Self::builder()
            .history_capacity(config.history_capacity)
            .storage(storage)
            .timeout(config.analysis.timeout());

        match config.analysis.client()? {
            Some(client) => {
                info!(model = client.model(), "analysis service enabled");
                builder = builder.service(Arc::new(client));
            }
            None => info!("analysis service unavailable, using mock analysis"),
        }

        Ok(builder.build())
    }

    /// Register a reviewer for the session, replacing any earlier one
    pub fn connect_reviewer(&self, session_id: &SessionId) -> ReviewerChannel {
        self.aggregator.touch(session_id);
        self.registry.connect(session_id)
    }

    /// Drop the session's reviewer, if any
    pub fn disconnect_reviewer(&self, session_id: &SessionId) {
        self.registry.disconnect(session_id);
    }

    /// Whether a reviewer is connected
    #[must_use]
    pub fn is_live(&self, session_id: &SessionId) -> bool {
        self.registry.is_live(session_id)
    }

    /// Bind the session to its interview and candidate
    pub fn bind_identity(&self, session_id: &SessionId, identity: SessionIdentity) {
        self.aggregator.bind_identity(session_id, identity);
    }

    /// Mark the interview ended
    pub fn end_session(&self, session_id: &SessionId) -> bool {
        self.aggregator.mark_ended(session_id)
    }

    /// Whether the interview ended and its reviewer is gone
    #[must_use]
    pub fn is_finished(&self, session_id: &SessionId) -> bool {
        self.aggregator.is_finished(session_id)
    }

    /// Analyze a base64 frame and push the record to the reviewer
    pub async fn submit_frame(&self, session_id: &SessionId, frame: &str) -> AnalysisResult {
        self.aggregator.touch(session_id);
        let record = self.analyzer.analyze(frame, session_id).await;
        self.publish_analysis(&record);
        record
    }

    /// Analyze raw image bytes and push the record to the reviewer
    pub async fn submit_image(&self, session_id: &SessionId, image: &[u8]) -> AnalysisResult {
        self.aggregator.touch(session_id);
        let record = self.analyzer.analyze_image(image, session_id).await;
        self.publish_analysis(&record);
        record
    }

    fn publish_analysis(&self, record: &AnalysisResult) {
        let delivered = self.aggregator.publish(
            &record.session_id,
            PushMessage::AnalysisResult(record.clone()),
        );
        debug!(session = %record.session_id, delivered, "analysis published");
    }

    /// Start a recording of `kind`
    pub async fn start_recording(&self, session_id: &SessionId, kind: RecordingKind) -> Result<Uuid> {
        self.aggregator.touch(session_id);
        let id = self.recordings.start(session_id, kind).await?;
        self.publish_recording(session_id, id, kind, RecordingStatus::Recording);
        Ok(id)
    }

    /// Store one chunk of the active `kind` recording
    pub async fn append_chunk(
        &self,
        session_id: &SessionId,
        kind: RecordingKind,
        data: &[u8],
    ) -> Result<ChunkRef> {
        self.recordings.append_chunk(session_id, kind, data).await
    }

    /// Stop the `kind` recording. Repeated calls are no-ops.
    pub async fn stop_recording(&self, session_id: &SessionId, kind: RecordingKind) -> Option<Uuid> {
        let id = self.recordings.stop(session_id, kind).await?;
        self.publish_recording(session_id, id, kind, RecordingStatus::Stopped);
        Some(id)
    }

    fn publish_recording(
        &self,
        session_id: &SessionId,
        recording_id: Uuid,
        kind: RecordingKind,
        status: RecordingStatus,
    ) {
        self.aggregator.publish(
            session_id,
            PushMessage::RecordingStatus(RecordingStatusUpdate {
                recording_id,
                kind,
                status,
            }),
        );
    }

    /// Record a security violation and push it to the reviewer
    pub fn report_violation(
        &self,
        session_id: &SessionId,
        violation_type: &str,
        severity: Severity,
        description: &str,
    ) -> SecurityViolation {
        self.aggregator.touch(session_id);
        let violation = self
            .violations
            .record(session_id, violation_type, severity, description);
        self.aggregator
            .publish(session_id, PushMessage::SecurityViolation(violation.clone()));
        violation
    }

    /// Full snapshot of the session
    #[must_use]
    pub fn snapshot(&self, session_id: &SessionId) -> MonitoringSnapshot {
        self.aggregator.snapshot(session_id, SnapshotOptions::default())
    }

    /// Snapshot with a page of violations
    #[must_use]
    pub fn snapshot_with(&self, session_id: &SessionId, options: SnapshotOptions) -> MonitoringSnapshot {
        self.aggregator.snapshot(session_id, options)
    }

    /// Up to `n` most recent risk records of the session, oldest first
    #[must_use]
    pub fn recent_analyses(&self, session_id: &SessionId, n: usize) -> Vec<AnalysisResult> {
        self.history.recent_for(session_id, n)
    }

    /// Shared risk record history
    #[must_use]
    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    /// Returns true if frames go to a real analysis service
    #[must_use]
    pub fn has_service(&self) -> bool {
        self.analyzer.has_service()
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("analyzer", &self.analyzer)
            .field("aggregator", &self.aggregator)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Monitor`]
pub struct MonitorBuilder {
    history_capacity: usize,
    service: Option<Arc<dyn AnalysisService>>,
    storage: Option<Arc<dyn ChunkStorage>>,
    timeout: Option<Duration>,
}

impl MonitorBuilder {
    /// Defaults: mock analysis, in-memory chunk storage
    #[must_use]
    pub fn new() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            service: None,
            storage: None,
            timeout: None,
        }
    }

    /// Set the history ring capacity
    #[must_use]
    pub const fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Use a real analysis service
    #[must_use]
    pub fn service(mut self, service: Arc<dyn AnalysisService>) -> Self {
        self.service = Some(service);
        self
    }

    /// Set chunk storage
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn ChunkStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Bound each analysis call
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the monitor
    #[must_use]
    pub fn build(self) -> Monitor {
        let registry = Arc::new(SessionRegistry::new());
        let history = Arc::new(HistoryBuffer::new(self.history_capacity));
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryChunkStorage::new()));
        let recordings = Arc::new(RecordingManager::new(storage));
        let violations = Arc::new(ViolationLog::new());

        let mut analyzer = FrameAnalyzer::new(self.service, Arc::clone(&history));
        if let Some(timeout) = self.timeout {
            analyzer = analyzer.with_timeout(timeout);
        }

        let aggregator = MonitoringAggregator::new(
            Arc::clone(&registry),
            Arc::clone(&history),
            Arc::clone(&recordings),
            Arc::clone(&violations),
        );

        Monitor {
            registry,
            history,
            analyzer,
            recordings,
            violations,
            aggregator,
        }
    }
}

impl Default for MonitorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
