//! Recording manager: start/stop and chunk bookkeeping per capture kind.
//!
//! Each (session, kind) pair owns an async upload lane. Starting, stopping
//! and appending take the lane, so chunk sequence numbers follow arrival
//! order even though the storage write suspends. Recording state sits
//! behind a separate short-lived lock, which lets status reads proceed
//! while an upload is in flight.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info};
use uuid::Uuid;
use vigil_core::{
    ChunkRef, Recording, RecordingKind, RecordingStatus, Result, SessionId, VigilError,
};

use crate::shard::ShardedMap;
use crate::storage::ChunkStorage;

#[derive(Default)]
struct Slot {
    lane: tokio::sync::Mutex<()>,
    current: Mutex<Option<Recording>>,
}

#[derive(Default)]
struct SessionRecordings {
    webcam: Slot,
    screen: Slot,
    audio: Slot,
}

impl SessionRecordings {
    const fn slot(&self, kind: RecordingKind) -> &Slot {
        match kind {
            RecordingKind::Webcam => &self.webcam,
            RecordingKind::Screen => &self.screen,
            RecordingKind::Audio => &self.audio,
        }
    }
}

/// Tracks webcam/screen/audio recordings of every session
pub struct RecordingManager {
    sessions: ShardedMap<SessionId, Arc<SessionRecordings>>,
    storage: Arc<dyn ChunkStorage>,
}

impl RecordingManager {
    /// Create a manager persisting chunks through `storage`
    #[must_use]
    pub fn new(storage: Arc<dyn ChunkStorage>) -> Self {
        Self {
            sessions: ShardedMap::new(),
            storage,
        }
    }

    fn session(&self, session_id: &SessionId) -> Arc<SessionRecordings> {
        if let Some(existing) = self.sessions.shard(session_id).read().get(session_id) {
            return Arc::clone(existing);
        }
        Arc::clone(
            self.sessions
                .shard(session_id)
                .write()
                .entry(session_id.clone())
                .or_default(),
        )
    }

    fn existing(&self, session_id: &SessionId) -> Option<Arc<SessionRecordings>> {
        self.sessions
            .shard(session_id)
            .read()
            .get(session_id)
            .map(Arc::clone)
    }

    /// Start a new recording; fails if one of this kind is running
    pub async fn start(&self, session_id: &SessionId, kind: RecordingKind) -> Result<Uuid> {
        let session = self.session(session_id);
        let slot = session.slot(kind);
        let _lane = slot.lane.lock().await;

        let mut current = slot.current.lock();
        if current.as_ref().is_some_and(|r| r.status.is_active()) {
            return Err(VigilError::AlreadyRecording {
                session: session_id.clone(),
                kind,
            });
        }

        let recording = Recording::start(session_id.clone(), kind);
        let id = recording.id;
        *current = Some(recording);
        drop(current);

        info!(session = %session_id, kind = %kind, recording = %id, "recording started");
        Ok(id)
    }

    /// Persist one chunk of the active recording and record its location
    pub async fn append_chunk(
        &self,
        session_id: &SessionId,
        kind: RecordingKind,
        data: &[u8],
    ) -> Result<ChunkRef> {
        let not_recording = || VigilError::NotRecording {
            session: session_id.clone(),
            kind,
        };

        let session = self.existing(session_id).ok_or_else(not_recording)?;
        let slot = session.slot(kind);
        let _lane = slot.lane.lock().await;

        let sequence = match slot.current.lock().as_ref() {
            Some(rec) if rec.status.is_active() => rec.next_sequence(),
            _ => return Err(not_recording()),
        };

        let location = self.storage.put(session_id, kind, data).await?;

        let chunk = ChunkRef {
            sequence,
            location,
            size: data.len(),
            stored_at: Utc::now(),
        };

        // The lane is held, so the recording cannot have changed meanwhile.
        let mut current = slot.current.lock();
        let recording = current.as_mut().ok_or_else(not_recording)?;
        recording.chunks.push(chunk.clone());
        drop(current);

        debug!(session = %session_id, kind = %kind, sequence, bytes = data.len(), "chunk appended");
        Ok(chunk)
    }

    /// Stop the recording. Returns its id if this call stopped it.
    pub async fn stop(&self, session_id: &SessionId, kind: RecordingKind) -> Option<Uuid> {
        let session = self.existing(session_id)?;
        let slot = session.slot(kind);
        let _lane = slot.lane.lock().await;

        let mut current = slot.current.lock();
        let recording = current.as_mut().filter(|r| r.status.is_active())?;
        recording.status = RecordingStatus::Stopped;
        recording.stopped_at = Some(Utc::now());
        let id = recording.id;
        let chunks = recording.chunks.len();
        drop(current);

        info!(session = %session_id, kind = %kind, recording = %id, chunks, "recording stopped");
        Some(id)
    }

    /// Status of the most recent recording of each kind
    #[must_use]
    pub fn status_of(&self, session_id: &SessionId) -> BTreeMap<RecordingKind, RecordingStatus> {
        self.recordings_of(session_id)
            .into_iter()
            .map(|(kind, rec)| (kind, rec.status))
            .collect()
    }

    /// Most recent recording of each kind
    #[must_use]
    pub fn recordings_of(&self, session_id: &SessionId) -> BTreeMap<RecordingKind, Recording> {
        let Some(session) = self.existing(session_id) else {
            return BTreeMap::new();
        };
        RecordingKind::ALL
            .into_iter()
            .filter_map(|kind| {
                session
                    .slot(kind)
                    .current
                    .lock()
                    .clone()
                    .map(|rec| (kind, rec))
            })
            .collect()
    }

    /// Most recent recording of one kind
    #[must_use]
    pub fn recording(&self, session_id: &SessionId, kind: RecordingKind) -> Option<Recording> {
        self.existing(session_id)?.slot(kind).current.lock().clone()
    }
}

impl std::fmt::Debug for RecordingManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingManager")
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryChunkStorage;
    use async_trait::async_trait;

    fn manager() -> (RecordingManager, Arc<MemoryChunkStorage>) {
        let storage = Arc::new(MemoryChunkStorage::new());
        (RecordingManager::new(storage.clone()), storage)
    }

    struct BrokenStorage;

    #[async_trait]
    impl ChunkStorage for BrokenStorage {
        async fn put(&self, _: &SessionId, _: RecordingKind, _: &[u8]) -> Result<String> {
            Err(VigilError::Storage("disk full".into()))
        }
    }

    #[tokio::test]
    async fn test_double_start_conflicts() {
        let (manager, _) = manager();
        let session = SessionId::from("s");
        manager.start(&session, RecordingKind::Webcam).await.unwrap();

        let err = manager
            .start(&session, RecordingKind::Webcam)
            .await
            .unwrap_err();
        assert!(matches!(err, VigilError::AlreadyRecording { kind: RecordingKind::Webcam, .. }));

        // Other kinds are independent.
        manager.start(&session, RecordingKind::Screen).await.unwrap();
    }

    #[tokio::test]
    async fn test_append_without_recording_fails() {
        let (manager, storage) = manager();
        let session = SessionId::from("s");
        let err = manager
            .append_chunk(&session, RecordingKind::Audio, b"x")
            .await
            .unwrap_err();
        assert!(matches!(err, VigilError::NotRecording { .. }));

        manager.start(&session, RecordingKind::Webcam).await.unwrap();
        let err = manager
            .append_chunk(&session, RecordingKind::Audio, b"x")
            .await
            .unwrap_err();
        assert!(matches!(err, VigilError::NotRecording { kind: RecordingKind::Audio, .. }));
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_sequences_are_one_two_three() {
        let (manager, storage) = manager();
        let session = SessionId::from("s");
        manager.start(&session, RecordingKind::Screen).await.unwrap();

        let mut sequences = Vec::new();
        for chunk in [b"one".as_slice(), b"two".as_slice(), b"three".as_slice()] {
            let stored = manager
                .append_chunk(&session, RecordingKind::Screen, chunk)
                .await
                .unwrap();
            assert_eq!(storage.get(&stored.location).as_deref(), Some(chunk));
            sequences.push(stored.sequence);
        }
        assert_eq!(sequences, vec![1, 2, 3]);

        let recording = manager.recording(&session, RecordingKind::Screen).unwrap();
        assert_eq!(recording.chunks.len(), 3);
        assert_eq!(recording.total_bytes(), 11);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_blocks_appends() {
        let (manager, _) = manager();
        let session = SessionId::from("s");
        let id = manager.start(&session, RecordingKind::Audio).await.unwrap();

        assert_eq!(manager.stop(&session, RecordingKind::Audio).await, Some(id));
        assert_eq!(manager.stop(&session, RecordingKind::Audio).await, None);
        assert_eq!(manager.stop(&SessionId::from("other"), RecordingKind::Audio).await, None);

        let err = manager
            .append_chunk(&session, RecordingKind::Audio, b"late")
            .await
            .unwrap_err();
        assert!(matches!(err, VigilError::NotRecording { .. }));
        assert_eq!(
            manager.status_of(&session).get(&RecordingKind::Audio),
            Some(&RecordingStatus::Stopped)
        );
    }

    #[tokio::test]
    async fn test_restart_creates_fresh_recording() {
        let (manager, _) = manager();
        let session = SessionId::from("s");
        let first = manager.start(&session, RecordingKind::Webcam).await.unwrap();
        manager
            .append_chunk(&session, RecordingKind::Webcam, b"a")
            .await
            .unwrap();
        manager.stop(&session, RecordingKind::Webcam).await;

        let second = manager.start(&session, RecordingKind::Webcam).await.unwrap();
        assert_ne!(first, second);
        let chunk = manager
            .append_chunk(&session, RecordingKind::Webcam, b"b")
            .await
            .unwrap();
        assert_eq!(chunk.sequence, 1);
    }

    #[tokio::test]
    async fn test_storage_failure_keeps_sequence() {
        let manager = RecordingManager::new(Arc::new(BrokenStorage));
        let session = SessionId::from("s");
        manager.start(&session, RecordingKind::Webcam).await.unwrap();
        let err = manager
            .append_chunk(&session, RecordingKind::Webcam, b"a")
            .await
            .unwrap_err();
        assert!(matches!(err, VigilError::Storage(_)));
        let recording = manager.recording(&session, RecordingKind::Webcam).unwrap();
        assert_eq!(recording.next_sequence(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_uploads_get_unique_sequences() {
        let (manager, _) = manager();
        let manager = Arc::new(manager);
        let session = SessionId::from("s");
        manager.start(&session, RecordingKind::Screen).await.unwrap();

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let manager = Arc::clone(&manager);
                let session = session.clone();
                tokio::spawn(async move {
                    manager
                        .append_chunk(&session, RecordingKind::Screen, b"c")
                        .await
                        .unwrap()
                        .sequence
                })
            })
            .collect();

        let mut sequences = Vec::new();
        for task in tasks {
            sequences.push(task.await.unwrap());
        }
        sequences.sort_unstable();
        assert_eq!(sequences, (1..=20).collect::<Vec<u64>>());

        let recording = manager.recording(&session, RecordingKind::Screen).unwrap();
        let stored: Vec<u64> = recording.chunks.iter().map(|c| c.sequence).collect();
        assert_eq!(stored, (1..=20).collect::<Vec<u64>>());
    }
}
