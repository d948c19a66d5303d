//! Durable chunk storage collaborators.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;
use vigil_core::{RecordingKind, Result, SessionId, VigilError};

/// Blob storage for uploaded recording chunks.
///
/// Returns an opaque location string for the stored bytes.
#[async_trait]
pub trait ChunkStorage: Send + Sync {
    /// Persist one chunk
    async fn put(&self, session_id: &SessionId, kind: RecordingKind, bytes: &[u8])
        -> Result<String>;
}

/// In-process storage, mainly for tests and demos
#[derive(Debug, Default)]
pub struct MemoryChunkStorage {
    chunks: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryChunkStorage {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes stored at `location`
    #[must_use]
    pub fn get(&self, location: &str) -> Option<Vec<u8>> {
        self.chunks
            .lock()
            .iter()
            .find(|(loc, _)| loc == location)
            .map(|(_, bytes)| bytes.clone())
    }

    /// Number of stored chunks
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.lock().len()
    }

    /// Returns true if nothing was stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ChunkStorage for MemoryChunkStorage {
    async fn put(
        &self,
        session_id: &SessionId,
        kind: RecordingKind,
        bytes: &[u8],
    ) -> Result<String> {
        let location = format!("mem://{session_id}/{kind}/{}", Uuid::new_v4());
        self.chunks.lock().push((location.clone(), bytes.to_vec()));
        Ok(location)
    }
}

/// Stores chunks as files under `root/<session>/<kind>/<uuid>.chunk`
#[derive(Debug, Clone)]
pub struct FsChunkStorage {
    root: PathBuf,
}

impl FsChunkStorage {
    /// Store chunks below `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Storage root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn directory_for(&self, session_id: &SessionId, kind: RecordingKind) -> Result<PathBuf> {
        let session = session_id.as_str();
        if session.is_empty()
            || session
                .chars()
                .any(|c| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        {
            return Err(VigilError::Storage(format!(
                "session id not usable as a path component: {session:?}"
            )));
        }
        Ok(self.root.join(session).join(kind.to_string()))
    }
}

#[async_trait]
impl ChunkStorage for FsChunkStorage {
    async fn put(
        &self,
        session_id: &SessionId,
        kind: RecordingKind,
        bytes: &[u8],
    ) -> Result<String> {
        let dir = self.directory_for(session_id, kind)?;
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            VigilError::Storage(format!("failed to create {}: {e}", dir.display()))
        })?;

        let path = dir.join(format!("{}.chunk", Uuid::new_v4()));
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            VigilError::Storage(format!("failed to write {}: {e}", path.display()))
        })?;

        debug!(path = %path.display(), bytes = bytes.len(), "chunk stored");
        Ok(path.display().to_string())
    }
}
