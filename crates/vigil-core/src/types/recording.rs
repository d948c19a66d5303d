use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::SessionId;

/// Capture stream kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingKind {
    /// Candidate webcam
    Webcam,
    /// Shared screen
    Screen,
    /// Microphone
    Audio,
}

impl RecordingKind {
    /// Every capture kind, in display order
    pub const ALL: [Self; 3] = [Self::Webcam, Self::Screen, Self::Audio];
}

impl std::fmt::Display for RecordingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Webcam => write!(f, "webcam"),
            Self::Screen => write!(f, "screen"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

impl std::str::FromStr for RecordingKind {
    type Err = crate::VigilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "webcam" | "camera" => Ok(Self::Webcam),
            "screen" => Ok(Self::Screen),
            "audio" | "mic" => Ok(Self::Audio),
            other => Err(crate::VigilError::Config(format!(
                "unknown recording kind: {other}"
            ))),
        }
    }
}

/// Recording lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingStatus {
    /// Chunks are being accepted
    Recording,
    /// Capture ended
    Stopped,
}

impl RecordingStatus {
    /// Returns true while chunks are accepted
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Recording)
    }
}

impl std::fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Recording => write!(f, "recording"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// A persisted chunk of a recording
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRef {
    /// 1-based arrival order within the recording
    pub sequence: u64,

    /// Opaque location returned by chunk storage
    pub location: String,

    /// Chunk size in bytes
    pub size: usize,

    /// When the chunk was stored
    pub stored_at: DateTime<Utc>,
}

/// One capture stream of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    /// Unique recording id
    pub id: Uuid,

    /// Owning session
    pub session_id: SessionId,

    /// Capture kind
    pub kind: RecordingKind,

    /// Current state
    pub status: RecordingStatus,

    /// When capture started
    pub started_at: DateTime<Utc>,

    /// When capture stopped
    #[serde(default)]
    pub stopped_at: Option<DateTime<Utc>>,

    /// Stored chunks in sequence order
    #[serde(default)]
    pub chunks: Vec<ChunkRef>,
}

impl Recording {
    /// Start a new recording
    #[must_use]
    pub fn start(session_id: SessionId, kind: RecordingKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            kind,
            status: RecordingStatus::Recording,
            started_at: Utc::now(),
            stopped_at: None,
            chunks: Vec::new(),
        }
    }

    /// Sequence number the next chunk will get
    #[must_use]
    pub fn next_sequence(&self) -> u64 {
        self.chunks.last().map_or(1, |c| c.sequence + 1)
    }

    /// Total stored bytes
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.chunks.iter().map(|c| c.size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse_and_display() {
        for kind in RecordingKind::ALL {
            let parsed: RecordingKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("hologram".parse::<RecordingKind>().is_err());
    }

    #[test]
    fn test_next_sequence() {
        let mut rec = Recording::start(SessionId::from("s"), RecordingKind::Webcam);
        assert_eq!(rec.next_sequence(), 1);
        rec.chunks.push(ChunkRef {
            sequence: 1,
            location: "mem://1".into(),
            size: 10,
            stored_at: Utc::now(),
        });
        assert_eq!(rec.next_sequence(), 2);
        assert_eq!(rec.total_bytes(), 10);
    }
}
