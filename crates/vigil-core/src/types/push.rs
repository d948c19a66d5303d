use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AnalysisResult, RecordingKind, RecordingStatus, SecurityViolation};

/// Message delivered to a connected reviewer.
///
/// Serialized as `{"type": "...", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PushMessage {
    /// A new risk record for the session
    AnalysisResult(AnalysisResult),

    /// A newly reported security violation
    SecurityViolation(SecurityViolation),

    /// A recording started or stopped
    RecordingStatus(RecordingStatusUpdate),
}

impl PushMessage {
    /// Wire name of the message type
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AnalysisResult(_) => "analysis_result",
            Self::SecurityViolation(_) => "security_violation",
            Self::RecordingStatus(_) => "recording_status",
        }
    }
}

/// Recording state change pushed to the reviewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingStatusUpdate {
    /// Recording id
    pub recording_id: Uuid,

    /// Capture kind
    pub kind: RecordingKind,

    /// New status
    pub status: RecordingStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionId;
    use chrono::Utc;

    #[test]
    fn test_analysis_message_shape() {
        let record = AnalysisResult::mock(SessionId::from("s-1"), Utc::now());
        let msg = PushMessage::AnalysisResult(record);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "analysis_result");
        assert_eq!(json["data"]["session_id"], "s-1");
        assert_eq!(msg.kind(), "analysis_result");
    }

    #[test]
    fn test_recording_message_shape() {
        let msg = PushMessage::RecordingStatus(RecordingStatusUpdate {
            recording_id: Uuid::nil(),
            kind: RecordingKind::Screen,
            status: RecordingStatus::Stopped,
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "recording_status");
        assert_eq!(json["data"]["kind"], "screen");
        assert_eq!(json["data"]["status"], "stopped");
    }
}
