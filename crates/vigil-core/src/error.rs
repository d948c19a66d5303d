use thiserror::Error;

use crate::types::{RecordingKind, SessionId};

/// Result type alias for vigil operations
pub type Result<T> = std::result::Result<T, VigilError>;

/// Errors that can occur while monitoring a session
#[derive(Error, Debug)]
pub enum VigilError {
    /// A recording of this kind is already running for the session
    #[error("already recording {kind} for session {session}")]
    AlreadyRecording {
        /// Session that owns the recording
        session: SessionId,
        /// Capture kind
        kind: RecordingKind,
    },

    /// No active recording of this kind exists for the session
    #[error("not recording {kind} for session {session}")]
    NotRecording {
        /// Session that was addressed
        session: SessionId,
        /// Capture kind
        kind: RecordingKind,
    },

    /// The analysis service rejected the credentials
    #[error("authentication failed: invalid analysis API key")]
    Unauthorized,

    /// Rate limit exceeded on the analysis service
    #[error("rate limit exceeded, retry after {retry_after:?} seconds")]
    RateLimited {
        /// Seconds to wait before retrying
        retry_after: Option<u64>,
    },

    /// The analysis service returned an error response
    #[error("API error ({code}): {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Error message from the API
        message: String,
    },

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Request timed out
    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    /// The analysis service answered without any text
    #[error("analysis service returned an empty response")]
    EmptyResponse,

    /// Frame payload could not be decoded
    #[error("frame decode failed: {0}")]
    Decode(String),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Chunk storage failed
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration is invalid or incomplete
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl VigilError {
    /// Timeout for an elapsed `limit`, in whole seconds rounded up so a
    /// sub-second limit never reports zero.
    #[must_use]
    pub fn timeout(limit: std::time::Duration) -> Self {
        Self::Timeout(limit.as_secs() + u64::from(limit.subsec_nanos() > 0))
    }

    /// Returns true if the error is retryable
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Http(_) => true,
            Self::Api { code, .. } => *code >= 500,
            _ => false,
        }
    }

    /// Returns true if the error reports a recording state conflict
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::AlreadyRecording { .. } | Self::NotRecording { .. })
    }

    /// Returns the HTTP status code if this is an API error
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::RateLimited { .. } => Some(429),
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}
