//! Live interview integrity monitoring.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use vigil::{Monitor, MonitorConfig, RecordingKind, SessionId, Severity};
//!
//! #[tokio::main]
//! async fn main() -> vigil::Result<()> {
//!     let monitor = Monitor::from_config(&MonitorConfig::default())?;
//!     let session = SessionId::from("interview-42");
//!
//!     // Reviewer side: receive pushes for the session
//!     let mut reviewer = monitor.connect_reviewer(&session);
//!
//!     // Candidate side: frames, recordings, violations
//!     let record = monitor.submit_frame(&session, frame_base64).await;
//!     println!("Fraud risk: {}", record.fraud_risk);
//!
//!     monitor.start_recording(&session, RecordingKind::Screen).await?;
//!     monitor.report_violation(&session, "tab_switch", Severity::Warning, "left the tab");
//!
//!     while let Some(message) = reviewer.recv().await {
//!         println!("{}", message.kind());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `default` - Uses rustls for TLS
//! - `rustls` - Use rustls for TLS (recommended)
//! - `native-tls` - Use system native TLS

#![doc(html_root_url = "https://docs.rs/vigil/0.3.0")]

// Re-export core types
pub use vigil_core::*;

// Re-export the analysis client
pub use vigil_client::{AnalysisClient, AnalysisClientBuilder, RetryConfig};

// Re-export the monitor
pub use vigil_monitor::{
    decode_frame, parse_response, AnalysisConfig, ChunkStorage, FsChunkStorage, HistoryBuffer,
    MemoryChunkStorage, Monitor, MonitorBuilder, MonitorConfig, ParseMethod, ParsedAnalysis,
    ReviewerChannel, SnapshotOptions, StorageBackend, StorageConfig,
};

// Re-export runtime for convenience
pub use serde;
pub use serde_json;
pub use tokio;
