//! Live interview integrity monitoring.
//!
//! [`Monitor`] ties together the pieces of a monitored session:
//!
//! - [`FrameAnalyzer`] turns webcam frames into normalized risk records,
//!   using an external [`AnalysisService`](vigil_core::AnalysisService) or
//!   a fixed mock when none is configured
//! - [`HistoryBuffer`] keeps the most recent records in a bounded ring
//! - [`SessionRegistry`] holds at most one reviewer channel per session
//! - [`RecordingManager`] tracks webcam/screen/audio recordings and their
//!   chunks
//! - [`ViolationLog`] records security events reported by the client
//! - [`MonitoringAggregator`] answers snapshot queries and pushes updates
//!
//! # Example
//!
//! ```no_run
//! use vigil_core::{SessionId, Severity};
//! use vigil_monitor::Monitor;
//!
//! # async fn run() {
//! let monitor = Monitor::builder().build();
//! let session = SessionId::from("interview-42");
//!
//! let mut reviewer = monitor.connect_reviewer(&session);
//! monitor.report_violation(&session, "tab_switch", Severity::Warning, "left the tab");
//!
//! let pushed = reviewer.recv().await;
//! assert!(pushed.is_some());
//! # }
//! ```

pub mod aggregator;
pub mod analyzer;
pub mod config;
pub mod history;
mod monitor;
pub mod recording;
pub mod registry;
mod shard;
pub mod storage;
pub mod violations;

pub use aggregator::{MonitoringAggregator, SnapshotOptions};
pub use analyzer::{decode_frame, parse_response, FrameAnalyzer, ParseMethod, ParsedAnalysis};
pub use config::{AnalysisConfig, MonitorConfig, StorageBackend, StorageConfig};
pub use history::HistoryBuffer;
pub use monitor::{Monitor, MonitorBuilder};
pub use recording::RecordingManager;
pub use registry::{ReviewerChannel, SessionRegistry};
pub use storage::{ChunkStorage, FsChunkStorage, MemoryChunkStorage};
pub use violations::ViolationLog;
