//! Core types and errors for the vigil interview integrity monitor.
//!
//! This crate provides the foundational types shared by every vigil crate:
//!
//! - **Types**: risk records, recordings, security violations, monitoring
//!   snapshots and the messages pushed to a live reviewer
//! - **Service**: the [`AnalysisService`] seam to the external behavioral
//!   analysis capability
//! - **Errors**: the [`VigilError`] taxonomy and its [`Result`] alias
//!
//! # Example
//!
//! ```rust,ignore
//! use vigil_core::{AnalysisResult, Provenance, RiskBand};
//!
//! fn needs_attention(record: &AnalysisResult) -> bool {
//!     record.provenance == Provenance::Normal && record.fraud_risk == RiskBand::High
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/vigil-core/0.3.0")]

mod error;
mod service;
pub mod types;

pub use error::{Result, VigilError};
pub use service::AnalysisService;
pub use types::*;
