//! HTTP client for the external behavioral analysis service.
//!
//! This crate provides [`AnalysisClient`], a `generateContent`-style vision
//! model client that implements [`vigil_core::AnalysisService`].

#![doc(html_root_url = "https://docs.rs/vigil-client/0.3.0")]

mod client;
mod config;
mod wire;

pub use client::{AnalysisClient, AnalysisClientBuilder};
pub use config::*;
pub use vigil_core::{Result, VigilError};
pub use wire::sniff_mime;
