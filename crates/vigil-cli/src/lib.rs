//! # vigil-cli
//!
//! Command-line tools for the vigil interview integrity monitor.
//!
//! ## Features
//!
//! - **Frame analysis**: run one image through the analysis service (or
//!   the mock analyzer when no key is configured)
//! - **Offline parsing**: replay a saved raw model answer through the
//!   parsing chain
//! - **Multiple output formats**: pretty, JSON, YAML

pub mod cli;
pub mod config;
pub mod output;

pub use cli::run;
