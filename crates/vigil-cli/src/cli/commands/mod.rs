//! Command implementations.

pub mod analyze;
pub mod config;
pub mod parse;

use vigil::{MonitorConfig, StorageBackend};

use crate::config::Config;
use crate::output::OutputFormat;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Analysis service API key
    pub api_key: Option<String>,

    /// Output format
    pub output_format: OutputFormat,

    /// Loaded CLI configuration
    pub config: Config,
}

impl Context {
    /// Monitor settings for a one-shot CLI run: chunks stay in memory.
    pub fn monitor_config(&self) -> MonitorConfig {
        let mut monitor = MonitorConfig::default();
        monitor.storage.backend = StorageBackend::Memory;
        monitor.analysis.api_key.clone_from(&self.api_key);
        monitor.analysis.model.clone_from(&self.config.model);
        monitor.analysis.base_url.clone_from(&self.config.base_url);
        if let Some(secs) = self.config.timeout_secs {
            monitor.analysis.timeout_secs = secs;
        }
        monitor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_config_carries_overrides() {
        let ctx = Context {
            api_key: Some("key".into()),
            output_format: OutputFormat::Json,
            config: Config {
                model: Some("m".into()),
                timeout_secs: Some(5),
                ..Config::default()
            },
        };
        let monitor = ctx.monitor_config();
        assert_eq!(monitor.storage.backend, StorageBackend::Memory);
        assert_eq!(monitor.analysis.api_key.as_deref(), Some("key"));
        assert_eq!(monitor.analysis.model.as_deref(), Some("m"));
        assert_eq!(monitor.analysis.timeout_secs, 5);
    }
}
