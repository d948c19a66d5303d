//! Monitor configuration, loaded from TOML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vigil_client::{AnalysisClient, RetryConfig};
use vigil_core::{Result, VigilError};

use crate::history::DEFAULT_HISTORY_CAPACITY;

/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV: &str = "VIGIL_ANALYSIS_API_KEY";

/// Top-level monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Risk records kept in the shared history ring
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// External analysis service
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Recording chunk storage
    #[serde(default)]
    pub storage: StorageConfig,
}

/// External analysis service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Set to false to force mock mode
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// API key (falls back to `VIGIL_ANALYSIS_API_KEY`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Override the service base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Override the model name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Outgoing request cap (0 = unlimited)
    #[serde(default)]
    pub requests_per_second: u32,

    /// Retries for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// Where recording chunks go
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Files below `storage.root`
    #[default]
    Filesystem,
    /// Process memory (lost on exit)
    Memory,
}

/// Chunk storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend kind
    #[serde(default)]
    pub backend: StorageBackend,

    /// Root directory for the filesystem backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            analysis: AnalysisConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: None,
            model: None,
            timeout_secs: default_timeout_secs(),
            requests_per_second: 0,
            max_retries: default_max_retries(),
        }
    }
}

impl MonitorConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| VigilError::Config(e.to_string()))
    }
}

impl AnalysisConfig {
    /// Configured key, else the environment variable. Blank keys count as absent.
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        pick_key(self.api_key.clone(), std::env::var(API_KEY_ENV).ok())
    }

    /// Per-call timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build the analysis client, or `None` when the service is unavailable
    pub fn client(&self) -> Result<Option<AnalysisClient>> {
        if !self.enabled {
            return Ok(None);
        }
        let Some(key) = self.api_key() else {
            return Ok(None);
        };
        self.client_with_key(key).map(Some)
    }

    fn client_with_key(&self, key: String) -> Result<AnalysisClient> {
        let mut builder = AnalysisClient::builder(key)
            .timeout(self.timeout())
            .retry(RetryConfig::new().max_retries(self.max_retries))
            .requests_per_second(self.requests_per_second);
        if let Some(url) = &self.base_url {
            builder = builder.base_url(url);
        }
        if let Some(model) = &self.model {
            builder = builder.model(model);
        }
        builder.build()
    }
}

impl StorageConfig {
    /// Chunk directory, defaulting to the platform data dir
    #[must_use]
    pub fn root(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map_or_else(|| PathBuf::from("vigil-data"), |dir| dir.join("vigil"))
                .join("chunks")
        })
    }
}

fn pick_key(configured: Option<String>, env: Option<String>) -> Option<String> {
    configured
        .filter(|k| !k.trim().is_empty())
        .or_else(|| env.filter(|k| !k.trim().is_empty()))
}

const fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

const fn default_true() -> bool {
    true
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_max_retries() -> u32 {
    2
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert_eq!(config.history_capacity, 1000);
        assert!(config.analysis.enabled);
        assert_eq!(config.analysis.timeout_secs, 30);
        assert_eq!(config.storage.backend, StorageBackend::Filesystem);
        assert!(config.storage.root().ends_with("chunks"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = MonitorConfig::from_toml(
            r#"
            history_capacity = 50

            [analysis]
            model = "gemini-1.5-pro"

            [storage]
            backend = "memory"
            "#,
        )
        .unwrap();
        assert_eq!(config.history_capacity, 50);
        assert_eq!(config.analysis.model.as_deref(), Some("gemini-1.5-pro"));
        assert_eq!(config.analysis.max_retries, 2);
        assert!(config.analysis.enabled);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = MonitorConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.history_capacity, 1000);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[storage]\nroot = \"/srv/vigil\"").unwrap();
        let config = MonitorConfig::load(file.path()).unwrap();
        assert_eq!(config.storage.root(), PathBuf::from("/srv/vigil"));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = MonitorConfig::from_toml("history_capacity = \"lots\"").unwrap_err();
        assert!(matches!(err, VigilError::Config(_)));
    }

    #[test]
    fn test_key_precedence() {
        assert_eq!(
            pick_key(Some("file".into()), Some("env".into())).as_deref(),
            Some("file")
        );
        assert_eq!(pick_key(Some("  ".into()), Some("env".into())).as_deref(), Some("env"));
        assert_eq!(pick_key(None, Some(String::new())), None);
        assert_eq!(pick_key(None, None), None);
    }

    #[test]
    fn test_disabled_service_builds_no_client() {
        let analysis = AnalysisConfig {
            enabled: false,
            api_key: Some("key".into()),
            ..AnalysisConfig::default()
        };
        assert!(analysis.client().unwrap().is_none());
    }

    #[test]
    fn test_client_uses_overrides() {
        let analysis = AnalysisConfig {
            model: Some("custom-model".into()),
            ..AnalysisConfig::default()
        };
        let client = analysis.client_with_key("key".into()).unwrap();
        assert_eq!(client.model(), "custom-model");
    }
}
