use crate::error::{CleanError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

// Default value functions for serde
fn default_base_url() -> String {
    "https://api.deepseek.com/v1".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_api_key_env() -> String {
    "DEEPSEEK_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_delimiter() -> String {
    ">>>".to_string()
}

fn default_anchor_prefix() -> String {
    "<".to_string()
}

fn default_failure_marker() -> String {
    "[chunk {index} cleaning failed]".to_string()
}

fn default_max_concurrent_chunks() -> usize {
    1
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanerConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub document: DocumentConfig,
    #[serde(default)]
    pub cleaning: CleaningConfig,
}

/// OpenAI-compatible chat completions endpoint used for the rewriting step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL; `/chat/completions` is appended
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Sampling temperature; 0 keeps the rewrite as deterministic as the service allows
    #[serde(default)]
    pub temperature: f32,
    /// Per-request timeout. A timeout is reported like any other network failure.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            temperature: 0.0,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Token separating per-screenshot chunks
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// First/last lines starting with this prefix are anchors
    #[serde(default = "default_anchor_prefix")]
    pub anchor_prefix: String,
    /// Replaces a chunk whose cleaning failed; `{index}` is the 1-based chunk number
    #[serde(default = "default_failure_marker")]
    pub failure_marker: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            anchor_prefix: default_anchor_prefix(),
            failure_marker: default_failure_marker(),
        }
    }
}

impl DocumentConfig {
    pub fn failure_marker_for(&self, index: usize) -> String {
        self.failure_marker.replace("{index}", &index.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// 1 = strictly sequential
    #[serde(default = "default_max_concurrent_chunks")]
    pub max_concurrent_chunks: usize,
    /// Additional whole-line noise regexes, matched against the trimmed line
    #[serde(default)]
    pub extra_noise_patterns: Vec<String>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            max_concurrent_chunks: default_max_concurrent_chunks(),
            extra_noise_patterns: Vec::new(),
        }
    }
}

impl CleanerConfig {
    /// Load config from a YAML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CleanError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: CleanerConfig = serde_yaml::from_str(&content)
            .map_err(|e| CleanError::Config(format!("cannot parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config with fallback to defaults
    pub fn load_with_fallback(path: Option<&Path>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                tracing::warn!(path = %p.display(), error = %e, "failed to load config, using defaults");
                Self::default()
            }),
            None => Self::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.document.delimiter.trim().is_empty() {
            return Err(CleanError::Config("document.delimiter must not be empty".into()));
        }
        if self.document.anchor_prefix.is_empty() {
            return Err(CleanError::Config(
                "document.anchor_prefix must not be empty".into(),
            ));
        }
        if !self.document.failure_marker.contains("{index}") {
            return Err(CleanError::Config(
                "document.failure_marker must contain {index}".into(),
            ));
        }
        if self.cleaning.max_concurrent_chunks == 0 {
            return Err(CleanError::Config(
                "cleaning.max_concurrent_chunks must be at least 1".into(),
            ));
        }
        if self.service.temperature < 0.0 {
            return Err(CleanError::Config(
                "service.temperature must not be negative".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_service_contract() {
        let config = CleanerConfig::default();
        assert_eq!(config.service.temperature, 0.0);
        assert_eq!(config.service.api_key_env, "DEEPSEEK_API_KEY");
        assert_eq!(config.document.delimiter, ">>>");
        assert_eq!(config.document.anchor_prefix, "<");
        assert_eq!(config.cleaning.max_concurrent_chunks, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "service:\n  model: other-model\ncleaning:\n  max_concurrent_chunks: 4\n";
        let config: CleanerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.service.model, "other-model");
        assert_eq!(config.service.base_url, "https://api.deepseek.com/v1");
        assert_eq!(config.cleaning.max_concurrent_chunks, 4);
        assert_eq!(config.document.delimiter, ">>>");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = CleanerConfig::default();
        config.cleaning.max_concurrent_chunks = 0;
        assert!(config.validate().is_err());

        let mut config = CleanerConfig::default();
        config.document.delimiter = "  ".into();
        assert!(config.validate().is_err());

        let mut config = CleanerConfig::default();
        config.document.failure_marker = "failed".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_failure_marker_names_chunk() {
        let config = DocumentConfig::default();
        assert_eq!(config.failure_marker_for(3), "[chunk 3 cleaning failed]");
    }

    #[test]
    fn test_load_from_file_roundtrip() {
        let path = std::env::temp_dir().join("fundscrub_config_test.yaml");
        std::fs::write(&path, "document:\n  delimiter: \"===\"\n").unwrap();

        let config = CleanerConfig::load_from_file(&path).unwrap();
        assert_eq!(config.document.delimiter, "===");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_with_fallback_on_missing_file() {
        let path = std::env::temp_dir().join("fundscrub_does_not_exist.yaml");
        let config = CleanerConfig::load_with_fallback(Some(path.as_path()));
        assert_eq!(config.service.model, "deepseek-chat");
    }
}
