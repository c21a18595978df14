//! Config discovery for the CLI
//!
//! An explicit `--config` path wins. Otherwise the user config at
//! `<config dir>/fundscrub/config.yaml` is used when it exists, and the
//! built-in defaults when it does not.

use anyhow::{anyhow, Context, Result};
use fundscrub_core::CleanerConfig;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.yaml";

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Passed with `--config`; must exist and be valid
    Explicit(PathBuf),
    /// Found in the user config directory; a broken file falls back to defaults
    User(PathBuf),
    Defaults,
}

impl ConfigSource {
    pub fn describe(&self) -> String {
        match self {
            ConfigSource::Explicit(path) => format!("config from {}", path.display()),
            ConfigSource::User(path) => format!("user config from {}", path.display()),
            ConfigSource::Defaults => "default config".to_string(),
        }
    }

    pub fn load(&self) -> Result<CleanerConfig> {
        match self {
            ConfigSource::Explicit(path) => CleanerConfig::load_from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display())),
            ConfigSource::User(path) => Ok(CleanerConfig::load_with_fallback(Some(path.as_path()))),
            ConfigSource::Defaults => Ok(CleanerConfig::default()),
        }
    }
}

pub struct ConfigLocator {
    /// Per-user directory, e.g. ~/.config/fundscrub
    config_dir: PathBuf,
}

impl ConfigLocator {
    /// Locator rooted at the platform config directory
    pub fn new() -> Result<Self> {
        let base = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine the user config directory"))?;
        Ok(Self::with_dir(base.join("fundscrub")))
    }

    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    pub fn user_config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    pub fn resolve(&self, explicit: Option<&Path>) -> ConfigSource {
        if let Some(path) = explicit {
            return ConfigSource::Explicit(path.to_path_buf());
        }
        let user = self.user_config_path();
        if user.is_file() {
            ConfigSource::User(user)
        } else {
            ConfigSource::Defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fundscrub_locator_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_explicit_path_wins() {
        let locator = ConfigLocator::with_dir(scratch_dir("explicit"));
        let source = locator.resolve(Some(Path::new("custom.yaml")));
        assert_eq!(source, ConfigSource::Explicit(PathBuf::from("custom.yaml")));
    }

    #[test]
    fn test_missing_user_config_uses_defaults() {
        let locator = ConfigLocator::with_dir(scratch_dir("empty").join("nothing_here"));
        assert_eq!(locator.resolve(None), ConfigSource::Defaults);
        assert_eq!(locator.resolve(None).load().unwrap().service.model, "deepseek-chat");
    }

    #[test]
    fn test_user_config_is_discovered() {
        let dir = scratch_dir("user");
        std::fs::write(dir.join(CONFIG_FILE), "service:\n  model: local-model\n").unwrap();

        let locator = ConfigLocator::with_dir(dir.clone());
        let source = locator.resolve(None);
        assert_eq!(source, ConfigSource::User(dir.join(CONFIG_FILE)));
        assert_eq!(source.load().unwrap().service.model, "local-model");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_broken_explicit_config_is_an_error() {
        let dir = scratch_dir("broken");
        let path = dir.join("bad.yaml");
        std::fs::write(&path, "cleaning:\n  max_concurrent_chunks: 0\n").unwrap();

        assert!(ConfigSource::Explicit(path.clone()).load().is_err());
        // the same file found implicitly only warns
        assert_eq!(
            ConfigSource::User(path).load().unwrap().cleaning.max_concurrent_chunks,
            1
        );

        std::fs::remove_dir_all(&dir).ok();
    }
}
