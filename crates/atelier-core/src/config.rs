use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AtelierError, Result};

/// Top-level configuration for the Atelier client core.
///
/// Loaded from `~/.atelier/config.toml` by default. Each section corresponds
/// to one subsystem or cross-cutting concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtelierConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl AtelierConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AtelierConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AtelierError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the SQLite file, local cache, and image assets.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.atelier/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Durable storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database filename inside the data directory.
    pub database_file: String,
    /// Local key-value cache key mirroring the in-memory fallback store.
    pub fallback_cache_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_file: "atelier.db".to_string(),
            fallback_cache_key: "session-history-local-cache".to_string(),
        }
    }
}

/// Session lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Debounce window for background persists, in milliseconds.
    pub save_debounce_ms: u64,
    /// Title given to freshly created sessions and blank renames.
    pub default_title: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            save_debounce_ms: 1500,
            default_title: "New Conversation".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AtelierConfig::default();
        assert_eq!(config.general.data_dir, "~/.atelier/data");
        assert_eq!(config.storage.database_file, "atelier.db");
        assert_eq!(config.session.save_debounce_ms, 1500);
        assert_eq!(config.session.default_title, "New Conversation");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = AtelierConfig::default();
        config.session.save_debounce_ms = 250;
        config.general.log_level = "debug".to_string();
        config.save(&path).unwrap();

        let loaded = AtelierConfig::load(&path).unwrap();
        assert_eq!(loaded.session.save_debounce_ms, 250);
        assert_eq!(loaded.general.log_level, "debug");
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AtelierConfig::load_or_default(&dir.path().join("nope.toml"));
        assert_eq!(config.session.default_title, "New Conversation");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[session]\nsave_debounce_ms = 10\n").unwrap();

        let config = AtelierConfig::load(&path).unwrap();
        assert_eq!(config.session.save_debounce_ms, 10);
        assert_eq!(config.session.default_title, "New Conversation");
        assert_eq!(config.storage.database_file, "atelier.db");
    }
}
