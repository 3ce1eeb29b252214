//! Configuration for the add-on subsystem.
//!
//! Handles loading and parsing the `addons.cfg` settings file.

mod storage;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub use storage::{AddonConfigEntry, AddonConfigStore, AddonStorage, SharedAddonConfig};

use crate::logging::LogConfig;

/// Catalog location used when none is configured.
pub const DEFAULT_REPOSITORY_URL: &str =
    "https://raw.githubusercontent.com/SuperTux/addons/master/index.nfo";

/// Default settings file content with all keys documented.
const DEFAULT_CONFIG: &str = r#"# SuperTux Add-on Configuration File
# ===================================
# This file is read when the add-on manager starts.
# Lines starting with '#' are comments.
#
# Add-ons
# -------
# Directory holding installed add-on archives (default: ~/.supertux2/addons)
# addon_dir = ~/.supertux2/addons
#
# Remote catalog. Leave empty to disable online features.
# repository_url = https://raw.githubusercontent.com/SuperTux/addons/master/index.nfo

# Logging Configuration
# ---------------------
# Logs are stored in ~/.supertux2/logs/ with automatic cleanup.
#
# log_enabled = true       # Enable/disable file logging (true/false)
# log_level = info         # Log level: trace, debug, info, warn, error, off
# log_retention = 24       # Hours to keep log files (default: 24)

# Installed add-ons
# -----------------
# Maintained automatically: addon.<id> = enabled|disabled
"#;

/// Returns the per-user data directory (~/.supertux2).
#[must_use]
pub fn user_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".supertux2")
}

/// Add-on subsystem settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory holding installed add-ons.
    pub addon_dir: PathBuf,
    /// Remote catalog URL; empty disables online features.
    pub repository_url: String,
    /// Logging configuration.
    pub log_config: LogConfig,
    /// Path to the settings file.
    pub config_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            addon_dir: user_data_dir().join("addons"),
            repository_url: DEFAULT_REPOSITORY_URL.to_string(),
            log_config: LogConfig::default(),
            config_path: Self::default_config_path(),
        }
    }
}

impl Settings {
    /// Returns the default settings file path (~/.supertux2/addons.cfg).
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        user_data_dir().join("addons.cfg")
    }

    /// Loads settings from the default path, creating it if it doesn't exist.
    ///
    /// # Errors
    /// Returns error if the file cannot be created or read.
    pub fn load() -> io::Result<Self> {
        Self::load_from(&Self::default_config_path())
    }

    /// Loads settings from a specific path, creating it if it doesn't exist.
    ///
    /// # Errors
    /// Returns error if the file cannot be created or read.
    pub fn load_from(path: &Path) -> io::Result<Self> {
        if !path.exists() {
            Self::create_default_config(path)?;
        }

        let content = fs::read_to_string(path)?;
        let mut settings = Self {
            config_path: path.to_path_buf(),
            ..Self::default()
        };
        settings.parse(&content);
        Ok(settings)
    }

    /// Store for add-on enable state backed by the same file.
    #[must_use]
    pub fn addon_storage(&self) -> AddonStorage {
        AddonStorage::new(self.config_path.clone())
    }

    /// Whether a remote catalog is configured.
    #[must_use]
    pub fn has_repository(&self) -> bool {
        !self.repository_url.is_empty()
    }

    fn create_default_config(path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_CONFIG.as_bytes())?;
        Ok(())
    }

    fn parse(&mut self, content: &str) {
        for line in content.lines() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim();

                // Remove inline comments
                let value = value.split('#').next().unwrap_or(value).trim();

                self.apply_setting(key, value);
            }
        }
    }

    fn apply_setting(&mut self, key: &str, value: &str) {
        match key {
            "addon_dir" => {
                if !value.is_empty() {
                    self.addon_dir = expand_home(value);
                }
            }
            "repository_url" => {
                self.repository_url = value.to_string();
            }
            "log_level" => {
                self.log_config.level = LogConfig::parse_level(value);
            }
            "log_retention" | "log_retention_hours" => {
                self.log_config.retention_hours = LogConfig::parse_retention(value);
            }
            "log_enabled" | "logging" => {
                self.log_config.enabled =
                    matches!(value.to_lowercase().as_str(), "true" | "yes" | "1" | "on");
            }
            // addon.<id> lines belong to AddonStorage
            _ => {}
        }
    }
}

/// Expands a leading `~/` to the home directory.
fn expand_home(value: &str) -> PathBuf {
    match value.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest),
        None => PathBuf::from(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_file_is_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub").join("addons.cfg");

        let settings = Settings::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(settings.repository_url, DEFAULT_REPOSITORY_URL);
        assert!(settings.has_repository());
        assert!(settings.log_config.enabled);
        assert_eq!(settings.config_path, path);
    }

    #[test]
    fn test_parse_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("addons.cfg");
        fs::write(
            &path,
            "addon_dir = /tmp/st-addons   # custom\n\
             repository_url =\n\
             log_level = WARNING\n\
             log_retention = 72\n\
             log_enabled = no\n\
             addon.forest = enabled\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.addon_dir, PathBuf::from("/tmp/st-addons"));
        assert!(!settings.has_repository());
        assert_eq!(settings.log_config.level, tracing::level_filters::LevelFilter::WARN);
        assert_eq!(settings.log_config.retention_hours, 72);
        assert!(!settings.log_config.enabled);
        assert_eq!(settings.addon_storage().load().len(), 1);
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        assert!(expand_home("~/addons").ends_with("addons"));
    }
}
