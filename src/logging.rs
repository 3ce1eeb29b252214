//! File logging for the add-on subsystem.
//!
//! Logs are written to a timestamped file in ~/.supertux2/logs/ by default.
//! Files older than the retention period are removed at startup.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::user_data_dir;

/// Default log retention in hours.
pub const DEFAULT_LOG_RETENTION_HOURS: u32 = 24;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::INFO;

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log retention period in hours.
    pub retention_hours: u32,
    /// Most verbose level written.
    pub level: LevelFilter,
    /// Whether logging is enabled.
    pub enabled: bool,
    /// Directory the log files go to.
    pub directory: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            retention_hours: DEFAULT_LOG_RETENTION_HOURS,
            level: DEFAULT_LOG_LEVEL,
            enabled: true,
            directory: log_directory(),
        }
    }
}

impl LogConfig {
    /// Parses a level name; unknown names fall back to the default.
    #[must_use]
    pub fn parse_level(value: &str) -> LevelFilter {
        match value.to_lowercase().as_str() {
            "warning" => LevelFilter::WARN,
            "none" | "disabled" => LevelFilter::OFF,
            other => other.parse().unwrap_or(DEFAULT_LOG_LEVEL),
        }
    }

    /// Parses retention hours, falling back to the default.
    #[must_use]
    pub fn parse_retention(value: &str) -> u32 {
        value.parse().unwrap_or(DEFAULT_LOG_RETENTION_HOURS)
    }

    /// Age after which a log file is deleted.
    #[must_use]
    pub fn retention(&self) -> Duration {
        Duration::from_secs(u64::from(self.retention_hours) * 3600)
    }

    fn is_active(&self) -> bool {
        self.enabled && self.level != LevelFilter::OFF
    }
}

/// Returns the default log directory path (~/.supertux2/logs/).
#[must_use]
pub fn log_directory() -> PathBuf {
    user_data_dir().join("logs")
}

/// Returns a fresh log file path inside `dir`.
#[must_use]
pub fn log_path_in(dir: &Path) -> PathBuf {
    let now = chrono::Local::now();
    dir.join(format!("addons_{}.log", now.format("%Y-%m-%d_%H-%M-%S")))
}

/// Deletes `.log` files in `dir` older than the retention period.
///
/// # Errors
/// Returns error if the directory cannot be read.
pub fn cleanup_old_logs(dir: &Path, retention: Duration) -> io::Result<u32> {
    if !dir.exists() {
        return Ok(0);
    }

    let now = SystemTime::now();
    let mut deleted_count = 0;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.extension().and_then(|e| e.to_str()) != Some("log") {
            continue;
        }

        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());
        if let Some(age) = age {
            if age > retention && fs::remove_file(&path).is_ok() {
                deleted_count += 1;
            }
        }
    }

    Ok(deleted_count)
}

/// Initializes the logging system.
///
/// Installs a global subscriber writing to a new file in the configured
/// directory. `RUST_LOG` overrides the configured level.
///
/// # Errors
/// Returns error if the log directory or file cannot be created.
pub fn init(config: &LogConfig) -> io::Result<()> {
    if !config.is_active() {
        return Ok(());
    }

    fs::create_dir_all(&config.directory)?;
    let deleted = cleanup_old_logs(&config.directory, config.retention())?;

    let log_path = log_path_in(&config.directory);
    let log_file = File::create(&log_path)?;

    let filter = EnvFilter::builder()
        .with_default_directive(config.level.into())
        .from_env_lossy();

    let file_layer = fmt::layer()
        .with_writer(log_file.with_max_level(tracing::Level::TRACE))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
        .map_err(io::Error::other)?;

    tracing::info!(
        "Add-on logging to {} at level {}",
        log_path.display(),
        config.level
    );
    if deleted > 0 {
        tracing::debug!("Removed {} expired log file(s)", deleted);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.retention_hours, DEFAULT_LOG_RETENTION_HOURS);
        assert_eq!(config.level, DEFAULT_LOG_LEVEL);
        assert!(config.enabled);
        assert!(config.directory.ends_with(".supertux2/logs"));
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(LogConfig::parse_level("DEBUG"), LevelFilter::DEBUG);
        assert_eq!(LogConfig::parse_level("warning"), LevelFilter::WARN);
        assert_eq!(LogConfig::parse_level("none"), LevelFilter::OFF);
        assert_eq!(LogConfig::parse_level("loud"), DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_parse_retention() {
        assert_eq!(LogConfig::parse_retention("48"), 48);
        assert_eq!(
            LogConfig::parse_retention("forever"),
            DEFAULT_LOG_RETENTION_HOURS
        );
    }

    #[test]
    fn test_cleanup_keeps_recent_logs() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("recent.log"), "x").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let hour = Duration::from_secs(3600);
        assert_eq!(cleanup_old_logs(dir.path(), hour).unwrap(), 0);
        assert!(dir.path().join("recent.log").exists());
        assert_eq!(cleanup_old_logs(&dir.path().join("missing"), hour).unwrap(), 0);
    }

    #[test]
    fn test_disabled_init_is_noop() {
        let dir = TempDir::new().unwrap();
        let config = LogConfig {
            enabled: false,
            directory: dir.path().join("logs"),
            ..LogConfig::default()
        };
        init(&config).unwrap();
        assert!(!config.directory.exists());
    }

    #[test]
    fn test_log_path_in() {
        let path = log_path_in(Path::new("/var/log/st"));
        assert!(path.starts_with("/var/log/st"));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("log"));
    }
}
