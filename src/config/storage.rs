//! Persistence of per-add-on enable state.
//!
//! The state lives in the settings file as `addon.<id> = enabled|disabled`
//! lines. It is read once when the manager starts and written back once when
//! it shuts down.

use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::addons::is_valid_addon_id;

/// Key prefix of add-on lines in the settings file.
const ADDON_KEY_PREFIX: &str = "addon.";

/// Maximum number of lines read from the settings file.
const MAX_LINES: usize = 10_000;

/// Persisted state of one installed add-on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonConfigEntry {
    pub id: String,
    pub enabled: bool,
}

impl AddonConfigEntry {
    #[must_use]
    pub fn new(id: &str, enabled: bool) -> Self {
        Self {
            id: id.to_string(),
            enabled,
        }
    }
}

/// Backing store for add-on enable state.
pub trait AddonConfigStore {
    /// Returns the stored entries, in stored order.
    fn load(&self) -> Vec<AddonConfigEntry>;

    /// Replaces the stored entries.
    fn store(&mut self, entries: &[AddonConfigEntry]) -> io::Result<()>;
}

/// In-memory store that can be shared with the embedding application.
///
/// Clones refer to the same entry list.
#[derive(Debug, Clone, Default)]
pub struct SharedAddonConfig {
    entries: Arc<Mutex<Vec<AddonConfigEntry>>>,
}

impl SharedAddonConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_entries(entries: Vec<AddonConfigEntry>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    /// Snapshot of the current entries.
    #[must_use]
    pub fn entries(&self) -> Vec<AddonConfigEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Stored enable flag of an add-on.
    #[must_use]
    pub fn is_enabled(&self, id: &str) -> Option<bool> {
        self.entries
            .lock()
            .ok()?
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.enabled)
    }
}

impl AddonConfigStore for SharedAddonConfig {
    fn load(&self) -> Vec<AddonConfigEntry> {
        self.entries()
    }

    fn store(&mut self, entries: &[AddonConfigEntry]) -> io::Result<()> {
        match self.entries.lock() {
            Ok(mut e) => {
                *e = entries.to_vec();
                Ok(())
            }
            Err(_) => Err(io::Error::other("add-on config lock poisoned")),
        }
    }
}

/// Settings-file backed store.
#[derive(Debug, Clone)]
pub struct AddonStorage {
    /// Path to the settings file.
    config_path: PathBuf,
}

impl AddonStorage {
    /// Creates a store over the given settings file.
    #[must_use]
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Parses one `addon.<id> = value` line.
    fn parse_line(line: &str) -> Option<AddonConfigEntry> {
        let (key, value) = line.split_once('=')?;
        let id = key.trim().strip_prefix(ADDON_KEY_PREFIX)?;
        if !is_valid_addon_id(id) {
            warn!("[ADDON-CONFIG] Ignoring entry with invalid id '{}'", id);
            return None;
        }

        let value = value.split('#').next().unwrap_or("").trim();
        let enabled = matches!(
            value.to_lowercase().as_str(),
            "enabled" | "true" | "yes" | "1" | "on"
        );
        Some(AddonConfigEntry::new(id, enabled))
    }

    fn is_addon_line(line: &str) -> bool {
        line.trim_start().starts_with(ADDON_KEY_PREFIX) && line.contains('=')
    }
}

impl AddonConfigStore for AddonStorage {
    fn load(&self) -> Vec<AddonConfigEntry> {
        let file = match fs::File::open(&self.config_path) {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };

        let mut entries: Vec<AddonConfigEntry> = Vec::new();
        for line in BufReader::new(file).lines().take(MAX_LINES) {
            let Ok(line) = line else {
                continue;
            };
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(entry) = Self::parse_line(line) {
                match entries.iter_mut().find(|e| e.id == entry.id) {
                    Some(existing) => existing.enabled = entry.enabled,
                    None => entries.push(entry),
                }
            }
        }

        debug!(
            "[ADDON-CONFIG] Loaded {} add-on entries from {}",
            entries.len(),
            self.config_path.display()
        );
        entries
    }

    /// Rewrites the add-on lines, keeping every other line as it was.
    fn store(&mut self, entries: &[AddonConfigEntry]) -> io::Result<()> {
        let content = fs::read_to_string(&self.config_path).unwrap_or_default();

        let mut lines: Vec<String> = content
            .lines()
            .filter(|line| !Self::is_addon_line(line))
            .map(String::from)
            .collect();
        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }

        if !entries.is_empty() {
            if !lines.is_empty() {
                lines.push(String::new());
            }
            for entry in entries {
                let state = if entry.enabled { "enabled" } else { "disabled" };
                lines.push(format!("{}{} = {}", ADDON_KEY_PREFIX, entry.id, state));
            }
        }

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(&self.config_path)?;
        for line in &lines {
            writeln!(file, "{}", line)?;
        }

        debug!(
            "[ADDON-CONFIG] Stored {} add-on entries to {}",
            entries.len(),
            self.config_path.display()
        );
        Ok(())
    }
}
