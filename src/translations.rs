//! Translation dictionary search directories.
//!
//! Language packs contribute directories of message catalogs. The embedding
//! application owns the actual dictionary loader; the add-on manager only
//! tells it which virtual directories to search and in which order.

use tracing::debug;

/// Receiver of language-pack directories.
pub trait TranslationRegistrar {
    /// Adds a virtual directory to the dictionary search list.
    ///
    /// With `precedence` it is searched before every existing directory.
    fn add_directory(&mut self, dir: &str, precedence: bool);

    /// Removes a virtual directory again.
    fn remove_directory(&mut self, dir: &str);

    /// Current search list, highest priority first.
    fn directories(&self) -> Vec<String>;
}

/// Plain ordered list of dictionary directories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DictionaryPaths {
    dirs: Vec<String>,
}

impl DictionaryPaths {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a list seeded with base directories, in priority order.
    #[must_use]
    pub fn with_base<I, S>(dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn contains(&self, dir: &str) -> bool {
        self.dirs.iter().any(|d| d == dir)
    }
}

impl TranslationRegistrar for DictionaryPaths {
    fn add_directory(&mut self, dir: &str, precedence: bool) {
        if self.contains(dir) {
            return;
        }
        debug!("[TRANSLATIONS] Adding dictionary directory '{}'", dir);
        if precedence {
            self.dirs.insert(0, dir.to_string());
        } else {
            self.dirs.push(dir.to_string());
        }
    }

    fn remove_directory(&mut self, dir: &str) {
        debug!("[TRANSLATIONS] Removing dictionary directory '{}'", dir);
        self.dirs.retain(|d| d != dir);
    }

    fn directories(&self) -> Vec<String> {
        self.dirs.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_order() {
        let mut paths = DictionaryPaths::with_base(["locale"]);
        paths.add_directory("custom/fr/fr", true);
        paths.add_directory("extra", false);
        assert_eq!(paths.directories(), vec!["custom/fr/fr", "locale", "extra"]);
    }

    #[test]
    fn test_no_duplicates_and_removal() {
        let mut paths = DictionaryPaths::new();
        paths.add_directory("a", true);
        paths.add_directory("a", false);
        assert_eq!(paths.directories().len(), 1);

        paths.remove_directory("a");
        assert!(!paths.contains("a"));
        paths.remove_directory("never-added");
    }
}
