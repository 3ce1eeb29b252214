//! Zip archive indexing for the search path.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use super::{VfsError, normalize};

/// Entry listing of a zip archive.
///
/// The archive is indexed once when mounted and reopened for every read, so
/// the file on disk stays unlocked while it is in the search path.
#[derive(Debug)]
pub(super) struct ZipIndex {
    /// Archive location on disk.
    path: PathBuf,
    /// Normalized file name to entry index.
    files: BTreeMap<String, usize>,
    /// Every directory implied by the entries (including "").
    dirs: BTreeSet<String>,
}

impl ZipIndex {
    /// Reads the central directory of an archive.
    pub(super) fn build(path: &Path) -> Result<Self, VfsError> {
        let unsupported = |reason: String| VfsError::UnsupportedArchive {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path)?;
        let mut archive = zip::ZipArchive::new(file).map_err(|e| unsupported(e.to_string()))?;

        let mut files = BTreeMap::new();
        let mut dirs = BTreeSet::new();
        dirs.insert(String::new());

        for i in 0..archive.len() {
            let entry = archive.by_index_raw(i).map_err(|e| unsupported(e.to_string()))?;
            // Entries escaping the archive root are never exposed.
            let Ok(name) = normalize(entry.name()) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }

            let mut parent = name.as_str();
            while let Some((dir, _)) = parent.rsplit_once('/') {
                dirs.insert(dir.to_string());
                parent = dir;
            }

            if entry.is_dir() {
                dirs.insert(name);
            } else {
                files.insert(name, i);
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            files,
            dirs,
        })
    }

    pub(super) fn contains(&self, rel: &str) -> bool {
        self.files.contains_key(rel) || self.dirs.contains(rel)
    }

    pub(super) fn is_dir(&self, rel: &str) -> bool {
        self.dirs.contains(rel)
    }

    /// Lists the direct children of a directory inside the archive.
    pub(super) fn list(&self, rel: &str) -> Vec<String> {
        if !self.dirs.contains(rel) {
            return Vec::new();
        }

        let child_of = |name: &str| -> Option<String> {
            let rest = if rel.is_empty() {
                name
            } else {
                name.strip_prefix(rel)?.strip_prefix('/')?
            };
            if rest.is_empty() || rest.contains('/') {
                None
            } else {
                Some(rest.to_string())
            }
        };

        let mut names: BTreeSet<String> = self.files.keys().filter_map(|n| child_of(n.as_str())).collect();
        names.extend(self.dirs.iter().filter_map(|n| child_of(n.as_str())));
        names.into_iter().collect()
    }

    /// Decompresses one entry into memory.
    pub(super) fn open(&self, rel: &str) -> Result<Box<dyn Read>, VfsError> {
        let index = *self
            .files
            .get(rel)
            .ok_or_else(|| VfsError::NoSuchPath(rel.to_string()))?;

        let file = File::open(&self.path)?;
        let mut archive = zip::ZipArchive::new(file).map_err(|e| VfsError::UnsupportedArchive {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        let mut entry = archive.by_index(index).map_err(|e| VfsError::UnsupportedArchive {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        let mut buf = Vec::new();
        entry.read_to_end(&mut buf)?;
        Ok(Box::new(Cursor::new(buf)))
    }
}
