//! Content providers behind a mount.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use super::VfsError;
use super::archive::ZipIndex;

/// A mounted real directory or zip archive.
#[derive(Debug)]
pub(super) enum MountSource {
    /// Loose directory on disk.
    Directory(PathBuf),
    /// Zip archive, indexed at mount time.
    Archive(ZipIndex),
}

impl MountSource {
    /// Opens a real path as a mount source.
    pub(super) fn from_path(real_path: &Path) -> Result<Self, VfsError> {
        let metadata =
            fs::metadata(real_path).map_err(|_| VfsError::NotFound(real_path.to_path_buf()))?;

        if metadata.is_dir() {
            Ok(Self::Directory(real_path.to_path_buf()))
        } else {
            ZipIndex::build(real_path).map(Self::Archive)
        }
    }

    /// Returns true if `rel` names a file or directory in this source.
    pub(super) fn contains(&self, rel: &str) -> bool {
        match self {
            Self::Directory(root) => rel.is_empty() || root.join(rel).exists(),
            Self::Archive(index) => index.contains(rel),
        }
    }

    /// Returns true if `rel` names a directory in this source.
    pub(super) fn is_dir(&self, rel: &str) -> bool {
        match self {
            Self::Directory(root) => root.join(rel).is_dir(),
            Self::Archive(index) => index.is_dir(rel),
        }
    }

    /// Lists the entries directly inside `rel`.
    pub(super) fn list(&self, rel: &str) -> Vec<String> {
        match self {
            Self::Directory(root) => {
                let Ok(entries) = fs::read_dir(root.join(rel)) else {
                    return Vec::new();
                };
                entries
                    .flatten()
                    .filter_map(|entry| entry.file_name().to_str().map(String::from))
                    .collect()
            }
            Self::Archive(index) => index.list(rel),
        }
    }

    /// Opens the file at `rel`.
    pub(super) fn open(&self, rel: &str) -> Result<Box<dyn Read>, VfsError> {
        match self {
            Self::Directory(root) => {
                let file = File::open(root.join(rel))?;
                Ok(Box::new(file))
            }
            Self::Archive(index) => index.open(rel),
        }
    }
}
