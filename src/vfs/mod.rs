//! Mountable virtual filesystem.
//!
//! A `SearchPath` merges real directories and zip archives into one
//! read-only tree. Each mounted source sits at a mountpoint (a virtual
//! directory prefix) and has a position in the search order: lookups walk
//! the sources front to back and the first one that provides a path wins.
//!
//! # Usage
//!
//! ```ignore
//! use supertux_addons::vfs::SearchPath;
//!
//! let mut search_path = SearchPath::new();
//! search_path.mount(Path::new("/usr/share/game/data"), "", true)?;
//! search_path.mount(Path::new("/home/me/addons/foo.zip"), "custom/foo", true)?;
//! let bytes = search_path.read("custom/foo/levels/intro.stl")?;
//! ```

mod archive;
mod source;

use std::collections::BTreeSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use source::MountSource;

/// Errors raised by the virtual filesystem.
#[derive(Debug, Error)]
pub enum VfsError {
    /// The real path does not exist.
    #[error("{0}: no such file or directory")]
    NotFound(PathBuf),

    /// The real path is neither a directory nor a readable zip archive.
    #[error("{path}: unsupported archive: {reason}")]
    UnsupportedArchive { path: PathBuf, reason: String },

    /// The real path is not in the search path.
    #[error("{0}: not in search path")]
    NotMounted(PathBuf),

    /// No mounted source provides the virtual path.
    #[error("{0}: not found in search path")]
    NoSuchPath(String),

    /// The virtual path is malformed (e.g. contains `..`).
    #[error("{0}: invalid virtual path")]
    InvalidPath(String),

    /// The virtual path names a directory where a file was expected.
    #[error("{0}: is a directory")]
    IsDirectory(String),

    /// Underlying I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One entry of the search path.
#[derive(Debug)]
struct Mount {
    /// Real path that was mounted.
    real_path: PathBuf,
    /// Normalized virtual prefix ("" for the root).
    mountpoint: String,
    /// Content provider.
    source: MountSource,
}

impl Mount {
    /// Maps a normalized virtual path to a path relative to the source.
    fn relative<'a>(&self, vpath: &'a str) -> Option<&'a str> {
        if self.mountpoint.is_empty() {
            return Some(vpath);
        }
        if vpath == self.mountpoint {
            return Some("");
        }
        vpath
            .strip_prefix(self.mountpoint.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
    }

    /// Returns the next mountpoint component below `vdir`, if the
    /// mountpoint lies underneath it.
    fn mountpoint_child(&self, vdir: &str) -> Option<&str> {
        if self.mountpoint.is_empty() || self.mountpoint == vdir {
            return None;
        }
        let rest = if vdir.is_empty() {
            self.mountpoint.as_str()
        } else {
            self.mountpoint
                .strip_prefix(vdir)
                .and_then(|rest| rest.strip_prefix('/'))?
        };
        rest.split('/').next()
    }
}

/// Ordered collection of mounted directories and archives.
#[derive(Debug, Default)]
pub struct SearchPath {
    mounts: Vec<Mount>,
}

impl SearchPath {
    /// Creates an empty search path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mounts a real directory or zip archive at `mountpoint`.
    ///
    /// With `append` the source goes behind everything already mounted;
    /// otherwise it is placed in front and shadows existing content.
    /// Mounting a path that is already in the search path does nothing.
    pub fn mount(&mut self, real_path: &Path, mountpoint: &str, append: bool) -> Result<(), VfsError> {
        if self.is_mounted(real_path) {
            debug!("[VFS] {} already mounted", real_path.display());
            return Ok(());
        }

        let mountpoint = normalize(mountpoint)?;
        let source = MountSource::from_path(real_path)?;
        let mount = Mount {
            real_path: real_path.to_path_buf(),
            mountpoint,
            source,
        };

        debug!(
            "[VFS] Mounting {} at '/{}' ({})",
            real_path.display(),
            mount.mountpoint,
            if append { "append" } else { "prepend" }
        );

        if append {
            self.mounts.push(mount);
        } else {
            self.mounts.insert(0, mount);
        }
        Ok(())
    }

    /// Removes a real path from the search path.
    pub fn unmount(&mut self, real_path: &Path) -> Result<(), VfsError> {
        let index = self
            .mounts
            .iter()
            .position(|m| m.real_path == real_path)
            .ok_or_else(|| VfsError::NotMounted(real_path.to_path_buf()))?;
        debug!("[VFS] Unmounting {}", real_path.display());
        self.mounts.remove(index);
        Ok(())
    }

    /// Returns true if the real path is in the search path.
    #[must_use]
    pub fn is_mounted(&self, real_path: &Path) -> bool {
        self.mounts.iter().any(|m| m.real_path == real_path)
    }

    /// Returns the mountpoint a real path was mounted at.
    #[must_use]
    pub fn mount_point(&self, real_path: &Path) -> Option<&str> {
        self.mounts
            .iter()
            .find(|m| m.real_path == real_path)
            .map(|m| m.mountpoint.as_str())
    }

    /// Returns the mounted real paths in lookup order.
    #[must_use]
    pub fn search_path(&self) -> Vec<PathBuf> {
        self.mounts.iter().map(|m| m.real_path.clone()).collect()
    }

    /// Returns true if any source provides the virtual path.
    #[must_use]
    pub fn exists(&self, vpath: &str) -> bool {
        let Ok(vpath) = normalize(vpath) else {
            return false;
        };
        vpath.is_empty() || self.is_directory_normalized(&vpath) || self.real_dir_normalized(&vpath).is_some()
    }

    /// Returns true if the virtual path is a directory in any source, or an
    /// ancestor of a mountpoint.
    #[must_use]
    pub fn is_directory(&self, vpath: &str) -> bool {
        match normalize(vpath) {
            Ok(vpath) => self.is_directory_normalized(&vpath),
            Err(_) => false,
        }
    }

    fn is_directory_normalized(&self, vpath: &str) -> bool {
        if vpath.is_empty() {
            return true;
        }
        self.mounts.iter().any(|m| {
            m.relative(vpath).is_some_and(|rel| m.source.is_dir(rel))
                || m.mountpoint_child(vpath).is_some()
        })
    }

    /// Returns the real path of the first source that provides `vpath`.
    #[must_use]
    pub fn real_dir(&self, vpath: &str) -> Option<&Path> {
        let vpath = normalize(vpath).ok()?;
        self.real_dir_normalized(&vpath)
    }

    fn real_dir_normalized(&self, vpath: &str) -> Option<&Path> {
        self.mounts
            .iter()
            .find(|m| m.relative(vpath).is_some_and(|rel| m.source.contains(rel)))
            .map(|m| m.real_path.as_path())
    }

    /// Lists the names directly inside a virtual directory, merged across
    /// every source, sorted and without duplicates.
    #[must_use]
    pub fn enumerate(&self, vdir: &str) -> Vec<String> {
        let Ok(vdir) = normalize(vdir) else {
            return Vec::new();
        };

        let mut names = BTreeSet::new();
        for mount in &self.mounts {
            if let Some(rel) = mount.relative(&vdir) {
                names.extend(mount.source.list(rel));
            }
            if let Some(child) = mount.mountpoint_child(&vdir) {
                names.insert(child.to_string());
            }
        }
        names.into_iter().collect()
    }

    /// Opens a virtual file for reading.
    pub fn open(&self, vpath: &str) -> Result<Box<dyn Read>, VfsError> {
        let vpath = normalize(vpath)?;
        for mount in &self.mounts {
            let Some(rel) = mount.relative(&vpath) else {
                continue;
            };
            if !mount.source.contains(rel) {
                continue;
            }
            if mount.source.is_dir(rel) {
                return Err(VfsError::IsDirectory(vpath));
            }
            return mount.source.open(rel);
        }
        Err(VfsError::NoSuchPath(vpath))
    }

    /// Reads a whole virtual file.
    pub fn read(&self, vpath: &str) -> Result<Vec<u8>, VfsError> {
        let mut reader = self.open(vpath)?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Reads a whole virtual file as UTF-8 text.
    pub fn read_to_string(&self, vpath: &str) -> Result<String, VfsError> {
        let bytes = self.read(vpath)?;
        String::from_utf8(bytes).map_err(|e| {
            VfsError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }
}

/// Normalizes a virtual path: forward slashes, no leading/trailing or
/// repeated separators, no `.` components. `..` is rejected.
pub fn normalize(vpath: &str) -> Result<String, VfsError> {
    let mut parts = Vec::new();
    for part in vpath.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => return Err(VfsError::InvalidPath(vpath.to_string())),
            other => parts.push(other),
        }
    }
    Ok(parts.join("/"))
}

/// Joins two virtual path fragments.
#[must_use]
pub fn join(base: &str, name: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        name.trim_start_matches('/').to_string()
    } else {
        format!("{}/{}", base, name.trim_start_matches('/'))
    }
}
