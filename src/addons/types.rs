//! Add-on type definitions.
//!
//! Core data structures for the add-ons system.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::transfer::TransferError;
use crate::vfs::VfsError;

/// File extension of installed add-on archives.
pub const ARCHIVE_EXTENSION: &str = ".zip";

/// Kind of content an add-on carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddonType {
    /// A world (collection of levels with a worldmap).
    World,
    /// A standalone worldmap.
    Worldmap,
    /// A plain set of levels.
    Levelset,
    /// Translations.
    Languagepack,
    /// Replacement game data (graphics, sounds, ...).
    Resourcepack,
    /// Anything else.
    #[default]
    Addon,
}

impl AddonType {
    /// All known types, in declaration order.
    pub const ALL: [AddonType; 6] = [
        AddonType::World,
        AddonType::Worldmap,
        AddonType::Levelset,
        AddonType::Languagepack,
        AddonType::Resourcepack,
        AddonType::Addon,
    ];

    /// Parses a descriptor type name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "world" => Some(Self::World),
            "worldmap" => Some(Self::Worldmap),
            "levelset" => Some(Self::Levelset),
            "languagepack" => Some(Self::Languagepack),
            "resourcepack" => Some(Self::Resourcepack),
            "addon" => Some(Self::Addon),
            _ => None,
        }
    }

    /// Returns the descriptor type name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::World => "world",
            Self::Worldmap => "worldmap",
            Self::Levelset => "levelset",
            Self::Languagepack => "languagepack",
            Self::Resourcepack => "resourcepack",
            Self::Addon => "addon",
        }
    }
}

impl fmt::Display for AddonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptor of one installable piece of content.
///
/// Created only through [`Addon::parse`] and friends; after that only the
/// install location and the enabled flag ever change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addon {
    pub(crate) id: String,
    pub(crate) version: i32,
    pub(crate) addon_type: AddonType,
    pub(crate) title: String,
    pub(crate) author: String,
    pub(crate) license: String,
    pub(crate) description: String,
    pub(crate) url: String,
    pub(crate) md5: String,
    pub(crate) format: i32,
    pub(crate) screenshots: Vec<String>,
    pub(crate) dependencies: Vec<String>,
    pub(crate) install_filename: Option<PathBuf>,
    pub(crate) enabled: bool,
}

impl Addon {
    /// Format of legacy add-ons, which are mounted at the search path root.
    pub const ORIGINAL: i32 = 0;

    /// Unique identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn version(&self) -> i32 {
        self.version
    }

    #[must_use]
    pub fn addon_type(&self) -> AddonType {
        self.addon_type
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    #[must_use]
    pub fn license(&self) -> &str {
        &self.license
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Download location of the archive.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Hex MD5 of the archive.
    #[must_use]
    pub fn md5(&self) -> &str {
        &self.md5
    }

    #[must_use]
    pub fn format(&self) -> i32 {
        self.format
    }

    /// Screenshot URLs, in display order.
    #[must_use]
    pub fn screenshots(&self) -> &[String] {
        &self.screenshots
    }

    /// Ids of add-ons this one needs.
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Canonical archive file name, `<id>.zip`.
    #[must_use]
    pub fn filename(&self) -> String {
        format!("{}{}", self.id, ARCHIVE_EXTENSION)
    }

    /// Real path of the installed archive, if installed.
    #[must_use]
    pub fn install_filename(&self) -> Option<&Path> {
        self.install_filename.as_deref()
    }

    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.install_filename.is_some()
    }

    /// Whether the add-on is part of the active search path.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// True for worlds, worldmaps and levelsets.
    #[must_use]
    pub fn is_levelset(&self) -> bool {
        matches!(
            self.addon_type,
            AddonType::World | AddonType::Worldmap | AddonType::Levelset
        )
    }

    /// True if the add-on is mounted in front of the base game data.
    #[must_use]
    pub fn overrides_data(&self) -> bool {
        self.addon_type == AddonType::Resourcepack
    }

    /// True if enabling may only take effect after a restart.
    #[must_use]
    pub fn requires_restart(&self) -> bool {
        matches!(
            self.addon_type,
            AddonType::Languagepack | AddonType::Resourcepack
        )
    }

    /// Records where the archive lives and what it hashes to.
    pub(crate) fn set_install_filename(&mut self, path: &Path, md5: &str) {
        self.install_filename = Some(path.to_path_buf());
        self.md5 = md5.to_string();
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        debug_assert!(
            !enabled || self.is_installed(),
            "Add-on must be installed to be enabled"
        );
        self.enabled = enabled;
    }
}

/// Add-on error types.
#[derive(Debug, Error)]
pub enum AddonError {
    /// The add-on directory could not be created.
    #[error("Could not create add-on directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Descriptor has no id, or an empty one.
    #[error("Add-on id is missing or empty")]
    MissingId,

    /// Descriptor id contains characters outside `[-_0-9A-Za-z]`.
    #[error("Add-on id contains illegal characters: '{0}'")]
    InvalidId(String),

    /// Descriptor type is not one of the known names.
    #[error("Unknown add-on type: '{0}'")]
    UnknownType(String),

    /// Descriptor document is structurally broken.
    #[error("Malformed descriptor: {0}")]
    Malformed(String),

    /// Document root is not the expected tag.
    #[error("{path}: not a {expected} file")]
    WrongRootTag { path: String, expected: &'static str },

    /// Descriptor failure, annotated with the source path.
    #[error("Problem when reading add-on info from '{path}': {source}")]
    Descriptor {
        path: String,
        source: Box<AddonError>,
    },

    /// No descriptor file inside an archive.
    #[error("Could not find add-on info file in {0}")]
    NoDescriptor(PathBuf),

    /// Id not in the installed catalog.
    #[error("Add-on '{0}' is not installed")]
    NotInstalled(String),

    /// Id not in the repository catalog.
    #[error("Add-on '{0}' not found in repository")]
    NotInRepository(String),

    /// Enable requested for an enabled add-on.
    #[error("Add-on '{0}' is already enabled")]
    AlreadyEnabled(String),

    /// Disable requested for a disabled add-on.
    #[error("Add-on '{0}' is not enabled")]
    NotEnabled(String),

    /// Another resource pack is already enabled.
    #[error("Cannot enable '{id}': resource pack '{enabled}' is already enabled, only one resource pack may be enabled at a time")]
    ResourcePackConflict { id: String, enabled: String },

    /// Downloaded archive does not hash to the advertised value.
    #[error("Downloading add-on '{id}' failed: MD5 checksums differ (expected {expected}, got {actual})")]
    ChecksumMismatch {
        id: String,
        expected: String,
        actual: String,
    },

    /// Search path mount/unmount failure.
    #[error("Search path error for {path}: {source}")]
    Mount { path: PathBuf, source: VfsError },

    /// Deleting an archive failed.
    #[error("Error deleting add-on file {path}: {source}")]
    Delete {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A downloaded archive describes a different add-on than requested.
    #[error("Archive for add-on '{expected}' contains add-on '{found}'")]
    IdMismatch { expected: String, found: String },

    /// No repository URL is configured.
    #[error("No add-on repository configured")]
    Offline,

    /// A catalog refresh is already running.
    #[error("Only one catalog request can be made at a time")]
    TransferInProgress,

    /// Network or copy failure.
    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// Virtual filesystem failure.
    #[error("Virtual filesystem error: {0}")]
    Vfs(#[from] VfsError),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AddonError {
    /// Attaches the descriptor source path to a parse error.
    pub(crate) fn in_file(self, path: &str) -> Self {
        Self::Descriptor {
            path: path.to_string(),
            source: Box::new(self),
        }
    }
}

/// Returns true if `id` is a non-empty string over `[-_0-9A-Za-z]`.
#[must_use]
pub fn is_valid_addon_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
