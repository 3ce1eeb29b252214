//! SuperTux add-on manager
//!
//! Package management for game content: add-on archives are discovered on
//! disk or downloaded from a repository catalog, verified by MD5, and mounted
//! into a virtual filesystem the game reads its data through.
//!
//! # Architecture
//!
//! - **Addons Module**: `AddonManager`, descriptors, install workflows
//! - **VFS Module**: Mountable search path over directories and zip archives
//! - **Transfer Module**: Background downloads with polled completion
//! - **Translations Module**: Language-pack dictionary directories
//! - **Config Module**: Settings file and persisted enable state
//!
//! # Usage
//!
//! ```no_run
//! use supertux_addons::addons::AddonManager;
//! use supertux_addons::config::SharedAddonConfig;
//!
//! let config = SharedAddonConfig::new();
//! let mut manager = AddonManager::new("/tmp/addons", Box::new(config))
//!     .expect("Failed to create add-on manager");
//! manager.update();
//! ```

// Clippy configuration - allow common patterns
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

pub mod addons;
pub mod config;
pub mod logging;
pub mod transfer;
pub mod translations;
pub mod vfs;

// Re-export main types
pub use addons::{Addon, AddonError, AddonManager, AddonType};
pub use config::Settings;
pub use transfer::{Downloader, TransferStatus, TransferStatusList};
pub use vfs::SearchPath;
