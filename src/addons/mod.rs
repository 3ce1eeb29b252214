//! Add-on management.
//!
//! Discovers, installs, verifies and mounts add-on archives, and keeps the
//! catalog of what the remote repository offers.
//!
//! # Architecture
//!
//! - **types**: Core data structures (`Addon`, `AddonType`, `AddonError`)
//! - **descriptor**: Descriptor and catalog document parsing
//! - **checksum**: MD5 verification of archives
//! - **manager**: `AddonManager` construction, catalogs, enable/disable
//! - **installer**: Install, uninstall, catalog refresh and screenshot downloads
//! - **events**: `AddonObserver` hooks for the embedding UI
//!
//! # Usage
//!
//! ```ignore
//! use supertux_addons::addons::AddonManager;
//! use supertux_addons::config::Settings;
//!
//! let settings = Settings::load()?;
//! let mut manager = AddonManager::builder(&settings.addon_dir)
//!     .repository_url(&settings.repository_url)
//!     .config(Box::new(settings.addon_storage()))
//!     .build()?;
//!
//! let refresh = manager.request_check_online()?;
//! // ... call manager.update() every frame until refresh.is_finished()
//! let install = manager.request_install_addon("forest-levels")?;
//! ```

mod checksum;
mod descriptor;
mod events;
mod installer;
mod manager;
mod types;

pub use checksum::{md5_from_file, md5_from_search_path, md5_hex};
pub use descriptor::{
    ADDON_INFO_TAG, ADDON_LIST_TAG, DESCRIPTOR_EXTENSION, parse_addon_infos, parse_addon_list,
};
pub use events::AddonObserver;
pub use manager::{
    AddonManager, AddonManagerBuilder, CACHE_DIR_NAME, CATALOG_FILE_NAME, CUSTOM_MOUNT_ROOT,
    SCREENSHOTS_DIR_NAME,
};
pub use types::{ARCHIVE_EXTENSION, Addon, AddonError, AddonType, is_valid_addon_id};
