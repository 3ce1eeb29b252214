//! Add-on catalog and mount state.
//!
//! `AddonManager` is the only writer of installed add-on state. It owns the
//! search path the game reads content through, the installed and repository
//! catalogs, and the on-disk add-on directory:
//!
//! ```text
//! <addon_dir>/
//!     <id>.zip            installed archives (or loose directories)
//!     repository.nfo      last successfully downloaded catalog
//!     cache/              recreated every session, removed on drop
//!         screenshots/    <id>_<n><ext>
//! ```
//!
//! Install, uninstall and download workflows live in the `installer`
//! module; this file covers construction, enable/disable and queries.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::checksum::md5_from_file;
use super::descriptor::{DESCRIPTOR_EXTENSION, parse_addon_infos};
use super::events::AddonObserver;
use super::types::{ARCHIVE_EXTENSION, Addon, AddonError, AddonType};
use crate::config::{AddonConfigEntry, AddonConfigStore, SharedAddonConfig};
use crate::transfer::{Downloader, TransferId, TransferStatusPtr};
use crate::translations::{DictionaryPaths, TranslationRegistrar};
use crate::vfs::{self, SearchPath};

/// Name of the cache directory inside the add-on directory.
pub const CACHE_DIR_NAME: &str = "cache";

/// Name of the screenshot directory inside the cache directory.
pub const SCREENSHOTS_DIR_NAME: &str = "screenshots";

/// File name of the persisted repository catalog.
pub const CATALOG_FILE_NAME: &str = "repository.nfo";

/// Virtual directory non-legacy add-ons are mounted under.
pub const CUSTOM_MOUNT_ROOT: &str = "custom";

/// Bookkeeping for a transfer the manager started.
#[derive(Debug)]
pub(super) enum PendingTransfer {
    /// Repository catalog download.
    Catalog { path: PathBuf },
    /// Archive download for an install.
    Install {
        addon_id: String,
        path: PathBuf,
        md5: String,
    },
    /// Screenshot download.
    Screenshot { addon_id: String, path: PathBuf },
}

/// Builder for [`AddonManager`].
///
/// Every collaborator has a working default, so the minimal form is
/// `AddonManager::builder(dir).build()`.
pub struct AddonManagerBuilder {
    addon_dir: PathBuf,
    repository_url: String,
    search_path: Option<SearchPath>,
    downloader: Option<Downloader>,
    translations: Option<Box<dyn TranslationRegistrar>>,
    config: Option<Box<dyn AddonConfigStore>>,
    observers: Vec<Box<dyn AddonObserver>>,
}

impl AddonManagerBuilder {
    /// Remote catalog URL. Empty disables online features.
    #[must_use]
    pub fn repository_url(mut self, url: &str) -> Self {
        self.repository_url = url.to_string();
        self
    }

    /// Search path holding the base game data.
    #[must_use]
    pub fn search_path(mut self, search_path: SearchPath) -> Self {
        self.search_path = Some(search_path);
        self
    }

    #[must_use]
    pub fn downloader(mut self, downloader: Downloader) -> Self {
        self.downloader = Some(downloader);
        self
    }

    /// Receiver of language-pack directories.
    #[must_use]
    pub fn translations(mut self, translations: Box<dyn TranslationRegistrar>) -> Self {
        self.translations = Some(translations);
        self
    }

    /// Store of persisted enable state.
    #[must_use]
    pub fn config(mut self, config: Box<dyn AddonConfigStore>) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn observer(mut self, observer: Box<dyn AddonObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Creates the manager, scanning and mounting what is on disk.
    ///
    /// # Errors
    /// Fails only if the add-on directory cannot be created.
    pub fn build(self) -> Result<AddonManager, AddonError> {
        AddonManager::construct(self)
    }
}

/// Owner of installed and available add-ons.
pub struct AddonManager {
    pub(super) addon_dir: PathBuf,
    pub(super) cache_dir: PathBuf,
    pub(super) screenshots_dir: PathBuf,
    pub(super) repository_url: String,
    pub(super) search_path: SearchPath,
    pub(super) downloader: Downloader,
    pub(super) translations: Box<dyn TranslationRegistrar>,
    pub(super) config: Box<dyn AddonConfigStore>,
    pub(super) observers: Vec<Box<dyn AddonObserver>>,
    pub(super) installed_addons: BTreeMap<String, Addon>,
    pub(super) repository_addons: BTreeMap<String, Addon>,
    /// Dictionary directories registered per language pack.
    pub(super) translation_dirs: HashMap<String, Vec<String>>,
    pub(super) pending: HashMap<TransferId, PendingTransfer>,
    pub(super) catalog_transfer: Option<TransferStatusPtr>,
    pub(super) has_been_updated: bool,
    /// Set once startup has finished; live resource-pack enables are
    /// deferred to the next start after this.
    pub(super) initialized: bool,
}

impl AddonManager {
    /// Starts building a manager over `addon_dir`.
    #[must_use]
    pub fn builder(addon_dir: impl Into<PathBuf>) -> AddonManagerBuilder {
        AddonManagerBuilder {
            addon_dir: addon_dir.into(),
            repository_url: crate::config::DEFAULT_REPOSITORY_URL.to_string(),
            search_path: None,
            downloader: None,
            translations: None,
            config: None,
            observers: Vec::new(),
        }
    }

    /// Creates a manager with default collaborators and the given config.
    ///
    /// # Errors
    /// Fails only if the add-on directory cannot be created.
    pub fn new(
        addon_dir: impl Into<PathBuf>,
        config: Box<dyn AddonConfigStore>,
    ) -> Result<Self, AddonError> {
        Self::builder(addon_dir).config(config).build()
    }

    fn construct(builder: AddonManagerBuilder) -> Result<Self, AddonError> {
        let addon_dir = builder.addon_dir;
        fs::create_dir_all(&addon_dir).map_err(|source| AddonError::CreateDirectory {
            path: addon_dir.clone(),
            source,
        })?;

        let cache_dir = addon_dir.join(CACHE_DIR_NAME);
        let screenshots_dir = cache_dir.join(SCREENSHOTS_DIR_NAME);

        let mut manager = Self {
            addon_dir,
            cache_dir,
            screenshots_dir,
            repository_url: builder.repository_url,
            search_path: builder.search_path.unwrap_or_default(),
            downloader: builder.downloader.unwrap_or_default(),
            translations: builder
                .translations
                .unwrap_or_else(|| Box::new(DictionaryPaths::new())),
            config: builder
                .config
                .unwrap_or_else(|| Box::new(SharedAddonConfig::new())),
            observers: builder.observers,
            installed_addons: BTreeMap::new(),
            repository_addons: BTreeMap::new(),
            translation_dirs: HashMap::new(),
            pending: HashMap::new(),
            catalog_transfer: None,
            has_been_updated: false,
            initialized: false,
        };

        info!(
            "[ADDON-MANAGER] Starting in {}",
            manager.addon_dir.display()
        );

        for archive in manager.scan_for_archives() {
            let md5 = match md5_from_file(&archive) {
                Ok(md5) => md5,
                Err(e) => {
                    warn!("[ADDON-MANAGER] Could not hash {}: {}", archive.display(), e);
                    continue;
                }
            };
            if let Err(e) = manager.add_installed_archive(&archive, &md5, false) {
                warn!("[ADDON-MANAGER] Skipping {}: {}", archive.display(), e);
            }
        }

        for entry in manager.config.load() {
            if !entry.enabled {
                continue;
            }
            if let Err(e) = manager.enable_addon(&entry.id) {
                warn!("[ADDON-MANAGER] Could not enable '{}': {}", entry.id, e);
            }
        }

        let catalog = manager.catalog_path();
        if catalog.exists() {
            match parse_addon_infos(&catalog) {
                Ok(addons) => {
                    debug!(
                        "[ADDON-MANAGER] Loaded {} cached repository add-ons",
                        addons.len()
                    );
                    manager.repository_addons = addons;
                }
                Err(e) => warn!("[ADDON-MANAGER] Ignoring cached catalog: {}", e),
            }
        }

        if let Err(e) = manager.empty_cache_directory() {
            warn!("[ADDON-MANAGER] Could not reset cache directory: {}", e);
        }

        manager.initialized = true;
        info!(
            "[ADDON-MANAGER] {} add-on(s) installed, {} in repository",
            manager.installed_addons.len(),
            manager.repository_addons.len()
        );
        Ok(manager)
    }

    /// Directory holding installed add-ons.
    #[must_use]
    pub fn addon_dir(&self) -> &Path {
        &self.addon_dir
    }

    /// Transient download cache directory.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub(super) fn catalog_path(&self) -> PathBuf {
        self.addon_dir.join(CATALOG_FILE_NAME)
    }

    /// The merged search path game content is read through.
    #[must_use]
    pub fn search_path(&self) -> &SearchPath {
        &self.search_path
    }

    pub fn search_path_mut(&mut self) -> &mut SearchPath {
        &mut self.search_path
    }

    /// Current dictionary directories.
    #[must_use]
    pub fn translations(&self) -> &dyn TranslationRegistrar {
        self.translations.as_ref()
    }

    pub fn add_observer(&mut self, observer: Box<dyn AddonObserver>) {
        self.observers.push(observer);
    }

    pub(super) fn show_message(&mut self, message: &str) {
        info!("[ADDON-MANAGER] {}", message);
        for observer in &mut self.observers {
            observer.show_message(message);
        }
    }

    pub(super) fn refresh_addon_browser(&mut self) {
        for observer in &mut self.observers {
            observer.refresh_addon_browser();
        }
    }

    /// Removes and recreates the cache directories.
    pub(super) fn empty_cache_directory(&self) -> io::Result<()> {
        match fs::remove_dir_all(&self.cache_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        fs::create_dir_all(&self.screenshots_dir)
    }

    // ===== Catalog queries =====

    /// Ids of installed add-ons, sorted.
    #[must_use]
    pub fn get_installed_addons(&self) -> Vec<String> {
        self.installed_addons.keys().cloned().collect()
    }

    /// Ids of repository add-ons, sorted.
    #[must_use]
    pub fn get_repository_addons(&self) -> Vec<String> {
        self.repository_addons.keys().cloned().collect()
    }

    #[must_use]
    pub fn installed_addon(&self, id: &str) -> Option<&Addon> {
        self.installed_addons.get(id)
    }

    #[must_use]
    pub fn repository_addon(&self, id: &str) -> Option<&Addon> {
        self.repository_addons.get(id)
    }

    /// Looks up an installed add-on.
    ///
    /// # Errors
    /// `NotInstalled` if the id is unknown.
    pub fn get_installed_addon(&self, id: &str) -> Result<&Addon, AddonError> {
        self.installed_addon(id)
            .ok_or_else(|| AddonError::NotInstalled(id.to_string()))
    }

    /// Looks up a repository add-on.
    ///
    /// # Errors
    /// `NotInRepository` if the id is unknown.
    pub fn get_repository_addon(&self, id: &str) -> Result<&Addon, AddonError> {
        self.repository_addon(id)
            .ok_or_else(|| AddonError::NotInRepository(id.to_string()))
    }

    #[must_use]
    pub fn is_addon_installed(&self, id: &str) -> bool {
        self.installed_addons.contains_key(id)
    }

    /// Whether a repository URL is configured.
    #[must_use]
    pub fn has_online_support(&self) -> bool {
        !self.repository_url.is_empty()
    }

    /// Whether the repository catalog was refreshed this session.
    #[must_use]
    pub fn has_been_updated(&self) -> bool {
        self.has_been_updated
    }

    /// True if the repository offers a different build of an installed
    /// add-on that is at least as new.
    #[must_use]
    pub fn is_addon_update_available(&self, id: &str) -> bool {
        match (self.installed_addons.get(id), self.repository_addons.get(id)) {
            (Some(installed), Some(available)) => {
                !installed.md5().eq_ignore_ascii_case(available.md5())
                    && available.version() >= installed.version()
            }
            _ => false,
        }
    }

    /// Ids of installed add-ons with an update available.
    #[must_use]
    pub fn get_updatable_addons(&self) -> Vec<String> {
        self.installed_addons
            .keys()
            .filter(|id| self.is_addon_update_available(id))
            .cloned()
            .collect()
    }

    /// Installed add-ons that list `id` as a dependency.
    #[must_use]
    pub fn get_depending_addons(&self, id: &str) -> Vec<String> {
        self.installed_addons
            .values()
            .filter(|addon| addon.dependencies().iter().any(|dep| dep == id))
            .map(|addon| addon.id().to_string())
            .collect()
    }

    // ===== Discovery =====

    /// Lists archives and loose add-on directories in the add-on directory.
    pub(super) fn scan_for_archives(&self) -> Vec<PathBuf> {
        let entries = match fs::read_dir(&self.addon_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    "[ADDON-MANAGER] Could not read {}: {}",
                    self.addon_dir.display(),
                    e
                );
                return Vec::new();
            }
        };

        let mut archives: Vec<PathBuf> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                let path = entry.path();
                if name.starts_with('.') || path == self.cache_dir {
                    return None;
                }
                if path.is_dir() {
                    Some(path)
                } else if name.to_lowercase().ends_with(ARCHIVE_EXTENSION) && path.is_file() {
                    Some(path)
                } else {
                    None
                }
            })
            .collect();
        archives.sort();
        archives
    }

    /// Finds the descriptor provided by the mounted archive at `archive`.
    pub(super) fn scan_for_info(&self, archive: &Path) -> Option<String> {
        let mountpoint = self.search_path.mount_point(archive)?;
        self.search_path
            .enumerate(mountpoint)
            .into_iter()
            .filter(|name| name.ends_with(DESCRIPTOR_EXTENSION))
            .map(|name| vfs::join(mountpoint, &name))
            .find(|vpath| self.search_path.real_dir(vpath) == Some(archive))
    }

    /// Registers an archive found on disk or just installed.
    ///
    /// The archive is probe-mounted at the root to read its descriptor. The
    /// mount is kept only for a successful user install; a path that was
    /// already mounted beforehand is never unmounted. Returns the id.
    pub(super) fn add_installed_archive(
        &mut self,
        archive: &Path,
        md5: &str,
        user_install: bool,
    ) -> Result<String, AddonError> {
        let was_mounted = self.search_path.is_mounted(archive);
        if !was_mounted {
            self.search_path
                .mount(archive, "", false)
                .map_err(|source| AddonError::Mount {
                    path: archive.to_path_buf(),
                    source,
                })?;
        }

        let result = self.register_archive(archive, md5, user_install);

        let keep_mounted = user_install && matches!(result, Ok((_, true)));
        if !was_mounted && !keep_mounted {
            if let Err(e) = self.search_path.unmount(archive) {
                warn!("[ADDON-MANAGER] Could not unmount probe {}: {}", archive.display(), e);
            }
        }

        match result {
            Ok((id, newly_installed)) => {
                if user_install {
                    if newly_installed {
                        self.show_message("Add-on installed successfully.");
                        self.refresh_addon_browser();
                    } else {
                        self.show_message("Add-on already installed.");
                    }
                }
                Ok(id)
            }
            Err(e) => {
                if user_install {
                    self.show_message(&format!("Could not load add-on info: {}", e));
                }
                Err(e)
            }
        }
    }

    /// Parses the descriptor of a probe-mounted archive and records it.
    ///
    /// Returns the id and whether it was newly added to the catalog.
    fn register_archive(
        &mut self,
        archive: &Path,
        md5: &str,
        user_install: bool,
    ) -> Result<(String, bool), AddonError> {
        let info = self
            .scan_for_info(archive)
            .ok_or_else(|| AddonError::NoDescriptor(archive.to_path_buf()))?;
        let mut addon = Addon::parse_file(&self.search_path, &info)?;
        let id = addon.id().to_string();

        if self.installed_addons.contains_key(&id) {
            info!(
                "[ADDON-MANAGER] '{}' from {} is already installed",
                id,
                archive.display()
            );
            return Ok((id, false));
        }

        addon.set_install_filename(archive, md5);
        debug!(
            "[ADDON-MANAGER] Registered '{}' ({}) from {}{}",
            id,
            addon.addon_type(),
            archive.display(),
            if user_install { " [user install]" } else { "" }
        );
        self.installed_addons.insert(id.clone(), addon);
        Ok((id, true))
    }

    // ===== Enable / disable =====

    /// Virtual directory an add-on is mounted at when enabled.
    #[must_use]
    pub fn mountpoint_for(addon: &Addon) -> String {
        if addon.format() == Addon::ORIGINAL {
            String::new()
        } else {
            vfs::join(CUSTOM_MOUNT_ROOT, addon.id())
        }
    }

    /// Mounts an installed add-on into the search path.
    ///
    /// # Errors
    /// Unknown id, already enabled, a second resource pack, or a mount
    /// failure. Nothing changes on error.
    pub fn enable_addon(&mut self, id: &str) -> Result<(), AddonError> {
        let addon = self.get_installed_addon(id)?;
        if addon.is_enabled() {
            return Err(AddonError::AlreadyEnabled(id.to_string()));
        }

        let addon_type = addon.addon_type();
        let append = !addon.overrides_data();
        let mountpoint = Self::mountpoint_for(addon);
        let archive = addon
            .install_filename()
            .map(Path::to_path_buf)
            .ok_or_else(|| AddonError::NotInstalled(id.to_string()))?;

        if addon_type == AddonType::Resourcepack {
            if let Some(other) = self.enabled_resource_pack() {
                return Err(AddonError::ResourcePackConflict {
                    id: id.to_string(),
                    enabled: other.to_string(),
                });
            }
            if self.initialized {
                info!(
                    "[ADDON-MANAGER] Resource pack '{}' will be mounted on next start",
                    id
                );
                self.set_addon_enabled(id, true);
                return Ok(());
            }
        }

        // A probe mount from a user install is prepended at the root; it has
        // to be replaced even when the mountpoint matches.
        if self.search_path.is_mounted(&archive) {
            self.search_path
                .unmount(&archive)
                .map_err(|source| AddonError::Mount {
                    path: archive.clone(),
                    source,
                })?;
        }

        info!(
            "[ADDON-MANAGER] Enabling '{}' at '/{}'",
            id, mountpoint
        );
        self.search_path
            .mount(&archive, &mountpoint, append)
            .map_err(|source| AddonError::Mount {
                path: archive.clone(),
                source,
            })?;

        if addon_type == AddonType::Languagepack {
            self.register_translations(id, &mountpoint);
        }

        self.set_addon_enabled(id, true);
        Ok(())
    }

    /// Removes an add-on from the search path.
    ///
    /// # Errors
    /// Unknown id, not enabled, or an unmount failure.
    pub fn disable_addon(&mut self, id: &str) -> Result<(), AddonError> {
        let addon = self.get_installed_addon(id)?;
        if !addon.is_enabled() {
            return Err(AddonError::NotEnabled(id.to_string()));
        }

        let addon_type = addon.addon_type();
        let archive = addon.install_filename().map(Path::to_path_buf);

        if addon_type == AddonType::Resourcepack {
            info!(
                "[ADDON-MANAGER] Resource pack '{}' stays mounted until restart",
                id
            );
            self.set_addon_enabled(id, false);
            return Ok(());
        }

        if addon_type == AddonType::Languagepack {
            self.unregister_translations(id);
        }

        if let Some(archive) = archive {
            info!("[ADDON-MANAGER] Disabling '{}'", id);
            self.search_path
                .unmount(&archive)
                .map_err(|source| AddonError::Mount {
                    path: archive.clone(),
                    source,
                })?;
        }

        self.set_addon_enabled(id, false);
        Ok(())
    }

    fn set_addon_enabled(&mut self, id: &str, enabled: bool) {
        if let Some(addon) = self.installed_addons.get_mut(id) {
            addon.set_enabled(enabled);
        }
    }

    fn enabled_resource_pack(&self) -> Option<&str> {
        self.installed_addons
            .values()
            .find(|a| a.addon_type() == AddonType::Resourcepack && a.is_enabled())
            .map(Addon::id)
    }

    /// Adds every directory in a language pack's namespace to the
    /// dictionary search list, ahead of the base translations.
    fn register_translations(&mut self, id: &str, mountpoint: &str) {
        let namespace = vfs::join(mountpoint, id);
        let dirs: Vec<String> = self
            .search_path
            .enumerate(&namespace)
            .into_iter()
            .map(|name| vfs::join(&namespace, &name))
            .filter(|dir| self.search_path.is_directory(dir))
            .collect();

        if dirs.is_empty() {
            warn!(
                "[ADDON-MANAGER] Language pack '{}' has no directories under '{}'",
                id, namespace
            );
        }
        // Only directories added here are removed again on disable.
        let existing = self.translations.directories();
        let added: Vec<String> = dirs
            .into_iter()
            .filter(|dir| !existing.contains(dir))
            .collect();
        for dir in &added {
            self.translations.add_directory(dir, true);
        }
        self.translation_dirs.insert(id.to_string(), added);
    }

    fn unregister_translations(&mut self, id: &str) {
        for dir in self.translation_dirs.remove(id).unwrap_or_default() {
            self.translations.remove_directory(&dir);
        }
    }

    // ===== Legacy add-ons =====

    fn is_old_addon(addon: &Addon) -> bool {
        addon.format() == Addon::ORIGINAL
            && addon.addon_type() != AddonType::Languagepack
            && addon.is_enabled()
    }

    fn old_addon_archives(&self) -> Vec<(String, PathBuf, bool)> {
        self.installed_addons
            .values()
            .filter(|a| Self::is_old_addon(a))
            .filter_map(|a| {
                a.install_filename()
                    .map(|p| (a.id().to_string(), p.to_path_buf(), a.overrides_data()))
            })
            .collect()
    }

    /// Whether any enabled legacy add-on shares the search-path root.
    #[must_use]
    pub fn is_old_addon_enabled(&self) -> bool {
        self.installed_addons.values().any(Self::is_old_addon)
    }

    /// Whether a virtual path is provided by an enabled legacy add-on.
    #[must_use]
    pub fn is_from_old_addon(&self, vpath: &str) -> bool {
        let Some(real) = self.search_path.real_dir(vpath) else {
            return false;
        };
        self.installed_addons
            .values()
            .filter(|a| Self::is_old_addon(a))
            .any(|a| a.install_filename() == Some(real))
    }

    /// Disables every enabled legacy add-on.
    pub fn disable_old_addons(&mut self) {
        for (id, _, _) in self.old_addon_archives() {
            if let Err(e) = self.disable_addon(&id) {
                warn!("[ADDON-MANAGER] Could not disable legacy add-on '{}': {}", id, e);
            }
        }
    }

    /// Remounts enabled legacy add-ons after `unmount_old_addons`.
    pub fn mount_old_addons(&mut self) {
        for (id, archive, overrides) in self.old_addon_archives() {
            if let Err(e) = self.search_path.mount(&archive, "", !overrides) {
                warn!("[ADDON-MANAGER] Could not mount legacy add-on '{}': {}", id, e);
            }
        }
    }

    /// Temporarily removes enabled legacy add-ons from the search path
    /// without changing their enabled flag.
    pub fn unmount_old_addons(&mut self) {
        for (id, archive, _) in self.old_addon_archives() {
            if let Err(e) = self.search_path.unmount(&archive) {
                warn!("[ADDON-MANAGER] Could not unmount legacy add-on '{}': {}", id, e);
            }
        }
    }
}

impl Drop for AddonManager {
    fn drop(&mut self) {
        let entries: Vec<AddonConfigEntry> = self
            .installed_addons
            .values()
            .map(|a| AddonConfigEntry::new(a.id(), a.is_enabled()))
            .collect();
        if let Err(e) = self.config.store(&entries) {
            warn!("[ADDON-MANAGER] Could not persist add-on state: {}", e);
        }

        match fs::remove_dir_all(&self.cache_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "[ADDON-MANAGER] Could not remove {}: {}",
                self.cache_dir.display(),
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addon(id: &str, addon_type: AddonType, format: i32) -> Addon {
        let text = format!(
            "[supertux-addoninfo]\nid = \"{}\"\ntype = \"{}\"\nformat = {}\n",
            id, addon_type, format
        );
        Addon::parse_document(&text, "test.nfo").unwrap()
    }

    #[test]
    fn test_mountpoint_for() {
        assert_eq!(
            AddonManager::mountpoint_for(&addon("old", AddonType::Levelset, 0)),
            ""
        );
        assert_eq!(
            AddonManager::mountpoint_for(&addon("new", AddonType::Levelset, 1)),
            "custom/new"
        );
    }

    #[test]
    fn test_is_old_addon() {
        let mut old = addon("old", AddonType::Levelset, Addon::ORIGINAL);
        old.set_install_filename(Path::new("/tmp/old.zip"), "");
        assert!(!AddonManager::is_old_addon(&old));
        old.set_enabled(true);
        assert!(AddonManager::is_old_addon(&old));

        let mut lang = addon("lang", AddonType::Languagepack, Addon::ORIGINAL);
        lang.set_install_filename(Path::new("/tmp/lang.zip"), "");
        lang.set_enabled(true);
        assert!(!AddonManager::is_old_addon(&lang));

        let mut new = addon("new", AddonType::World, 1);
        new.set_install_filename(Path::new("/tmp/new.zip"), "");
        new.set_enabled(true);
        assert!(!AddonManager::is_old_addon(&new));
    }
}
