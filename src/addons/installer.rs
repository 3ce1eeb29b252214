//! Install, uninstall and download workflows.
//!
//! Every install path (blocking, queued, dependency) ends in the same
//! completion step: verify the archive hash, register the archive, then
//! try to enable it.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::checksum::md5_from_file;
use super::descriptor::parse_addon_infos;
use super::manager::{AddonManager, CATALOG_FILE_NAME, PendingTransfer};
use super::types::{ARCHIVE_EXTENSION, AddonError};
use crate::transfer::{TransferStatusList, TransferStatusListPtr, TransferStatusPtr};

/// Extension used for screenshots whose URL has none.
const DEFAULT_SCREENSHOT_EXTENSION: &str = ".png";

impl AddonManager {
    // ===== Catalog refresh =====

    /// Downloads and swaps in the repository catalog, blocking.
    ///
    /// # Errors
    /// No repository configured, a transfer failure, or an unparsable
    /// catalog. The previous catalog is kept on error.
    pub fn check_online(&mut self) -> Result<(), AddonError> {
        if !self.has_online_support() {
            return Err(AddonError::Offline);
        }

        self.empty_cache_directory()?;
        let destination = self.cache_dir.join(CATALOG_FILE_NAME);
        info!("[ADDON-MANAGER] Checking {} for add-ons", self.repository_url);
        self.downloader.download(&self.repository_url, &destination)?;
        self.load_downloaded_catalog(&destination)
    }

    /// Starts a catalog refresh and returns its handle.
    ///
    /// The catalog is swapped in by [`AddonManager::update`] once the
    /// transfer finishes; until then the previous catalog stays visible.
    ///
    /// # Errors
    /// No repository configured, or a refresh is already in flight.
    pub fn request_check_online(&mut self) -> Result<TransferStatusPtr, AddonError> {
        if !self.has_online_support() {
            return Err(AddonError::Offline);
        }
        if self.catalog_transfer.is_some() {
            return Err(AddonError::TransferInProgress);
        }

        self.empty_cache_directory()?;
        let destination = self.cache_dir.join(CATALOG_FILE_NAME);
        let status = self
            .downloader
            .request_download(&self.repository_url, &destination)?;

        self.pending.insert(
            status.id(),
            PendingTransfer::Catalog { path: destination },
        );
        self.catalog_transfer = Some(Arc::clone(&status));
        Ok(status)
    }

    /// Parses a downloaded catalog, swaps it in and persists it.
    fn load_downloaded_catalog(&mut self, path: &Path) -> Result<(), AddonError> {
        let addons = parse_addon_infos(path)?;
        info!(
            "[ADDON-MANAGER] Repository lists {} add-on(s)",
            addons.len()
        );

        if let Err(e) = fs::copy(path, self.catalog_path()) {
            warn!("[ADDON-MANAGER] Could not persist catalog: {}", e);
        }
        self.repository_addons = addons;
        self.has_been_updated = true;
        self.refresh_addon_browser();
        Ok(())
    }

    // ===== Install =====

    /// Downloads, verifies, registers and enables a repository add-on,
    /// blocking until done. Missing dependencies are installed first on a
    /// best-effort basis.
    ///
    /// # Errors
    /// Unknown id, transfer failure, checksum mismatch, or an unreadable
    /// archive. A failed install leaves the add-on not installed.
    pub fn install_addon(&mut self, id: &str) -> Result<(), AddonError> {
        let mut visited = HashSet::new();
        self.install_with_dependencies(id, &mut visited)
    }

    fn install_with_dependencies(
        &mut self,
        id: &str,
        visited: &mut HashSet<String>,
    ) -> Result<(), AddonError> {
        visited.insert(id.to_string());
        let addon = self.get_repository_addon(id)?.clone();
        self.prepare_reinstall(id)?;

        for dependency in addon.dependencies() {
            if !self.should_install_dependency(id, dependency, visited) {
                continue;
            }
            if let Err(e) = self.install_with_dependencies(dependency, visited) {
                warn!(
                    "[ADDON-INSTALL] Dependency '{}' of '{}' failed: {}",
                    dependency, id, e
                );
            }
        }

        let destination = self.addon_dir.join(addon.filename());
        info!("[ADDON-INSTALL] Installing '{}' from {}", id, addon.url());
        self.downloader.download(addon.url(), &destination)?;
        self.complete_install(id, &destination, addon.md5())
    }

    /// Queues the install of a repository add-on and its missing
    /// dependencies, returning one handle for all of them.
    ///
    /// Each archive completes independently; the add-on itself may finish
    /// before its dependencies do.
    ///
    /// # Errors
    /// Unknown id, or the transfer could not be queued.
    pub fn request_install_addon(&mut self, id: &str) -> Result<TransferStatusListPtr, AddonError> {
        let list = TransferStatusList::new();
        let mut visited = HashSet::new();
        self.queue_install(id, &mut visited, &list)?;
        Ok(list)
    }

    /// Queues only the missing dependencies of a repository add-on.
    ///
    /// # Errors
    /// Unknown id.
    pub fn request_install_addon_dependencies(
        &mut self,
        id: &str,
    ) -> Result<TransferStatusListPtr, AddonError> {
        let list = TransferStatusList::new();
        let mut visited = HashSet::new();
        visited.insert(id.to_string());
        self.queue_dependencies(id, &mut visited, &list)?;
        Ok(list)
    }

    fn queue_install(
        &mut self,
        id: &str,
        visited: &mut HashSet<String>,
        list: &TransferStatusListPtr,
    ) -> Result<(), AddonError> {
        visited.insert(id.to_string());
        let addon = self.get_repository_addon(id)?.clone();
        self.prepare_reinstall(id)?;
        self.queue_dependencies(id, visited, list)?;

        let destination = self.addon_dir.join(addon.filename());
        let status = self.downloader.request_download(addon.url(), &destination)?;
        info!(
            "[ADDON-INSTALL] Queued '{}' as transfer #{}",
            id,
            status.id()
        );
        self.pending.insert(
            status.id(),
            PendingTransfer::Install {
                addon_id: id.to_string(),
                path: destination,
                md5: addon.md5().to_string(),
            },
        );
        list.push(status);
        Ok(())
    }

    fn queue_dependencies(
        &mut self,
        id: &str,
        visited: &mut HashSet<String>,
        list: &TransferStatusListPtr,
    ) -> Result<(), AddonError> {
        let dependencies = self.get_repository_addon(id)?.dependencies().to_vec();
        for dependency in &dependencies {
            if !self.should_install_dependency(id, dependency, visited) {
                continue;
            }
            if let Err(e) = self.queue_install(dependency, visited, list) {
                warn!(
                    "[ADDON-INSTALL] Could not queue dependency '{}' of '{}': {}",
                    dependency, id, e
                );
            }
        }
        Ok(())
    }

    fn should_install_dependency(
        &self,
        parent: &str,
        dependency: &str,
        visited: &HashSet<String>,
    ) -> bool {
        if visited.contains(dependency) || self.is_addon_installed(dependency) {
            return false;
        }
        if self.is_install_pending(dependency) {
            debug!("[ADDON-INSTALL] Dependency '{}' is already downloading", dependency);
            return false;
        }
        if self.repository_addon(dependency).is_none() {
            warn!(
                "[ADDON-INSTALL] Dependency '{}' of '{}' is not in the repository, skipping",
                dependency, parent
            );
            return false;
        }
        true
    }

    fn is_install_pending(&self, id: &str) -> bool {
        self.pending.values().any(|p| {
            matches!(p, PendingTransfer::Install { addon_id, .. } if addon_id == id)
        })
    }

    /// Clears the slot of an installed add-on before it is replaced.
    fn prepare_reinstall(&mut self, id: &str) -> Result<(), AddonError> {
        let Some(addon) = self.installed_addon(id) else {
            return Ok(());
        };
        let enabled = addon.is_enabled();
        let archive = addon.install_filename().map(Path::to_path_buf);

        info!("[ADDON-INSTALL] Replacing installed '{}'", id);
        if enabled {
            self.disable_addon(id)?;
        }
        // Resource packs stay mounted when disabled.
        if let Some(archive) = archive {
            if self.search_path.is_mounted(&archive) {
                self.search_path
                    .unmount(&archive)
                    .map_err(|source| AddonError::Mount {
                        path: archive.clone(),
                        source,
                    })?;
            }
        }
        self.installed_addons.remove(id);
        Ok(())
    }

    /// Verifies a downloaded archive, registers it and enables it.
    fn complete_install(
        &mut self,
        id: &str,
        archive: &Path,
        expected_md5: &str,
    ) -> Result<(), AddonError> {
        let actual = md5_from_file(archive)?;
        if !actual.eq_ignore_ascii_case(expected_md5) {
            Self::remove_rejected_archive(archive);
            return Err(AddonError::ChecksumMismatch {
                id: id.to_string(),
                expected: expected_md5.to_string(),
                actual,
            });
        }

        let installed_id = match self.add_installed_archive(archive, &actual, false) {
            Ok(installed_id) => installed_id,
            Err(e) => {
                Self::remove_rejected_archive(archive);
                return Err(e);
            }
        };
        if installed_id != id {
            self.reject_foreign_archive(archive, &installed_id);
            return Err(AddonError::IdMismatch {
                expected: id.to_string(),
                found: installed_id,
            });
        }

        if let Err(e) = self.enable_addon(id) {
            warn!("[ADDON-INSTALL] Installed '{}' but could not enable it: {}", id, e);
        }
        info!("[ADDON-INSTALL] '{}' installed", id);
        Ok(())
    }

    /// Drops an archive registered under an unexpected id.
    ///
    /// An entry that was already installed from another file is left alone.
    fn reject_foreign_archive(&mut self, archive: &Path, found: &str) {
        warn!(
            "[ADDON-INSTALL] {} describes '{}', rejecting it",
            archive.display(),
            found
        );
        let registered_here = self
            .installed_addon(found)
            .is_some_and(|a| a.install_filename() == Some(archive));
        if registered_here {
            self.installed_addons.remove(found);
        }
        if self.search_path.is_mounted(archive) {
            if let Err(e) = self.search_path.unmount(archive) {
                warn!("[ADDON-INSTALL] Could not unmount {}: {}", archive.display(), e);
            }
        }
        Self::remove_rejected_archive(archive);
    }

    fn remove_rejected_archive(archive: &Path) {
        if let Err(e) = fs::remove_file(archive) {
            warn!(
                "[ADDON-INSTALL] Could not remove {}: {}",
                archive.display(),
                e
            );
        }
    }

    /// Copies a user-supplied archive into the add-on directory and
    /// registers it, reporting the outcome to the observers.
    ///
    /// Files without the archive extension are ignored and yield `None`.
    ///
    /// # Errors
    /// Copy, hash or descriptor failures.
    pub fn install_addon_from_local_file(
        &mut self,
        path: &Path,
    ) -> Result<Option<String>, AddonError> {
        let Some(file_name) = path.file_name() else {
            return Ok(None);
        };
        if !file_name
            .to_string_lossy()
            .to_lowercase()
            .ends_with(ARCHIVE_EXTENSION)
        {
            debug!("[ADDON-INSTALL] Ignoring non-archive {}", path.display());
            return Ok(None);
        }

        let destination = self.addon_dir.join(file_name);
        let md5 = match self.copy_local_archive(path, &destination) {
            Ok(md5) => md5,
            Err(e) => {
                self.show_message(&format!("Could not install add-on: {}", e));
                return Err(e);
            }
        };
        self.add_installed_archive(&destination, &md5, true).map(Some)
    }

    fn copy_local_archive(&self, source: &Path, destination: &Path) -> Result<String, AddonError> {
        if source != destination {
            info!(
                "[ADDON-INSTALL] Copying {} to {}",
                source.display(),
                destination.display()
            );
            fs::copy(source, destination)?;
        }
        Ok(md5_from_file(destination)?)
    }

    // ===== Uninstall =====

    /// Disables, deletes and forgets an installed add-on.
    ///
    /// # Errors
    /// Unknown id, a failed disable, or a failed delete. The catalog entry
    /// is kept if the file could not be deleted.
    pub fn uninstall_addon(&mut self, id: &str) -> Result<(), AddonError> {
        let addon = self.get_installed_addon(id)?;
        let enabled = addon.is_enabled();
        let archive = addon
            .install_filename()
            .map(Path::to_path_buf)
            .ok_or_else(|| AddonError::NotInstalled(id.to_string()))?;

        info!("[ADDON-MANAGER] Uninstalling '{}'", id);
        if enabled {
            self.disable_addon(id)?;
        }
        if self.search_path.is_mounted(&archive) {
            self.search_path
                .unmount(&archive)
                .map_err(|source| AddonError::Mount {
                    path: archive.clone(),
                    source,
                })?;
        }

        let deleted = if archive.is_dir() {
            fs::remove_dir_all(&archive)
        } else {
            fs::remove_file(&archive)
        };
        deleted.map_err(|source| AddonError::Delete {
            path: archive.clone(),
            source,
        })?;

        self.installed_addons.remove(id);
        self.translation_dirs.remove(id);
        Ok(())
    }

    // ===== Screenshots =====

    /// Cache location of a screenshot, `<id>_<n><ext>` with `n` from 1.
    fn screenshot_path(&self, id: &str, index: usize, url: &str) -> PathBuf {
        let name = url.rsplit('/').next().unwrap_or(url);
        let name = name.split(['?', '#']).next().unwrap_or(name);
        let extension = match name.rfind('.') {
            Some(dot) if dot + 1 < name.len() => &name[dot..],
            _ => DEFAULT_SCREENSHOT_EXTENSION,
        };
        self.screenshots_dir
            .join(format!("{}_{}{}", id, index + 1, extension))
    }

    /// Queues downloads of a repository add-on's screenshots into the
    /// cache. Screenshots already on disk are not fetched again.
    ///
    /// # Errors
    /// Unknown id, or a transfer could not be queued.
    pub fn request_download_addon_screenshots(
        &mut self,
        id: &str,
    ) -> Result<TransferStatusListPtr, AddonError> {
        let urls = self.get_repository_addon(id)?.screenshots().to_vec();
        let list = TransferStatusList::new();

        fs::create_dir_all(&self.screenshots_dir)?;
        for (index, url) in urls.iter().enumerate() {
            let path = self.screenshot_path(id, index, url);
            if path.exists() {
                debug!("[ADDON-MANAGER] Screenshot {} already cached", path.display());
                continue;
            }
            let status = self.downloader.request_download(url, &path)?;
            self.pending.insert(
                status.id(),
                PendingTransfer::Screenshot {
                    addon_id: id.to_string(),
                    path,
                },
            );
            list.push(status);
        }
        Ok(list)
    }

    /// Cached screenshot files of a repository add-on, in display order.
    #[must_use]
    pub fn get_addon_screenshots(&self, id: &str) -> Vec<PathBuf> {
        let Some(addon) = self.repository_addon(id) else {
            return Vec::new();
        };
        addon
            .screenshots()
            .iter()
            .enumerate()
            .map(|(index, url)| self.screenshot_path(id, index, url))
            .filter(|path| path.exists())
            .collect()
    }

    // ===== Polling =====

    /// Applies finished transfers and runs their callbacks.
    ///
    /// Call periodically from the owning thread; nothing completes
    /// without it.
    pub fn update(&mut self) {
        for (status, result) in self.downloader.poll_finished() {
            let Some(pending) = self.pending.remove(&status.id()) else {
                status.finish(&result);
                continue;
            };

            let outcome = match pending {
                PendingTransfer::Catalog { path } => {
                    self.catalog_transfer = None;
                    result
                        .map_err(AddonError::from)
                        .and_then(|()| self.load_downloaded_catalog(&path))
                }
                PendingTransfer::Install {
                    addon_id,
                    path,
                    md5,
                } => result
                    .map_err(AddonError::from)
                    .and_then(|()| self.complete_install(&addon_id, &path, &md5)),
                PendingTransfer::Screenshot { addon_id, path } => {
                    if result.is_ok() {
                        debug!(
                            "[ADDON-MANAGER] Cached screenshot of '{}' at {}",
                            addon_id,
                            path.display()
                        );
                    }
                    result.map_err(AddonError::from)
                }
            };

            if let Err(ref e) = outcome {
                warn!("[ADDON-MANAGER] Transfer #{} failed: {}", status.id(), e);
            }
            status.finish(&outcome);
        }
    }
}
