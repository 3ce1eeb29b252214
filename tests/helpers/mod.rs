//! Fixtures for add-on manager integration tests.
//!
//! Builds add-on archives and repository catalogs in temporary directories.
//! Catalog and archive URLs are plain file paths, which the default
//! transport copies from disk.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use supertux_addons::addons::{AddonManager, AddonObserver, md5_from_file};
use zip::write::SimpleFileOptions;

/// How long `pump_until` waits before giving up.
const PUMP_TIMEOUT: Duration = Duration::from_secs(10);

/// Writes a zip archive with the given entries.
pub fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    let mut writer = zip::ZipWriter::new(File::create(path).expect("create zip"));
    for (name, content) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start zip entry");
        writer.write_all(content.as_bytes()).expect("write zip entry");
    }
    writer.finish().expect("finish zip");
}

/// Renders a descriptor document.
pub fn descriptor(id: &str, addon_type: &str, format: i32, dependencies: &[&str]) -> String {
    let mut text = String::new();
    writeln!(text, "[supertux-addoninfo]").unwrap();
    writeln!(text, "id = {:?}", id).unwrap();
    writeln!(text, "version = 1").unwrap();
    writeln!(text, "type = {:?}", addon_type).unwrap();
    writeln!(text, "title = {:?}", format!("Title of {}", id)).unwrap();
    writeln!(text, "author = \"Tux\"").unwrap();
    writeln!(text, "license = \"GPL-2.0-or-later\"").unwrap();
    writeln!(text, "format = {}", format).unwrap();
    for dependency in dependencies {
        writeln!(text, "\n[[supertux-addoninfo.dependencies]]").unwrap();
        writeln!(text, "id = {:?}", dependency).unwrap();
    }
    text
}

/// Description of one add-on archive to build.
#[derive(Debug, Clone)]
pub struct ArchiveSpec {
    pub id: String,
    pub addon_type: String,
    pub format: i32,
    pub dependencies: Vec<String>,
    pub files: Vec<(String, String)>,
}

impl ArchiveSpec {
    /// A levelset mounted under `custom/<id>` with one level file.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            addon_type: "levelset".to_string(),
            format: 1,
            dependencies: Vec::new(),
            files: vec![(
                format!("levels/{}/intro.stl", id),
                format!("level of {}", id),
            )],
        }
    }

    pub fn addon_type(mut self, addon_type: &str) -> Self {
        self.addon_type = addon_type.to_string();
        self
    }

    pub fn format(mut self, format: i32) -> Self {
        self.format = format;
        self
    }

    pub fn depends_on(mut self, id: &str) -> Self {
        self.dependencies.push(id.to_string());
        self
    }

    /// Replaces the content files.
    pub fn files(mut self, files: &[(&str, &str)]) -> Self {
        self.files = files
            .iter()
            .map(|(n, c)| (n.to_string(), c.to_string()))
            .collect();
        self
    }

    /// Writes `<dir>/<id>.zip` and returns its path.
    pub fn write_to(&self, dir: &Path) -> PathBuf {
        self.write_as(&dir.join(format!("{}.zip", self.id)))
    }

    /// Writes the archive to an explicit path.
    pub fn write_as(&self, path: &Path) -> PathBuf {
        let dependencies: Vec<&str> = self.dependencies.iter().map(String::as_str).collect();
        let info = descriptor(&self.id, &self.addon_type, self.format, &dependencies);
        let info_name = format!("{}.nfo", self.id);

        let mut entries: Vec<(&str, &str)> = vec![(info_name.as_str(), info.as_str())];
        entries.extend(self.files.iter().map(|(n, c)| (n.as_str(), c.as_str())));
        write_zip(path, &entries);
        path.to_path_buf()
    }

    /// Writes the add-on as a loose directory `<dir>/<id>/`.
    pub fn write_dir(&self, dir: &Path) -> PathBuf {
        let root = dir.join(&self.id);
        fs::create_dir_all(&root).unwrap();
        let dependencies: Vec<&str> = self.dependencies.iter().map(String::as_str).collect();
        fs::write(
            root.join(format!("{}.nfo", self.id)),
            descriptor(&self.id, &self.addon_type, self.format, &dependencies),
        )
        .unwrap();
        for (name, content) in &self.files {
            let path = root.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        root
    }
}

/// One repository catalog record.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub id: String,
    pub addon_type: String,
    pub format: i32,
    pub version: i32,
    pub url: String,
    pub md5: String,
    pub dependencies: Vec<String>,
    pub screenshots: Vec<String>,
}

impl CatalogEntry {
    /// Entry pointing at an archive on disk, with its real hash.
    pub fn for_archive(spec: &ArchiveSpec, archive: &Path) -> Self {
        Self {
            id: spec.id.clone(),
            addon_type: spec.addon_type.clone(),
            format: spec.format,
            version: 1,
            url: archive.to_string_lossy().to_string(),
            md5: md5_from_file(archive).expect("hash archive"),
            dependencies: spec.dependencies.clone(),
            screenshots: Vec::new(),
        }
    }

    pub fn version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub fn md5(mut self, md5: &str) -> Self {
        self.md5 = md5.to_string();
        self
    }

    pub fn screenshot(mut self, url: &str) -> Self {
        self.screenshots.push(url.to_string());
        self
    }
}

/// Writes a repository catalog document.
pub fn write_catalog(path: &Path, entries: &[CatalogEntry]) {
    let mut text = String::from("[supertux-addons]\n");
    for entry in entries {
        writeln!(text, "\n[[supertux-addons.supertux-addoninfo]]").unwrap();
        writeln!(text, "id = {:?}", entry.id).unwrap();
        writeln!(text, "version = {}", entry.version).unwrap();
        writeln!(text, "type = {:?}", entry.addon_type).unwrap();
        writeln!(text, "title = {:?}", format!("Title of {}", entry.id)).unwrap();
        writeln!(text, "url = {:?}", entry.url).unwrap();
        writeln!(text, "md5 = {:?}", entry.md5).unwrap();
        writeln!(text, "format = {}", entry.format).unwrap();
        for url in &entry.screenshots {
            writeln!(text, "[[supertux-addons.supertux-addoninfo.screenshots]]").unwrap();
            writeln!(text, "url = {:?}", url).unwrap();
        }
        for dependency in &entry.dependencies {
            writeln!(text, "[[supertux-addons.supertux-addoninfo.dependencies]]").unwrap();
            writeln!(text, "id = {:?}", dependency).unwrap();
        }
    }
    fs::write(path, text).expect("write catalog");
}

/// Calls `update()` until `done` holds or the timeout expires.
pub fn pump_until(manager: &mut AddonManager, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + PUMP_TIMEOUT;
    loop {
        manager.update();
        if done() {
            return true;
        }
        if Instant::now() > deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
}

/// Observer recording everything it is told.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    pub messages: Arc<Mutex<Vec<String>>>,
    pub refreshes: Arc<AtomicUsize>,
}

impl RecordingObserver {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

impl AddonObserver for RecordingObserver {
    fn show_message(&mut self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }

    fn refresh_addon_browser(&mut self) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
    }
}
