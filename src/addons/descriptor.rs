//! Add-on descriptor and catalog parsing.
//!
//! Descriptors (`*.nfo`) are TOML documents whose root table is
//! `[supertux-addoninfo]`:
//!
//! ```toml
//! [supertux-addoninfo]
//! id = "forest-levels"
//! version = 3
//! type = "levelset"
//! title = "Forest Levels"
//! format = 1
//!
//! [[supertux-addoninfo.screenshots]]
//! url = "https://example.org/forest-1.png"
//!
//! [[supertux-addoninfo.dependencies]]
//! id = "forest-tiles"
//! ```
//!
//! A repository catalog is a `[supertux-addons]` table holding an array of
//! such records under the `supertux-addoninfo` key.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use super::types::{Addon, AddonError, AddonType, is_valid_addon_id};
use crate::vfs::SearchPath;

/// Root tag of a descriptor document.
pub const ADDON_INFO_TAG: &str = "supertux-addoninfo";

/// Root tag of a catalog document.
pub const ADDON_LIST_TAG: &str = "supertux-addons";

/// File extension of descriptor documents.
pub const DESCRIPTOR_EXTENSION: &str = ".nfo";

/// Raw descriptor fields as they appear in the document.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AddonRecord {
    id: Option<String>,
    version: i32,
    #[serde(rename = "type")]
    addon_type: Option<String>,
    title: String,
    author: String,
    license: String,
    description: String,
    url: String,
    md5: String,
    format: i32,
    screenshots: Vec<ScreenshotRecord>,
    dependencies: Vec<DependencyRecord>,
}

#[derive(Debug, Deserialize)]
struct ScreenshotRecord {
    url: String,
}

#[derive(Debug, Deserialize)]
struct DependencyRecord {
    id: String,
}

impl Addon {
    /// Builds a descriptor from the fields of one record.
    ///
    /// Only `id` is mandatory; every other field defaults to empty/zero.
    pub fn parse(record: &toml::Table) -> Result<Self, AddonError> {
        let record: AddonRecord = toml::Value::Table(record.clone())
            .try_into()
            .map_err(|e: toml::de::Error| AddonError::Malformed(e.message().to_string()))?;

        let id = match record.id {
            Some(id) if !id.is_empty() => id,
            _ => return Err(AddonError::MissingId),
        };
        if !is_valid_addon_id(&id) {
            return Err(AddonError::InvalidId(id));
        }

        let addon_type = match record.addon_type {
            Some(name) => AddonType::parse(&name).ok_or(AddonError::UnknownType(name))?,
            None => AddonType::default(),
        };

        Ok(Self {
            id,
            version: record.version,
            addon_type,
            title: record.title,
            author: record.author,
            license: record.license,
            description: record.description,
            url: record.url,
            md5: record.md5,
            format: record.format,
            screenshots: record.screenshots.into_iter().map(|s| s.url).collect(),
            dependencies: record.dependencies.into_iter().map(|d| d.id).collect(),
            install_filename: None,
            enabled: false,
        })
    }

    /// Parses a complete descriptor document.
    ///
    /// `source_name` is only used in error messages.
    pub fn parse_document(text: &str, source_name: &str) -> Result<Self, AddonError> {
        let parse = || -> Result<Self, AddonError> {
            let root: toml::Table = text
                .parse()
                .map_err(|e: toml::de::Error| AddonError::Malformed(e.message().to_string()))?;
            let record = root
                .get(ADDON_INFO_TAG)
                .and_then(toml::Value::as_table)
                .ok_or_else(|| AddonError::WrongRootTag {
                    path: source_name.to_string(),
                    expected: ADDON_INFO_TAG,
                })?;
            Self::parse(record)
        };
        parse().map_err(|e| e.in_file(source_name))
    }

    /// Loads and parses a descriptor through the search path.
    pub fn parse_file(search_path: &SearchPath, vpath: &str) -> Result<Self, AddonError> {
        let text = search_path
            .read_to_string(vpath)
            .map_err(|e| AddonError::from(e).in_file(vpath))?;
        Self::parse_document(&text, vpath)
    }
}

/// Parses a repository catalog document.
///
/// Unknown keys and broken entries are logged and skipped; only a missing
/// root tag or unreadable TOML fails the whole catalog.
pub fn parse_addon_list(text: &str, source_name: &str) -> Result<BTreeMap<String, Addon>, AddonError> {
    let root: toml::Table = text
        .parse()
        .map_err(|e: toml::de::Error| {
            AddonError::Malformed(e.message().to_string()).in_file(source_name)
        })?;

    let list = root
        .get(ADDON_LIST_TAG)
        .and_then(toml::Value::as_table)
        .ok_or_else(|| AddonError::WrongRootTag {
            path: source_name.to_string(),
            expected: ADDON_LIST_TAG,
        })?;

    let mut addons = BTreeMap::new();
    for (key, value) in list {
        if key != ADDON_INFO_TAG {
            warn!("[ADDON-CATALOG] Unknown token '{}' in add-on list", key);
            continue;
        }

        let Some(entries) = value.as_array() else {
            warn!("[ADDON-CATALOG] '{}' is not a list of records", key);
            continue;
        };

        for entry in entries {
            let Some(record) = entry.as_table() else {
                warn!("[ADDON-CATALOG] Skipping non-table entry in add-on list");
                continue;
            };
            match Addon::parse(record) {
                Ok(addon) => {
                    debug!("[ADDON-CATALOG] Found repository add-on '{}'", addon.id());
                    if addons.contains_key(addon.id()) {
                        warn!("[ADDON-CATALOG] Duplicate add-on '{}', keeping the later entry", addon.id());
                    }
                    addons.insert(addon.id().to_string(), addon);
                }
                Err(e) => {
                    warn!("[ADDON-CATALOG] Problem when reading add-on info: {}", e);
                }
            }
        }
    }

    Ok(addons)
}

/// Reads and parses a catalog file from disk.
pub fn parse_addon_infos(path: &Path) -> Result<BTreeMap<String, Addon>, AddonError> {
    let text = fs::read_to_string(path)?;
    parse_addon_list(&text, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn record(text: &str) -> toml::Table {
        text.parse().unwrap()
    }

    #[test]
    fn test_parse_full_record() {
        let addon = Addon::parse(&record(
            r#"
            id = "forest"
            version = 3
            type = "levelset"
            title = "Forest"
            author = "Tux"
            license = "GPL-2.0"
            description = "Trees"
            url = "https://example.org/forest.zip"
            md5 = "abc"
            format = 1

            [[screenshots]]
            url = "https://example.org/1.png"
            [[screenshots]]
            url = "https://example.org/2.jpg"

            [[dependencies]]
            id = "tiles"
            "#,
        ))
        .unwrap();

        assert_eq!(addon.id(), "forest");
        assert_eq!(addon.version(), 3);
        assert_eq!(addon.addon_type(), AddonType::Levelset);
        assert_eq!(addon.title(), "Forest");
        assert_eq!(addon.author(), "Tux");
        assert_eq!(addon.license(), "GPL-2.0");
        assert_eq!(addon.description(), "Trees");
        assert_eq!(addon.url(), "https://example.org/forest.zip");
        assert_eq!(addon.md5(), "abc");
        assert_eq!(addon.format(), 1);
        assert_eq!(
            addon.screenshots(),
            ["https://example.org/1.png", "https://example.org/2.jpg"]
        );
        assert_eq!(addon.dependencies(), ["tiles"]);
        assert!(!addon.is_installed());
        assert!(!addon.is_enabled());
    }

    #[test]
    fn test_parse_defaults() {
        let addon = Addon::parse(&record(r#"id = "bare""#)).unwrap();
        assert_eq!(addon.version(), 0);
        assert_eq!(addon.format(), Addon::ORIGINAL);
        assert_eq!(addon.addon_type(), AddonType::Addon);
        assert_eq!(addon.title(), "");
        assert!(addon.screenshots().is_empty());
        assert!(addon.dependencies().is_empty());
    }

    #[test]
    fn test_parse_missing_or_empty_id() {
        assert!(matches!(
            Addon::parse(&record(r#"title = "x""#)),
            Err(AddonError::MissingId)
        ));
        assert!(matches!(
            Addon::parse(&record(r#"id = """#)),
            Err(AddonError::MissingId)
        ));
    }

    #[test]
    fn test_parse_unknown_type() {
        let err = Addon::parse(&record("id = \"a\"\ntype = \"spaceship\"")).unwrap_err();
        assert!(matches!(err, AddonError::UnknownType(ref t) if t == "spaceship"));
        assert!(err.to_string().contains("spaceship"));
    }

    #[test]
    fn test_parse_all_types() {
        for addon_type in AddonType::ALL {
            let text = format!("id = \"a\"\ntype = \"{}\"", addon_type);
            assert_eq!(Addon::parse(&record(&text)).unwrap().addon_type(), addon_type);
        }
    }

    #[test]
    fn test_parse_malformed_nested() {
        let err = Addon::parse(&record("id = \"a\"\n[[screenshots]]\nlink = \"x\"")).unwrap_err();
        assert!(matches!(err, AddonError::Malformed(_)));

        let err = Addon::parse(&record("id = \"a\"\ndependencies = \"b\"")).unwrap_err();
        assert!(matches!(err, AddonError::Malformed(_)));
    }

    #[test]
    fn test_parse_document_checks_root_tag() {
        let ok = Addon::parse_document("[supertux-addoninfo]\nid = \"a\"", "a.nfo").unwrap();
        assert_eq!(ok.id(), "a");

        let err = Addon::parse_document("[something-else]\nid = \"a\"", "a.nfo").unwrap_err();
        assert!(err.to_string().contains("a.nfo"));
        assert!(matches!(
            err,
            AddonError::Descriptor { ref source, .. }
                if matches!(**source, AddonError::WrongRootTag { .. })
        ));
    }

    #[test]
    fn test_parse_document_wraps_path() {
        let err = Addon::parse_document("[supertux-addoninfo]\nid = \"no way\"", "dir/x.nfo").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("dir/x.nfo"));
        assert!(message.contains("no way"));
    }

    #[test]
    fn test_parse_addon_list_skips_bad_entries() {
        let text = r#"
            [supertux-addons]
            mystery = 1

            [[supertux-addons.supertux-addoninfo]]
            id = "one"
            version = 1

            [[supertux-addons.supertux-addoninfo]]
            id = "bad id"

            [[supertux-addons.supertux-addoninfo]]
            id = "two"
            type = "world"
        "#;
        let addons = parse_addon_list(text, "repository.nfo").unwrap();
        assert_eq!(
            addons.keys().cloned().collect::<Vec<_>>(),
            vec!["one".to_string(), "two".to_string()]
        );
        assert_eq!(addons["two"].addon_type(), AddonType::World);
    }

    #[test]
    fn test_parse_addon_list_wrong_root() {
        assert!(matches!(
            parse_addon_list("[supertux-addoninfo]\nid = \"x\"", "r.nfo"),
            Err(AddonError::WrongRootTag { .. })
        ));
        assert!(parse_addon_list("this is = = not toml", "r.nfo").is_err());
    }

    proptest! {
        #[test]
        fn prop_valid_ids_parse(id in "[-_0-9A-Za-z]{1,24}") {
            let text = format!("id = {:?}", id);
            let addon = Addon::parse(&record(&text)).unwrap();
            prop_assert_eq!(addon.id(), id.as_str());
            prop_assert_eq!(addon.filename(), format!("{}.zip", id));
        }

        #[test]
        fn prop_invalid_ids_fail_naming_the_id(
            prefix in "[a-z]{0,4}",
            bad in "[ ./!@#$%^&*()+=:;,?]",
            suffix in "[a-z]{0,4}",
        ) {
            let id = format!("{}{}{}", prefix, bad, suffix);
            let mut table = toml::Table::new();
            table.insert("id".to_string(), toml::Value::String(id.clone()));
            let err = Addon::parse(&table).unwrap_err();
            prop_assert!(err.to_string().contains(&id));
        }
    }
}
