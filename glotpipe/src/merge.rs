//! Merging hand-maintained `.strings` files into the canonical
//! `Localizable.strings` under per-file key prefixes.
//!
//! The keys are split back out by [`crate::split`] once translations are
//! downloaded.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    codec,
    error::{Error, Result},
    formats::FormatType,
    types::StringsTable,
};

/// A `.strings` file maintained by hand, outside of code extraction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ManualFile {
    /// Path of the base-locale copy, e.g. `WordPress/Resources/en.lproj/InfoPlist.strings`.
    pub path: PathBuf,
    /// Prefix prepended to every key of this file in the canonical file.
    pub prefix: String,
}

impl ManualFile {
    pub fn new(path: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        ManualFile {
            path: path.into(),
            prefix: prefix.into(),
        }
    }

    /// File name shared by every locale copy (`InfoPlist.strings`).
    pub fn file_name(&self) -> Result<&str> {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::config(format!("`{}` has no file name", self.path.display())))
    }

    /// Name of the `.lproj` directory holding the base-locale copy (`en.lproj`).
    pub fn base_lproj_dir(&self) -> Option<&str> {
        self.path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .filter(|n| n.ends_with(".lproj"))
    }

    /// Directory containing the per-locale `.lproj` directories.
    pub fn resources_dir(&self) -> Result<&Path> {
        if self.base_lproj_dir().is_none() {
            return Err(Error::config(format!(
                "`{}` is not inside an .lproj directory",
                self.path.display()
            )));
        }
        Ok(self
            .path
            .parent()
            .and_then(Path::parent)
            .unwrap_or_else(|| Path::new("")))
    }

    /// Path of this file's copy for the given `.lproj` directory name.
    pub fn localized_path(&self, lproj_dir: &str) -> Result<PathBuf> {
        Ok(self.resources_dir()?.join(lproj_dir).join(self.file_name()?))
    }
}

/// Ordered list of manual files with their prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ManualFileTable {
    files: Vec<ManualFile>,
}

impl ManualFileTable {
    pub fn new(files: Vec<ManualFile>) -> Result<Self> {
        let table = ManualFileTable { files };
        table.validate()?;
        Ok(table)
    }

    /// The manual files of the WordPress/Jetpack app, relative to `root`.
    pub fn wordpress(root: &Path) -> Self {
        let wordpress = root.join("WordPress");
        ManualFileTable {
            files: vec![
                // Shared by WordPress and Jetpack
                ManualFile::new(
                    wordpress.join("Resources/en.lproj/InfoPlist.strings"),
                    "infoplist.",
                ),
                // Display name of the "Save as Draft" share action
                ManualFile::new(
                    wordpress.join("WordPressDraftActionExtension/en.lproj/InfoPlist.strings"),
                    "ios-sharesheet.",
                ),
                // Strings of the widget's .intentdefinition
                ManualFile::new(
                    wordpress.join("WordPressIntents/en.lproj/Sites.strings"),
                    "ios-widget.",
                ),
            ],
        }
    }

    /// Rejects paths that are not `.strings` files, empty and duplicate
    /// prefixes, and prefixes that start with another prefix (their keys
    /// could not be told apart when splitting).
    pub fn validate(&self) -> Result<()> {
        for (i, file) in self.files.iter().enumerate() {
            if FormatType::from_path(&file.path) != Some(FormatType::Strings) {
                return Err(Error::config(format!(
                    "`{}` is not a .strings file",
                    file.path.display()
                )));
            }
            if file.prefix.is_empty() {
                return Err(Error::config(format!(
                    "`{}` has an empty prefix",
                    file.path.display()
                )));
            }
            for other in &self.files[..i] {
                if other.prefix == file.prefix {
                    return Err(Error::DuplicatePrefix {
                        prefix: file.prefix.clone(),
                        first: other.path.clone(),
                        second: file.path.clone(),
                    });
                }
                if other.prefix.starts_with(&file.prefix) || file.prefix.starts_with(&other.prefix)
                {
                    return Err(Error::config(format!(
                        "prefixes `{}` and `{}` overlap",
                        other.prefix, file.prefix
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ManualFile> {
        self.files.iter()
    }
}

impl<'a> IntoIterator for &'a ManualFileTable {
    type Item = &'a ManualFile;
    type IntoIter = std::slice::Iter<'a, ManualFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

/// Merges manual tables into `canonical`, re-keying each entry as
/// `prefix + key`.
///
/// Entries of `canonical` with the same key are overwritten, so merging an
/// already-merged table again yields the same table. Two manual files that
/// share a prefix, or that produce the same prefixed key, are rejected.
pub fn merge_tables(
    canonical: &StringsTable,
    manual: &[(&ManualFile, StringsTable)],
) -> Result<StringsTable> {
    let mut prefixes: HashMap<&str, &Path> = HashMap::new();
    for (file, _) in manual {
        if let Some(first) = prefixes.insert(file.prefix.as_str(), file.path.as_path()) {
            return Err(Error::DuplicatePrefix {
                prefix: file.prefix.clone(),
                first: first.to_path_buf(),
                second: file.path.clone(),
            });
        }
    }

    let mut owners: HashMap<String, &Path> = HashMap::new();
    let mut merged = canonical.clone();
    for (file, table) in manual {
        for (key, entry) in table.with_prefix(&file.prefix) {
            if let Some(first) = owners.get(&key)
                && *first != file.path.as_path()
            {
                return Err(Error::PrefixCollision {
                    key,
                    first: first.to_path_buf(),
                    second: file.path.clone(),
                });
            }
            owners.insert(key.clone(), file.path.as_path());
            merged.insert(key, entry);
        }
    }
    Ok(merged)
}

/// Merges every manual file into the `.strings` file at `destination`,
/// rewriting it in place.
pub fn merge_files(destination: &Path, manual: &ManualFileTable) -> Result<StringsTable> {
    merge_files_to(destination, destination, manual)
}

/// Merges `canonical` and every manual file, writing the result to
/// `destination`.
///
/// All inputs are read and checked before `destination` is touched.
pub fn merge_files_to(
    canonical: &Path,
    destination: &Path,
    manual: &ManualFileTable,
) -> Result<StringsTable> {
    manual.validate()?;

    let (language, canonical) = codec::read_table_with_language(canonical)?;
    let tables = manual
        .iter()
        .map(|file| Ok((file, codec::read_table(&file.path)?)))
        .collect::<Result<Vec<_>>>()?;

    let merged = merge_tables(&canonical, &tables)?;
    for (file, table) in &tables {
        debug!(path = %file.path.display(), prefix = %file.prefix, entries = table.len(), "merged manual file");
    }

    codec::write_table(destination, &language, &merged)?;
    info!(
        destination = %destination.display(),
        files = tables.len(),
        entries = merged.len(),
        "merged manual strings files"
    );
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Entry;

    fn table(pairs: &[(&str, &str)]) -> StringsTable {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Entry::new(*v)))
            .collect()
    }

    #[test]
    fn test_merge_greeting_example() {
        let a = ManualFile::new("A/en.lproj/A.strings", "x.");
        let b = ManualFile::new("B/en.lproj/B.strings", "y.");
        let merged = merge_tables(
            &table(&[("greeting", "Hi")]),
            &[(&a, table(&[("ok", "OK")])), (&b, table(&[("cancel", "Cancel")]))],
        )
        .unwrap();
        assert_eq!(
            merged,
            table(&[("greeting", "Hi"), ("x.ok", "OK"), ("y.cancel", "Cancel")])
        );
    }

    #[test]
    fn test_merge_is_idempotent() {
        let a = ManualFile::new("A/en.lproj/A.strings", "x.");
        let manual = [(&a, table(&[("ok", "OK")]))];
        let once = merge_tables(&table(&[("greeting", "Hi")]), &manual).unwrap();
        let twice = merge_tables(&once, &manual).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_manual_entry_overwrites_canonical_on_exact_key() {
        let a = ManualFile::new("A/en.lproj/A.strings", "x.");
        let merged = merge_tables(
            &table(&[("x.ok", "stale")]),
            &[(&a, table(&[("ok", "OK")]))],
        )
        .unwrap();
        assert_eq!(merged.value("x.ok"), Some("OK"));
    }

    #[test]
    fn test_duplicate_prefix_rejected() {
        let a = ManualFile::new("A/en.lproj/A.strings", "x.");
        let b = ManualFile::new("B/en.lproj/B.strings", "x.");
        let err = merge_tables(
            &StringsTable::new(),
            &[(&a, table(&[("ok", "OK")])), (&b, table(&[("no", "No")]))],
        )
        .unwrap_err();
        assert!(matches!(err, Error::DuplicatePrefix { .. }));
    }

    #[test]
    fn test_prefixed_key_collision_rejected() {
        let a = ManualFile::new("A/en.lproj/A.strings", "a.");
        let b = ManualFile::new("B/en.lproj/B.strings", "a.b.");
        let err = merge_tables(
            &StringsTable::new(),
            &[(&a, table(&[("b.c", "1")])), (&b, table(&[("c", "2")]))],
        )
        .unwrap_err();
        assert!(matches!(err, Error::PrefixCollision { ref key, .. } if key == "a.b.c"));
    }

    #[test]
    fn test_table_validation() {
        ManualFileTable::wordpress(Path::new(".")).validate().unwrap();

        let overlapping = ManualFileTable::new(vec![
            ManualFile::new("A/en.lproj/A.strings", "ios-"),
            ManualFile::new("B/en.lproj/B.strings", "ios-widget."),
        ]);
        assert!(matches!(overlapping, Err(Error::Config(_))));

        let empty = ManualFileTable::new(vec![ManualFile::new("A/en.lproj/A.strings", "")]);
        assert!(matches!(empty, Err(Error::Config(_))));

        let catalog = ManualFileTable::new(vec![ManualFile::new("A/AppStoreStrings.po", "a.")]);
        assert!(matches!(catalog, Err(Error::Config(_))));
    }

    #[test]
    fn test_localized_path() {
        let file = ManualFile::new("WordPress/Resources/en.lproj/InfoPlist.strings", "infoplist.");
        assert_eq!(file.base_lproj_dir(), Some("en.lproj"));
        assert_eq!(
            file.localized_path("fr.lproj").unwrap(),
            PathBuf::from("WordPress/Resources/fr.lproj/InfoPlist.strings")
        );

        let loose = ManualFile::new("InfoPlist.strings", "x.");
        assert!(loose.localized_path("fr.lproj").is_err());
    }
}
