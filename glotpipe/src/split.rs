//! Redistributing downloaded translations back into the hand-maintained
//! `.strings` files merged by [`crate::merge`].

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{
    codec::{self, LOCALIZABLE},
    error::{Error, Result},
    merge::ManualFileTable,
    types::StringsTable,
};

/// Returns the entries of `downloaded` that belong to the manual file with
/// `prefix`, keyed by their original (unprefixed) key.
pub fn split_table(downloaded: &StringsTable, prefix: &str) -> StringsTable {
    downloaded.strip_prefix(prefix)
}

/// A file the splitter wants to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitTarget {
    /// Locale copy of the manual file, e.g. `.../fr.lproj/InfoPlist.strings`.
    pub path: PathBuf,
    /// `.lproj` code written to the file header.
    pub language: String,
    pub table: StringsTable,
}

/// Computes the per-locale manual files for already-loaded downloads.
///
/// `downloads` pairs an `.lproj` directory name (`fr.lproj`) with the merged
/// table found there. A manual file is never written over its own base
/// locale, and locales with no key for a manual file produce nothing.
pub fn plan_split(
    downloads: &[(String, StringsTable)],
    manual: &ManualFileTable,
) -> Result<Vec<SplitTarget>> {
    manual.validate()?;

    let mut targets = Vec::new();
    for (lproj_dir, downloaded) in downloads {
        let language = lproj_dir.trim_end_matches(".lproj").to_string();
        for file in manual {
            if file.base_lproj_dir() == Some(lproj_dir.as_str()) {
                continue;
            }
            let table = split_table(downloaded, &file.prefix);
            if table.is_empty() {
                debug!(locale = %language, prefix = %file.prefix, "no translated keys for manual file");
                continue;
            }
            targets.push(SplitTarget {
                path: file.localized_path(lproj_dir)?,
                language: language.clone(),
                table,
            });
        }
    }
    Ok(targets)
}

/// Lists the `.lproj` directories under `parent` that contain a
/// `Localizable.strings`, sorted by name.
pub fn find_lproj_dirs(parent: &Path) -> Result<Vec<String>> {
    let mut dirs = Vec::new();
    for dent in fs::read_dir(parent).map_err(|e| Error::file(parent, e))? {
        let dent = dent.map_err(|e| Error::file(parent, e))?;
        let name = dent.file_name().to_string_lossy().into_owned();
        if name.ends_with(".lproj") && dent.path().join(LOCALIZABLE).is_file() {
            dirs.push(name);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Reads every `<lproj>/Localizable.strings` under `source_parent_dir` and
/// writes each manual file's keys to that file's locale copies.
///
/// Returns the paths that were created or changed, for a selective commit.
pub fn extract_keys_from_strings_files(
    source_parent_dir: &Path,
    manual: &ManualFileTable,
) -> Result<Vec<PathBuf>> {
    manual.validate()?;

    let downloads = find_lproj_dirs(source_parent_dir)?
        .into_iter()
        .map(|dir| {
            let table = codec::read_table(source_parent_dir.join(&dir).join(LOCALIZABLE))?;
            Ok((dir, table))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut modified = Vec::new();
    for target in plan_split(&downloads, manual)? {
        if codec::write_table_if_changed(&target.path, &target.language, &target.table)? {
            debug!(path = %target.path.display(), entries = target.table.len(), "updated manual translation");
            modified.push(target.path);
        }
    }

    info!(
        locales = downloads.len(),
        modified = modified.len(),
        "extracted manual keys from downloaded translations"
    );
    Ok(modified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::ManualFile;
    use crate::types::Entry;

    fn table(pairs: &[(&str, &str)]) -> StringsTable {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Entry::new(*v)))
            .collect()
    }

    fn manual() -> ManualFileTable {
        ManualFileTable::new(vec![
            ManualFile::new("A/en.lproj/A.strings", "x."),
            ManualFile::new("B/en.lproj/B.strings", "y."),
        ])
        .unwrap()
    }

    #[test]
    fn test_split_greeting_example() {
        let fr = table(&[("greeting", "Salut"), ("x.ok", "Valider"), ("y.cancel", "Annuler")]);
        let targets = plan_split(&[("fr.lproj".to_string(), fr)], &manual()).unwrap();

        assert_eq!(
            targets,
            vec![
                SplitTarget {
                    path: PathBuf::from("A/fr.lproj/A.strings"),
                    language: "fr".to_string(),
                    table: table(&[("ok", "Valider")]),
                },
                SplitTarget {
                    path: PathBuf::from("B/fr.lproj/B.strings"),
                    language: "fr".to_string(),
                    table: table(&[("cancel", "Annuler")]),
                },
            ]
        );
    }

    #[test]
    fn test_base_locale_and_untranslated_are_skipped() {
        let en = table(&[("x.ok", "OK"), ("y.cancel", "Cancel")]);
        let de = table(&[("x.ok", "OK")]);
        let targets = plan_split(
            &[("de.lproj".to_string(), de), ("en.lproj".to_string(), en)],
            &manual(),
        )
        .unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].path, PathBuf::from("A/de.lproj/A.strings"));
    }

    #[test]
    fn test_split_table_strips_prefix() {
        let merged = table(&[("infoplist.NSCameraUsageDescription", "Caméra"), ("other", "x")]);
        assert_eq!(
            split_table(&merged, "infoplist."),
            table(&[("NSCameraUsageDescription", "Caméra")])
        );
    }
}
