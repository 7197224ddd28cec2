//! File-level helpers for reading and writing [`StringsTable`]s.
//!
//! Pipeline stages go through these instead of the format types so that
//! every generated file gets the same header and byte-stable layout.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::{
    error::{Error, Result},
    formats::StringsFormat,
    traits::Parser,
    types::StringsTable,
};

/// Name of the merged strings file inside every `.lproj` directory.
pub const LOCALIZABLE: &str = "Localizable.strings";

/// Reads a `.strings` file into a table.
pub fn read_table(path: impl AsRef<Path>) -> Result<StringsTable> {
    let path = path.as_ref();
    let table = StringsFormat::read_from(path)?.into_table();
    debug!(path = %path.display(), entries = table.len(), "read strings file");
    Ok(table)
}

/// Reads a `.strings` file along with the language recorded in its header.
pub fn read_table_with_language(path: impl AsRef<Path>) -> Result<(String, StringsTable)> {
    let format = StringsFormat::read_from(path.as_ref())?;
    Ok((format.language.clone(), format.into_table()))
}

/// Reads a `.strings` file, returning an empty table when it does not exist.
pub fn read_table_or_empty(path: impl AsRef<Path>) -> Result<StringsTable> {
    let path = path.as_ref();
    if path.exists() {
        read_table(path)
    } else {
        Ok(StringsTable::new())
    }
}

/// Serializes a table the way [`write_table`] would write it.
pub fn render_table(language: &str, table: &StringsTable) -> Result<String> {
    StringsFormat::new(language, table).to_string_lossy()
}

/// Writes a table, creating parent directories.
pub fn write_table(path: impl AsRef<Path>, language: &str, table: &StringsTable) -> Result<()> {
    let path = path.as_ref();
    StringsFormat::new(language, table).write_to(path)?;
    debug!(path = %path.display(), entries = table.len(), "wrote strings file");
    Ok(())
}

/// Writes a table only when the rendered bytes differ from what is on disk.
///
/// Returns `true` when the file was created or changed.
pub fn write_table_if_changed(
    path: impl AsRef<Path>,
    language: &str,
    table: &StringsTable,
) -> Result<bool> {
    let path = path.as_ref();
    let rendered = render_table(language, table)?;
    match fs::read(path) {
        Ok(existing) if existing == rendered.as_bytes() => {
            debug!(path = %path.display(), "strings file unchanged");
            return Ok(false);
        }
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::file(path, e)),
    }
    write_text(path, &rendered)?;
    Ok(true)
}

/// Writes raw text, creating parent directories.
pub fn write_text(path: impl AsRef<Path>, content: &str) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::file(parent, e))?;
    }
    fs::write(path, content).map_err(|e| Error::file(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Entry;
    use tempfile::TempDir;

    fn sample() -> StringsTable {
        [("greeting".to_string(), Entry::new("Hi").with_comment("Home screen"))]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_write_then_read_table() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("en.lproj").join("Localizable.strings");
        write_table(&path, "en", &sample()).unwrap();
        assert_eq!(read_table(&path).unwrap(), sample());
    }

    #[test]
    fn test_write_if_changed_reports_changes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("fr.lproj").join("Localizable.strings");
        assert!(write_table_if_changed(&path, "fr", &sample()).unwrap());
        assert!(!write_table_if_changed(&path, "fr", &sample()).unwrap());

        let mut changed = sample();
        changed.insert("bye", Entry::new("Salut"));
        assert!(write_table_if_changed(&path, "fr", &changed).unwrap());
    }

    #[test]
    fn test_read_missing_file_or_empty() {
        let temp = TempDir::new().unwrap();
        let table = read_table_or_empty(temp.path().join("nope.strings")).unwrap();
        assert!(table.is_empty());
        assert!(read_table(temp.path().join("nope.strings")).is_err());
    }
}
