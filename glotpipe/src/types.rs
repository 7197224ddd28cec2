//! Core, format-agnostic types for glotpipe.
//! Parsers decode into these; encoders serialize these.

use std::collections::{BTreeMap, btree_map};
use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A single translatable string: its value and the developer comment
/// shown to translators.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Entry {
    /// Translated (or source-language) value.
    pub value: String,

    /// Comment for translators, without comment markers.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub comment: Option<String>,
}

impl Entry {
    pub fn new(value: impl Into<String>) -> Self {
        Entry {
            value: value.into(),
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        let comment = comment.into();
        self.comment = (!comment.trim().is_empty()).then_some(comment);
        self
    }
}

impl Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.comment {
            Some(comment) => write!(f, "{} ({})", self.value, comment),
            None => write!(f, "{}", self.value),
        }
    }
}

/// The content of one strings file: a mapping from unique key to [`Entry`].
///
/// Order is not meaningful; keys are kept sorted so every write of the same
/// table produces the same bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct StringsTable {
    entries: BTreeMap<String, Entry>,
}

impl StringsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, returning the one it replaced.
    pub fn insert(&mut self, key: impl Into<String>, entry: Entry) -> Option<Entry> {
        self.entries.insert(key.into(), entry)
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.entries.get_mut(key)
    }

    /// Shortcut for the value stored under `key`.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|e| e.value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Entry> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Entry> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns a copy of this table with every key re-keyed as `prefix + key`.
    pub fn with_prefix(&self, prefix: &str) -> StringsTable {
        self.entries
            .iter()
            .map(|(key, entry)| (format!("{prefix}{key}"), entry.clone()))
            .collect()
    }

    /// Returns the entries whose key starts with `prefix`, with the prefix
    /// stripped. Keys equal to the bare prefix are ignored.
    pub fn strip_prefix(&self, prefix: &str) -> StringsTable {
        self.entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .filter_map(|(key, entry)| {
                let stripped = &key[prefix.len()..];
                (!stripped.is_empty()).then(|| (stripped.to_string(), entry.clone()))
            })
            .collect()
    }

    /// Inserts every entry of `other`, replacing entries with the same key.
    pub fn extend_from(&mut self, other: &StringsTable) {
        for (key, entry) in other.iter() {
            self.entries.insert(key.clone(), entry.clone());
        }
    }
}

impl FromIterator<(String, Entry)> for StringsTable {
    fn from_iter<I: IntoIterator<Item = (String, Entry)>>(iter: I) -> Self {
        StringsTable {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for StringsTable {
    type Item = (String, Entry);
    type IntoIter = btree_map::IntoIter<String, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a StringsTable {
    type Item = (&'a String, &'a Entry);
    type IntoIter = btree_map::Iter<'a, String, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, &str)]) -> StringsTable {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Entry::new(*v)))
            .collect()
    }

    #[test]
    fn test_with_prefix_rekeys_every_entry() {
        let prefixed = table(&[("ok", "OK"), ("cancel", "Cancel")]).with_prefix("x.");
        assert_eq!(prefixed.len(), 2);
        assert_eq!(prefixed.value("x.ok"), Some("OK"));
        assert_eq!(prefixed.value("x.cancel"), Some("Cancel"));
        assert!(!prefixed.contains_key("ok"));
    }

    #[test]
    fn test_strip_prefix_only_matching_keys() {
        let merged = table(&[
            ("greeting", "Hi"),
            ("x.ok", "OK"),
            ("x.", "bare prefix"),
            ("xy.other", "no"),
            ("y.cancel", "Cancel"),
        ]);
        let stripped = merged.strip_prefix("x.");
        assert_eq!(stripped, table(&[("ok", "OK")]));
    }

    #[test]
    fn test_with_comment_ignores_blank() {
        assert_eq!(Entry::new("a").with_comment("  ").comment, None);
        assert_eq!(
            Entry::new("a").with_comment("shown on button").comment.as_deref(),
            Some("shown on button")
        );
    }

    #[test]
    fn test_extend_from_last_write_wins() {
        let mut base = table(&[("a", "1"), ("b", "2")]);
        base.extend_from(&table(&[("b", "3"), ("c", "4")]));
        assert_eq!(base, table(&[("a", "1"), ("b", "3"), ("c", "4")]));
    }

    #[test]
    fn test_serialize_as_plain_map() {
        let json = serde_json::to_string(&table(&[("a", "1")])).unwrap();
        assert_eq!(json, r#"{"a":{"value":"1"}}"#);
    }
}
