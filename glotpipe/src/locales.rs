//! Locale tables mapping GlotPress locale codes to `.lproj` directory codes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use unic_langid::LanguageIdentifier;

use crate::error::{Error, Result};

/// One locale, as known by GlotPress and by the app bundle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Locale {
    /// GlotPress locale code, e.g. `zh-cn`.
    pub glotpress: String,
    /// Resource directory code, e.g. `zh-Hans`.
    pub lproj: String,
}

impl Locale {
    pub fn new(glotpress: impl Into<String>, lproj: impl Into<String>) -> Self {
        Locale {
            glotpress: glotpress.into(),
            lproj: lproj.into(),
        }
    }

    /// `<lproj>.lproj`
    pub fn lproj_dir_name(&self) -> String {
        format!("{}.lproj", self.lproj)
    }

    /// `<root>/<lproj>.lproj/<file_name>`
    pub fn resource_path(&self, root: &Path, file_name: &str) -> PathBuf {
        root.join(self.lproj_dir_name()).join(file_name)
    }
}

/// Ordered, immutable GlotPress → lproj lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct LocaleTable {
    locales: Vec<Locale>,
}

const WORDPRESS_LOCALES: &[(&str, &str)] = &[
    ("ar", "ar"),
    ("bg", "bg"),
    ("cs", "cs"),
    ("cy", "cy"),
    ("da", "da"),
    ("de", "de"),
    ("en-au", "en-AU"),
    ("en-ca", "en-CA"),
    ("en-gb", "en-GB"),
    ("es", "es"),
    ("fr", "fr"),
    ("he", "he"),
    ("hr", "hr"),
    ("hu", "hu"),
    ("id", "id"),
    ("is", "is"),
    ("it", "it"),
    ("ja", "ja"),
    ("ko", "ko"),
    ("nb", "nb"),
    ("nl", "nl"),
    ("pl", "pl"),
    ("pt", "pt"),
    ("pt-br", "pt-BR"),
    ("ro", "ro"),
    ("ru", "ru"),
    ("sk", "sk"),
    ("sq", "sq"),
    ("sv", "sv"),
    ("th", "th"),
    ("tr", "tr"),
    ("zh-cn", "zh-Hans"),
    ("zh-tw", "zh-Hant"),
];

/// The sixteen locales whose translation progress gates a release.
const MAG16: &[&str] = &[
    "ar", "de", "es", "fr", "he", "id", "it", "ja", "ko", "nl", "pt-br", "ru", "sv", "tr",
    "zh-cn", "zh-tw",
];

impl LocaleTable {
    /// Builds a table and validates it.
    pub fn new(locales: Vec<Locale>) -> Result<Self> {
        let table = LocaleTable { locales };
        table.validate()?;
        Ok(table)
    }

    /// The locales the app ships translations for.
    pub fn wordpress() -> Self {
        LocaleTable {
            locales: WORDPRESS_LOCALES
                .iter()
                .map(|(gp, lproj)| Locale::new(*gp, *lproj))
                .collect(),
        }
    }

    /// The release-gating subset of [`LocaleTable::wordpress`].
    pub fn mag16() -> Self {
        let all = Self::wordpress();
        LocaleTable {
            locales: all
                .locales
                .into_iter()
                .filter(|l| MAG16.contains(&l.glotpress.as_str()))
                .collect(),
        }
    }

    /// Rejects duplicate codes on either side and malformed lproj codes.
    pub fn validate(&self) -> Result<()> {
        let mut glotpress = HashSet::new();
        let mut lproj = HashSet::new();
        for locale in &self.locales {
            if !glotpress.insert(locale.glotpress.as_str()) {
                return Err(Error::InvalidLocaleTable(format!(
                    "GlotPress code `{}` is listed twice",
                    locale.glotpress
                )));
            }
            if !lproj.insert(locale.lproj.as_str()) {
                return Err(Error::InvalidLocaleTable(format!(
                    "lproj code `{}` is listed twice",
                    locale.lproj
                )));
            }
            if locale.lproj.parse::<LanguageIdentifier>().is_err() {
                return Err(Error::InvalidLocaleTable(format!(
                    "`{}` is not a valid language identifier",
                    locale.lproj
                )));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.locales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locales.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Locale> {
        self.locales.iter()
    }

    /// Looks up a GlotPress code. An unmapped code is a configuration error.
    pub fn lookup(&self, glotpress: &str) -> Result<&Locale> {
        self.locales
            .iter()
            .find(|l| l.glotpress == glotpress)
            .ok_or_else(|| Error::UnmappedLocale(glotpress.to_string()))
    }

    /// Resolves a list of GlotPress codes, or the whole table when `codes` is
    /// empty. Fails on the first unmapped code.
    pub fn resolve(&self, codes: &[String]) -> Result<Vec<Locale>> {
        if codes.is_empty() {
            return Ok(self.locales.clone());
        }
        codes
            .iter()
            .map(|code| self.lookup(code).cloned())
            .collect()
    }
}

impl<'a> IntoIterator for &'a LocaleTable {
    type Item = &'a Locale;
    type IntoIter = std::slice::Iter<'a, Locale>;

    fn into_iter(self) -> Self::IntoIter {
        self.locales.iter()
    }
}
