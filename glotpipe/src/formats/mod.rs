//! All supported translation file formats for glotpipe.
//!
//! This module re-exports the main types for each format and provides
//! the [`FormatType`] enum for generic format handling across the crate.

pub mod po;
pub mod strings;

use std::{
    fmt::{Display, Formatter},
    path::Path,
    str::FromStr,
};

// Reexporting the formats for easier access
pub use po::Format as PoFormat;
pub use strings::Format as StringsFormat;

use crate::Error;

/// Represents all supported translation file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatType {
    /// Apple `.strings` format.
    Strings,
    /// gettext `.po` format.
    Po,
}

/// Implements [`std::fmt::Display`] for [`FormatType`].
///
/// # Example
/// ```rust
/// use glotpipe::formats::FormatType;
/// assert_eq!(FormatType::Strings.to_string(), "strings");
/// assert_eq!(FormatType::Po.to_string(), "po");
/// ```
impl Display for FormatType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatType::Strings => write!(f, "strings"),
            FormatType::Po => write!(f, "po"),
        }
    }
}

/// Accepts `"strings"` and `"po"` (case-insensitive).
///
/// # Example
/// ```rust
/// use glotpipe::formats::FormatType;
/// use std::str::FromStr;
/// assert_eq!(FormatType::from_str("Strings").unwrap(), FormatType::Strings);
/// assert!(FormatType::from_str("xliff").is_err());
/// ```
impl FromStr for FormatType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strings" => Ok(FormatType::Strings),
            "po" | "pot" => Ok(FormatType::Po),
            other => Err(Error::config(format!("unknown file format `{other}`"))),
        }
    }
}

impl FormatType {
    /// Returns the typical file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            FormatType::Strings => "strings",
            FormatType::Po => "po",
        }
    }

    /// Infers the format from a path's extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}
